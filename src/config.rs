/*!
 * Configuration types for Vidvault
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Video extensions backed up when none are configured
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mov", ".mkv", ".m4v"];

/// Main configuration for a backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Root containing experiment_* folders
    #[serde(default)]
    pub source_root: PathBuf,

    /// Root receiving timestamped batches and the manifest
    #[serde(default)]
    pub dest_root: PathBuf,

    /// File extensions to back up (case-insensitive, leading dot optional)
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Child of each experiment holding subject folders
    #[serde(default = "default_subject_container")]
    pub subject_container: String,

    /// Manifest file name inside dest_root
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Simulate: plan and count, but copy nothing and leave the manifest on disk untouched
    #[serde(default)]
    pub dry_run: bool,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            dest_root: PathBuf::new(),
            video_extensions: default_video_extensions(),
            subject_container: default_subject_container(),
            manifest_name: default_manifest_name(),
            dry_run: false,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_video_extensions() -> Vec<String> {
    DEFAULT_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_subject_container() -> String {
    "included".to_string()
}

fn default_manifest_name() -> String {
    "manifest.csv".to_string()
}

impl BackupConfig {
    /// Create a configuration for the given roots with default settings
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BackupConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BackupError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Location of the persisted manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.dest_root.join(&self.manifest_name)
    }

    /// Configured extensions, lowercased and dot-prefixed
    pub fn normalized_extensions(&self) -> Vec<String> {
        normalize_extensions(&self.video_extensions)
    }
}

/// Lowercase each extension and add the leading dot when missing.
pub fn normalize_extensions<S: AsRef<str>>(exts: &[S]) -> Vec<String> {
    exts.iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .map(|e| if e.starts_with('.') { e } else { format!(".{}", e) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = BackupConfig::default();
        assert_eq!(config.video_extensions.len(), 5);
        assert_eq!(config.subject_container, "included");
        assert_eq!(config.manifest_name, "manifest.csv");
        assert!(!config.dry_run);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_manifest_path_is_sibling_of_batches() {
        let config = BackupConfig::new("/mnt/src", "/mnt/backup");
        assert_eq!(config.manifest_path(), PathBuf::from("/mnt/backup/manifest.csv"));
    }

    #[test]
    fn test_normalize_extensions() {
        let exts = normalize_extensions(&["MP4", ".Avi", " mkv ", ""]);
        assert_eq!(exts, vec![".mp4", ".avi", ".mkv"]);
    }

    #[test]
    fn test_serialization() {
        let config = BackupConfig::new("/src", "/dst");
        let toml = toml::to_string(&config).unwrap();
        let deserialized: BackupConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.source_root, deserialized.source_root);
        assert_eq!(config.video_extensions, deserialized.video_extensions);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
source_root = "M:/"
dest_root = "Y:/multiwork_active_exp_backup/video_backup_incremental"
dry_run = true
log_level = "debug"
"#;

        let config: BackupConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.source_root, PathBuf::from("M:/"));
        assert!(config.dry_run);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.video_extensions, default_video_extensions());
        assert_eq!(config.subject_container, "included");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vidvault.toml");

        let mut config = BackupConfig::new("/src", "/dst");
        config.video_extensions = vec!["mp4".to_string()];
        config.to_file(&path).unwrap();

        let loaded = BackupConfig::from_file(&path).unwrap();
        assert_eq!(loaded.video_extensions, vec!["mp4".to_string()]);
        assert_eq!(loaded.dest_root, PathBuf::from("/dst"));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
