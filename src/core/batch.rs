/*!
 * Batch controller: drives one incremental backup run end to end
 *
 * validate source -> create batch dir -> load manifest -> discover -> plan
 * -> execute -> save manifest (skipped in dry-run) -> report
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use super::discovery::{DiscoveryWarning, PathDiscovery};
use super::executor::{CopyExecutor, CopyFailure, FileCopier, LocalCopier};
use super::manifest::Manifest;
use super::planner::CopyPlanner;
use super::Counters;
use crate::config::BackupConfig;
use crate::error::{BackupError, Result, EXIT_PARTIAL, EXIT_SUCCESS};

/// Batch directory names use second granularity
pub const BATCH_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub batch_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub dry_run: bool,
    pub experiments: usize,
    pub discovered: usize,
    pub planned: usize,
    pub counters: Counters,
    pub warnings: Vec<DiscoveryWarning>,
    pub failures: Vec<CopyFailure>,
    /// Manifest state at the end of the run, including dry-run upserts
    pub manifest: Manifest,
    pub manifest_saved: bool,
}

impl RunReport {
    /// True when every planned copy succeeded
    pub fn is_success(&self) -> bool {
        self.counters.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL
        }
    }
}

/// Runs backups for one configuration
pub struct BatchController<C: FileCopier = LocalCopier> {
    config: BackupConfig,
    copier: C,
}

impl BatchController<LocalCopier> {
    pub fn new(config: BackupConfig) -> Self {
        Self::with_copier(config, LocalCopier)
    }
}

impl<C: FileCopier> BatchController<C> {
    pub fn with_copier(config: BackupConfig, copier: C) -> Self {
        Self { config, copier }
    }

    /// Run once, naming the batch after the current local time
    pub fn run(self) -> Result<RunReport> {
        self.run_at(Local::now())
    }

    /// Run once with an explicit start time
    pub fn run_at(self, started: DateTime<Local>) -> Result<RunReport> {
        let config = self.config;

        if !config.source_root.is_dir() {
            return Err(BackupError::SourceNotFound(config.source_root.clone()));
        }

        let batch_dir = config
            .dest_root
            .join(started.format(BATCH_NAME_FORMAT).to_string());
        create_dir(&config.dest_root)?;
        create_dir(&batch_dir)?;

        let manifest_path = config.manifest_path();
        let mut manifest = Manifest::load(&manifest_path)?;

        info!(
            source = %config.source_root.display(),
            batch = %batch_dir.display(),
            dry_run = config.dry_run,
            manifest_entries = manifest.len(),
            "Incremental backup started"
        );

        let discovery = PathDiscovery::from_config(&config).discover(&config.source_root)?;
        info!("Scanning experiments... found {}", discovery.experiments);

        let plan = CopyPlanner::new(&batch_dir).plan(&discovery.files, &manifest);
        info!("Files to copy: {}", plan.len());

        let planned = plan.len();
        let executor = CopyExecutor::with_copier(self.copier, config.dry_run);
        let outcome = executor.execute(plan, &mut manifest);

        let manifest_saved = if config.dry_run {
            false
        } else {
            manifest.save(&manifest_path)?;
            true
        };

        info!(
            "Incremental backup done. Copied OK: {}, Failed: {}, Batch folder: {}",
            outcome.counters.copied_ok,
            outcome.counters.failed,
            batch_dir.display()
        );

        Ok(RunReport {
            batch_dir,
            manifest_path,
            dry_run: config.dry_run,
            experiments: discovery.experiments,
            discovered: discovery.files.len(),
            planned,
            counters: outcome.counters,
            warnings: discovery.warnings,
            failures: outcome.failures,
            manifest,
            manifest_saved,
        })
    }
}

/// Convenience wrapper: run one backup with the local filesystem copier
pub fn run_backup(config: BackupConfig) -> Result<RunReport> {
    BatchController::new(config).run()
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| BackupError::Destination {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn fixed_start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_missing_source_is_fatal_before_side_effects() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let config = BackupConfig::new(dir.path().join("missing"), &dest);

        let err = BatchController::new(config).run_at(fixed_start()).unwrap_err();

        assert!(matches!(err, BackupError::SourceNotFound(_)));
        assert!(err.is_fatal());
        assert!(!dest.exists());
    }

    #[test]
    fn test_batch_dir_named_by_start_time() {
        crate::logging::init_test_logging();
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let config = BackupConfig::new(&src, dir.path().join("dest"));

        let report = BatchController::new(config).run_at(fixed_start()).unwrap();

        assert_eq!(report.batch_dir, dir.path().join("dest/20240305_140709"));
        assert!(report.batch_dir.is_dir());
        assert!(report.manifest_saved);
        assert!(report.manifest_path.exists());
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_unreadable_manifest_is_fatal() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let dest = dir.path().join("dest");
        // A directory where the manifest file should be cannot be opened as CSV
        fs::create_dir_all(dest.join("manifest.csv")).unwrap();

        let err = BatchController::new(BackupConfig::new(&src, &dest))
            .run_at(fixed_start())
            .unwrap_err();

        assert!(matches!(err, BackupError::Manifest(_)));
    }

    #[test]
    fn test_same_second_reruns_share_batch_dir() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let dest = dir.path().join("dest");

        let first = BatchController::new(BackupConfig::new(&src, &dest))
            .run_at(fixed_start())
            .unwrap();
        let second = BatchController::new(BackupConfig::new(&src, &dest))
            .run_at(fixed_start())
            .unwrap();

        assert_eq!(first.batch_dir, second.batch_dir);
    }
}
