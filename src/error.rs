/*!
 * Error types for Vidvault
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum BackupError {
    /// Source root does not exist or is not a directory
    SourceNotFound(PathBuf),

    /// Destination root or batch directory could not be prepared
    Destination { path: PathBuf, source: io::Error },

    /// I/O error
    Io(io::Error),

    /// Manifest could not be read or written
    Manifest(ManifestError),

    /// Configuration error
    Config(String),
}

/// Errors raised at the manifest persistence boundary.
///
/// Malformed rows never produce one of these; they are dropped during load.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Manifest '{}' has no usable header: {source}", path.display())]
    Header { path: PathBuf, source: csv::Error },

    #[error("Failed to write manifest '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to encode manifest row '{rel_path}': {source}")]
    Encode { rel_path: String, source: csv::Error },
}

impl BackupError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BackupError::SourceNotFound(_)
            | BackupError::Destination { .. }
            | BackupError::Manifest(_)
            | BackupError::Config(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error aborts a run
    pub fn is_fatal(&self) -> bool {
        match self {
            BackupError::SourceNotFound(_) => true,
            BackupError::Destination { .. } => true,
            BackupError::Manifest(_) => true,
            BackupError::Config(_) => true,

            BackupError::Io(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackupError::SourceNotFound(_) => ErrorCategory::Validation,
            BackupError::Destination { .. } => ErrorCategory::Filesystem,
            BackupError::Io(_) => ErrorCategory::IoError,
            BackupError::Manifest(_) => ErrorCategory::Manifest,
            BackupError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Path validation errors
    Validation,
    /// Destination preparation errors
    Filesystem,
    /// I/O operation errors
    IoError,
    /// Manifest persistence errors
    Manifest,
    /// Configuration errors
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Manifest => write!(f, "manifest"),
            ErrorCategory::Configuration => write!(f, "configuration"),
        }
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::SourceNotFound(path) => {
                write!(f, "Source root not found: {}", path.display())
            }
            BackupError::Destination { path, source } => {
                write!(f, "Cannot prepare destination {}: {}", path.display(), source)
            }
            BackupError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            BackupError::Manifest(err) => {
                write!(f, "Manifest error: {}", err)
            }
            BackupError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Io(err) => Some(err),
            BackupError::Destination { source, .. } => Some(source),
            BackupError::Manifest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::Io(err)
    }
}

impl From<ManifestError> for BackupError {
    fn from(err: ManifestError) -> Self {
        BackupError::Manifest(err)
    }
}

impl From<toml::de::Error> for BackupError {
    fn from(err: toml::de::Error) -> Self {
        BackupError::Config(format!("TOML parse error: {}", err))
    }
}
