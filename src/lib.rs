/*!
 * Vidvault - incremental backup for experiment video trees
 *
 * Scans `experiment_NN/[included/]__YYYYMMDD_N/camNN_video_r/` trees, copies
 * only new or changed video files into a timestamped batch directory and
 * records what was copied in a CSV manifest so the next run stays
 * incremental.
 */

pub mod config;
pub mod core;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{BackupConfig, LogLevel};
pub use crate::core::batch::{run_backup, BatchController, RunReport};
pub use crate::core::discovery::{DiscoveredFile, Discovery, DiscoveryWarning, PathDiscovery};
pub use crate::core::executor::{CopyExecutor, CopyFailure, FileCopier, LocalCopier};
pub use crate::core::manifest::{Manifest, ManifestEntry};
pub use crate::core::planner::{CopyPlan, CopyPlanner, PlanRow};
pub use crate::core::Counters;
pub use error::{BackupError, ManifestError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
