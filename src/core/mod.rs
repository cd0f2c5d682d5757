/*!
 * Core incremental backup engine
 *
 * Discovery -> Planner -> Executor, driven by the batch controller. Data
 * only flows forward; the manifest is the sole state carried across runs.
 */

pub mod batch;
pub mod discovery;
pub mod executor;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod planner;

use std::fmt;
use std::time::Duration;

/// Per-run copy counters, reset at the start of every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub copied_ok: u64,
    pub failed: u64,
    pub bytes_copied: u64,
    pub duration: Duration,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows attempted, successful or not
    pub fn attempted(&self) -> u64 {
        self.copied_ok + self.failed
    }
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Copied OK: {}, Failed: {}", self.copied_ok, self.failed)
    }
}
