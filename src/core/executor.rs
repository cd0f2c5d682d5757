/*!
 * Copy execution
 *
 * Performs the copies of a plan in order. Each row succeeds or fails on its
 * own; a failed row is recorded and leaves the manifest untouched so the
 * next run picks it up again.
 */

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::manifest::Manifest;
use super::metadata::preserve_metadata;
use super::planner::PlanRow;
use super::Counters;

/// Physical copy of one file; the seam used to swap the local filesystem out
pub trait FileCopier {
    /// Copy `src` to `dst`, returning the number of bytes written
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64>;
}

/// Copies on the local filesystem, keeping timestamps and permissions
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCopier;

impl FileCopier for LocalCopier {
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let bytes = std::fs::copy(src, dst)?;
        preserve_metadata(src, dst)?;
        Ok(bytes)
    }
}

/// A row that could not be copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub rel_path: String,
    pub src: PathBuf,
    pub dst: PathBuf,
    pub kind: io::ErrorKind,
    pub reason: String,
}

/// Counters and failures from executing one plan
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub counters: Counters,
    pub failures: Vec<CopyFailure>,
}

/// Executes plan rows against a [`FileCopier`]
pub struct CopyExecutor<C: FileCopier = LocalCopier> {
    copier: C,
    dry_run: bool,
}

impl CopyExecutor<LocalCopier> {
    pub fn new(dry_run: bool) -> Self {
        Self::with_copier(LocalCopier, dry_run)
    }
}

impl<C: FileCopier> CopyExecutor<C> {
    pub fn with_copier(copier: C, dry_run: bool) -> Self {
        Self { copier, dry_run }
    }

    /// Attempt every row, upserting `manifest` after each success.
    ///
    /// In dry-run mode nothing is copied, but rows still count as copied and
    /// still update the in-memory manifest.
    pub fn execute<I>(&self, rows: I, manifest: &mut Manifest) -> ExecutionOutcome
    where
        I: IntoIterator<Item = PlanRow>,
    {
        let start = Instant::now();
        let mut outcome = ExecutionOutcome::default();

        for row in rows {
            match self.execute_row(&row) {
                Ok(bytes) => {
                    outcome.counters.copied_ok += 1;
                    outcome.counters.bytes_copied += bytes;
                    manifest.upsert(&row.rel_path, row.size, row.mtime);
                }
                Err(e) => {
                    warn!(
                        "Copy failed: {} -> {} ({})",
                        row.src.display(),
                        row.dst.display(),
                        e
                    );
                    outcome.counters.failed += 1;
                    outcome.failures.push(CopyFailure {
                        rel_path: row.rel_path,
                        src: row.src,
                        dst: row.dst,
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome.counters.duration = start.elapsed();
        outcome
    }

    fn execute_row(&self, row: &PlanRow) -> io::Result<u64> {
        if let Some(parent) = row.dst.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if self.dry_run {
            info!(
                "[DRY-RUN] Would copy: {} -> {} ({} bytes)",
                row.src.display(),
                row.dst.display(),
                row.size
            );
            return Ok(0);
        }

        let bytes = self.copier.copy(&row.src, &row.dst)?;
        debug!("Copied {} ({} bytes)", row.rel_path, bytes);
        Ok(bytes)
    }
}
