/*!
 * Copy planning
 *
 * Turns discovered files into the list of copies a run must perform:
 * one row per relative-path identity that is new or changed against the
 * manifest, with size and mtime read at planning time.
 */

use std::collections::HashSet;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};

use super::discovery::DiscoveredFile;
use super::manifest::Manifest;

/// One pending copy
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub rel_path: String,
    pub size: u64,
    pub mtime: f64,
    pub src: PathBuf,
    pub dst: PathBuf,
}

/// Ordered, deduplicated copy plan
#[derive(Debug, Clone, Default)]
pub struct CopyPlan {
    pub rows: Vec<PlanRow>,
    /// Files that disappeared between discovery and planning
    pub vanished: usize,
    /// Files whose metadata could not be read
    pub unreadable: usize,
    /// Rows dropped because an earlier row had the same identity
    pub duplicates: usize,
}

impl CopyPlan {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.rows.iter().map(|r| r.size).sum()
    }
}

impl IntoIterator for CopyPlan {
    type Item = PlanRow;
    type IntoIter = std::vec::IntoIter<PlanRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Plans copies into a single batch directory
pub struct CopyPlanner {
    batch_dir: PathBuf,
}

impl CopyPlanner {
    pub fn new(batch_dir: impl Into<PathBuf>) -> Self {
        Self {
            batch_dir: batch_dir.into(),
        }
    }

    /// Build the plan for `files` against `manifest`.
    ///
    /// Every returned row needed copying against this manifest snapshot; no
    /// two rows share a relative path.
    pub fn plan(&self, files: &[DiscoveredFile], manifest: &Manifest) -> CopyPlan {
        let mut plan = CopyPlan::default();
        let mut seen: HashSet<String> = HashSet::new();

        for file in files {
            let rel_path = file.rel_path();

            let (size, mtime) = match stat(&file.path) {
                Ok(stat) => stat,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Vanished before planning: {}", file.path.display());
                    plan.vanished += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Cannot stat {}: {}", file.path.display(), e);
                    plan.unreadable += 1;
                    continue;
                }
            };

            if !manifest.needs_copy(&rel_path, size, mtime) {
                continue;
            }

            if !seen.insert(rel_path.clone()) {
                debug!("Duplicate identity dropped: {}", rel_path);
                plan.duplicates += 1;
                continue;
            }

            let dst = batch_destination(&self.batch_dir, &rel_path);
            plan.rows.push(PlanRow {
                rel_path,
                size,
                mtime,
                src: file.path.clone(),
                dst,
            });
        }

        plan
    }
}

/// `batch_dir` joined with each `/`-separated component of `rel_path`
pub fn batch_destination(batch_dir: &Path, rel_path: &str) -> PathBuf {
    let mut dst = batch_dir.to_path_buf();
    dst.extend(rel_path.split('/').filter(|part| !part.is_empty()));
    dst
}

fn stat(path: &Path) -> io::Result<(u64, f64)> {
    let meta = std::fs::metadata(path)?;
    Ok((meta.len(), mtime_seconds(&meta)?))
}

/// Modification time as real seconds since the epoch (negative before it)
pub fn mtime_seconds(meta: &Metadata) -> io::Result<f64> {
    let modified = meta.modified()?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    })
}
