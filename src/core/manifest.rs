/*!
 * Change-detection manifest
 *
 * Persisted ledger mapping each relative-path identity to the size and
 * modification time recorded when it was last backed up. Stored as CSV with
 * a `rel_path,size,mtime` header next to the batch directories.
 *
 * Entries are never pruned: files removed from the source keep their rows.
 */

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ManifestError;

const COL_REL_PATH: &str = "rel_path";
const COL_SIZE: &str = "size";
const COL_MTIME: &str = "mtime";

/// Size and modification time recorded for one relative path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifestEntry {
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: f64,
}

/// In-memory view of the ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    rows: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest at `path`; a missing file yields an empty manifest.
    ///
    /// Rows with an empty path or an unparseable size/mtime are dropped.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse a manifest stream; `origin` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, ManifestError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|source| ManifestError::Header {
                path: origin.to_path_buf(),
                source,
            })?
            .clone();
        let columns = Columns::locate(&headers);

        let mut manifest = Self::new();
        let mut dropped = 0usize;

        for record in csv.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    return Err(ManifestError::Read {
                        path: origin.to_path_buf(),
                        source: io::Error::from(e),
                    })
                }
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };

            match columns.parse(&record) {
                Some((rel_path, entry)) => {
                    manifest.rows.insert(rel_path, entry);
                }
                None => dropped += 1,
            }
        }

        debug!(
            entries = manifest.len(),
            dropped, "Loaded manifest from {}", origin.display()
        );

        Ok(manifest)
    }

    /// Replace the manifest at `path` with the full in-memory map.
    ///
    /// Rows are written to a temporary sibling which is then renamed over
    /// `path`, so readers never observe a partial file.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let write_err = |source: io::Error| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.write_to(&mut writer)?;
            writer.flush().map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(entries = self.len(), "Saved manifest to {}", path.display());
        Ok(())
    }

    /// Serialize header and rows, sorted by relative path
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ManifestError> {
        let mut csv = WriterBuilder::new().from_writer(writer);

        csv.write_record([COL_REL_PATH, COL_SIZE, COL_MTIME])
            .map_err(|source| ManifestError::Encode {
                rel_path: String::new(),
                source,
            })?;

        for (rel_path, entry) in &self.rows {
            let size = entry.size.to_string();
            let mtime = format_mtime(entry.mtime);
            csv.write_record([rel_path.as_str(), size.as_str(), mtime.as_str()])
                .map_err(|source| ManifestError::Encode {
                    rel_path: rel_path.clone(),
                    source,
                })?;
        }

        csv.flush().map_err(|source| ManifestError::Encode {
            rel_path: String::new(),
            source: source.into(),
        })?;
        Ok(())
    }

    /// True when `rel_path` is new, its size changed, or its mtime moved forward.
    ///
    /// An mtime equal to or older than the recorded one with the same size is
    /// treated as unchanged, so files restored from an older copy are not
    /// detected.
    pub fn needs_copy(&self, rel_path: &str, size: u64, mtime: f64) -> bool {
        match self.rows.get(rel_path) {
            None => true,
            Some(old) => old.size != size || old.mtime < mtime,
        }
    }

    /// Insert or overwrite the entry for `rel_path`
    pub fn upsert(&mut self, rel_path: &str, size: u64, mtime: f64) {
        self.rows
            .insert(rel_path.to_string(), ManifestEntry { size, mtime });
    }

    pub fn get(&self, rel_path: &str) -> Option<&ManifestEntry> {
        self.rows.get(rel_path)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header positions of the three manifest columns
struct Columns {
    rel_path: Option<usize>,
    size: Option<usize>,
    mtime: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            rel_path: find(COL_REL_PATH),
            size: find(COL_SIZE),
            mtime: find(COL_MTIME),
        }
    }

    fn parse(&self, record: &StringRecord) -> Option<(String, ManifestEntry)> {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i));

        let rel_path = field(self.rel_path).filter(|r| !r.is_empty())?;
        let size = parse_size(field(self.size)?)?;
        let mtime = parse_mtime(field(self.mtime)?)?;

        Some((rel_path.to_string(), ManifestEntry { size, mtime }))
    }
}

/// Integer bytes; real-valued sizes such as `100.0` are truncated
fn parse_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(size) = raw.parse::<u64>() {
        return Some(size);
    }
    let real = raw.parse::<f64>().ok()?;
    (real.is_finite() && real >= 0.0).then(|| real.trunc() as u64)
}

fn parse_mtime(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|m| m.is_finite())
}

/// Shortest representation that parses back to the same value
fn format_mtime(mtime: f64) -> String {
    format!("{:?}", mtime)
}
