/*!
 * File metadata preservation (timestamps, permissions)
 */

use filetime::{set_file_times, FileTime};
use std::io;
use std::path::Path;

/// Copy access/modification times and permission bits from source to destination
pub fn preserve_metadata(source_path: &Path, dest_path: &Path) -> io::Result<()> {
    let metadata = std::fs::metadata(source_path)?;

    std::fs::set_permissions(dest_path, metadata.permissions())?;

    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);
    set_file_times(dest_path, accessed, modified)
}
