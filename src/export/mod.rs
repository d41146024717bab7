//! Per-object export and WMI filter snapshots
//!
//! Object export is thin glue over the directory service: resolve the
//! name to a handle, run the external backup, then write the report
//! next to the artifacts. Filter snapshots are serialized as XML and
//! round-trip the filter's full structure.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::directory::{DirectoryService, WmiFilter};
use crate::error::{BackupError, BackupResult};

/// Export one GPO into an existing destination folder
///
/// Resolves the display name to the GPO's handle, invokes the external
/// backup operation into `dest`, then writes the HTML report as
/// `<dest>/<report_file>`. Any failure propagates to the caller; there
/// is no local recovery or retry.
pub fn export_gpo(
    directory: &dyn DirectoryService,
    name: &str,
    dest: &Path,
    report_file: &str,
) -> BackupResult<()> {
    if !dest.is_dir() {
        return Err(BackupError::Export(format!(
            "Destination folder does not exist: {}",
            dest.display()
        )));
    }

    let gpo = directory.find_gpo(name)?;
    debug!(gpo = %gpo.display_name, id = %gpo.id, dest = %dest.display(), "exporting GPO");

    directory.backup_gpo(&gpo, dest)?;
    directory.export_report(&gpo, &dest.join(report_file))?;

    Ok(())
}

/// Serialize one WMI filter to `<filters_dir>/<sanitized name>.xml`
///
/// Returns the path of the written snapshot. The snapshot deserializes
/// back to an equal `WmiFilter`.
pub fn write_filter_snapshot(filter: &WmiFilter, filters_dir: &Path) -> BackupResult<PathBuf> {
    let xml = quick_xml::se::to_string(filter)
        .map_err(|e| BackupError::Snapshot(format!("Failed to serialize '{}': {}", filter.name, e)))?;

    let path = filters_dir.join(format!("{}.xml", sanitize_file_name(&filter.name)));
    std::fs::write(&path, xml)
        .map_err(|e| BackupError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

    Ok(path)
}

/// Replace characters that are unsafe in folder/file names
///
/// Display names come from the directory and may contain path
/// separators or characters Windows reserves. Trailing dots and spaces
/// are also stripped since Windows rejects them on directories.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
