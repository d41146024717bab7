//! Retention sweep over dated backup folders
//!
//! A daily folder's name is its creation date under a fixed format;
//! parsing that name is the sole age mechanism. Names that fail to
//! parse are skipped, never deleted, and a single bad folder never
//! aborts the sweep.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

/// Fixed daily-folder name format; must round-trip through
/// `NaiveDate::parse_from_str`
pub const DAILY_FOLDER_FORMAT: &str = "%Y-%m-%d";

/// One folder removed by the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedFolder {
    /// Full path of the deleted folder
    pub path: PathBuf,
    /// Age in whole days at deletion time
    pub age_days: i64,
}

/// Delete immediate subfolders of `root` older than the retention window
///
/// `today` is injected so the age comparison is deterministic under
/// test. Per-folder errors (unparseable names, failed deletions) are
/// logged as warnings and the sweep continues. Returns the folders that
/// were deleted; re-running with no changes in between deletes nothing.
pub fn prune_expired(root: &Path, retention_days: u32, today: NaiveDate) -> Vec<PrunedFolder> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "could not enumerate backup root; skipping sweep");
            return Vec::new();
        }
    };

    let mut pruned = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "could not read directory entry; skipping");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let parsed = match parse_daily_folder(&name) {
            Some(date) => date,
            None => {
                warn!(folder = %name, "folder name is not a backup date; leaving untouched");
                continue;
            }
        };

        let age_days = (today - parsed).num_days();
        if age_days <= i64::from(retention_days) {
            continue;
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                info!(folder = %name, age_days, "deleted expired backup folder");
                pruned.push(PrunedFolder { path, age_days });
            }
            Err(e) => {
                warn!(folder = %name, error = %e, "failed to delete expired backup folder");
            }
        }
    }

    pruned
}

/// Parse a folder name as a daily-folder date
///
/// chrono accepts some non-canonical spellings (unpadded months and
/// days), so a successful parse must also format back to the exact
/// name. Anything else was not written by this tool and is left alone.
fn parse_daily_folder(name: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(name, DAILY_FOLDER_FORMAT).ok()?;
    (date.format(DAILY_FOLDER_FORMAT).to_string() == name).then_some(date)
}
