//! Delete-rights check on a filesystem path
//!
//! Gates the retention sweep: the sweep only runs when the current
//! principal can actually delete inside the backup root. The check
//! never fails the caller; any error reading access-control data is
//! reported as a warning and treated as "no permission".

use std::path::Path;

use tracing::warn;

/// Whether the current principal holds delete-equivalent rights on `path`
///
/// The path must exist, else this warns and returns false. An
/// administrative principal passes regardless of the path's explicit
/// access-control entries.
pub fn can_delete(path: &Path) -> bool {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "permission check failed; assuming no delete rights");
            return false;
        }
    };

    has_delete_rights(&metadata)
}

/// Unix: compare the effective principal against the owner/group/other
/// mode bits. Deleting entries inside a directory needs write plus
/// traverse on that directory; for a plain file write alone suffices.
/// Root always passes.
#[cfg(unix)]
fn has_delete_rights(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        return true;
    }

    // Required permission bits within a class: write, plus execute for
    // directory traversal.
    let required: u32 = if metadata.is_dir() { 0o3 } else { 0o2 };
    let mode = metadata.mode();

    let shift = if metadata.uid() == euid {
        6
    } else if current_groups().contains(&metadata.gid()) {
        3
    } else {
        0
    };

    (mode >> shift) & required == required
}

/// Effective gid plus supplementary group memberships
#[cfg(unix)]
fn current_groups() -> Vec<u32> {
    let egid = unsafe { libc::getegid() } as u32;

    let mut gids = vec![0 as libc::gid_t; 128];
    let count = unsafe { libc::getgroups(gids.len() as libc::c_int, gids.as_mut_ptr()) };
    if count < 0 {
        warn!("could not read supplementary groups; using effective gid only");
        return vec![egid];
    }

    gids.truncate(count as usize);
    let mut groups: Vec<u32> = gids.into_iter().map(|g| g as u32).collect();
    groups.push(egid);
    groups
}

/// Non-unix: approximate with the read-only attribute, which is what a
/// denied delete surfaces as on these platforms.
#[cfg(not(unix))]
fn has_delete_rights(metadata: &std::fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}
