//! Directory-service access layer
//!
//! Defines the data model for the two object kinds this tool backs up
//! (Group Policy Objects and WMI filters) and the `DirectoryService`
//! trait the backup job talks through. The production implementation
//! bridges to the Group Policy management cmdlets; tests use an
//! in-memory fake.

mod models;
mod powershell;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

pub use models::{Gpo, WmiFilter};
pub use powershell::PowerShellDirectory;

use crate::error::BackupResult;

/// Narrow contract over the directory service and its management
/// operations.
///
/// All methods block until the underlying call completes; there is no
/// timeout layer, matching the single-threaded synchronous model of the
/// tool.
pub trait DirectoryService {
    /// Enumerate all Group Policy Objects in the domain
    fn list_gpos(&self) -> BackupResult<Vec<Gpo>>;

    /// Resolve a GPO by display name to its unique handle
    ///
    /// Returns a `NotFound` error if no GPO with that name exists.
    fn find_gpo(&self, name: &str) -> BackupResult<Gpo>;

    /// Enumerate all WMI filter objects in the domain
    fn list_wmi_filters(&self) -> BackupResult<Vec<WmiFilter>>;

    /// Back up one GPO into the destination folder
    ///
    /// The external operation produces its artifact file set inside
    /// `dest`; it may fail if the object no longer exists or the
    /// destination is unwritable.
    fn backup_gpo(&self, gpo: &Gpo, dest: &Path) -> BackupResult<()>;

    /// Generate the human-readable HTML report for one GPO
    fn export_report(&self, gpo: &Gpo, dest_file: &Path) -> BackupResult<()>;
}
