//! In-memory directory service for tests

use std::collections::HashSet;
use std::path::Path;

use crate::error::{BackupError, BackupResult};

use super::models::{Gpo, WmiFilter};
use super::DirectoryService;

/// Test double holding fixed GPO and filter collections
///
/// `backup_gpo` writes a placeholder artifact file and `export_report`
/// writes a small HTML document, so the on-disk layout a run produces
/// can be asserted against. GPOs listed in `failing` error on backup.
pub struct FakeDirectory {
    pub gpos: Vec<Gpo>,
    pub filters: Vec<WmiFilter>,
    pub failing: HashSet<String>,
}

impl FakeDirectory {
    pub fn new(gpos: Vec<Gpo>, filters: Vec<WmiFilter>) -> Self {
        Self {
            gpos,
            filters,
            failing: HashSet::new(),
        }
    }

    /// Mark a GPO (by display name) as failing its backup operation
    pub fn fail_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl DirectoryService for FakeDirectory {
    fn list_gpos(&self) -> BackupResult<Vec<Gpo>> {
        Ok(self.gpos.clone())
    }

    fn find_gpo(&self, name: &str) -> BackupResult<Gpo> {
        self.gpos
            .iter()
            .find(|g| g.display_name == name)
            .cloned()
            .ok_or_else(|| BackupError::gpo_not_found(name))
    }

    fn list_wmi_filters(&self) -> BackupResult<Vec<WmiFilter>> {
        Ok(self.filters.clone())
    }

    fn backup_gpo(&self, gpo: &Gpo, dest: &Path) -> BackupResult<()> {
        if self.failing.contains(&gpo.display_name) {
            return Err(BackupError::Export(format!(
                "Backup of '{}' failed: simulated",
                gpo.display_name
            )));
        }

        let artifact = dest.join(format!("{{{}}}.bak", gpo.id));
        std::fs::write(&artifact, gpo.display_name.as_bytes())
            .map_err(|e| BackupError::Export(format!("Failed to write artifact: {}", e)))?;
        Ok(())
    }

    fn export_report(&self, gpo: &Gpo, dest_file: &Path) -> BackupResult<()> {
        let html = format!("<html><body><h1>{}</h1></body></html>", gpo.display_name);
        std::fs::write(dest_file, html)
            .map_err(|e| BackupError::Export(format!("Failed to write report: {}", e)))?;
        Ok(())
    }
}
