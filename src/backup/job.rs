//! Backup job orchestration

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::config::{FailurePolicy, Settings};
use crate::directory::DirectoryService;
use crate::error::{BackupError, BackupResult};
use crate::export;
use crate::permissions;
use crate::retention::{self, PrunedFolder, DAILY_FOLDER_FORMAT};

/// Outcome of one backup run
#[derive(Debug)]
pub struct RunSummary {
    /// The daily folder this run wrote into
    pub daily_folder: PathBuf,
    /// Number of GPOs exported successfully
    pub gpos_backed_up: usize,
    /// GPOs that failed, with the failure text (populated only under
    /// the `continue` failure policy)
    pub gpos_failed: Vec<(String, String)>,
    /// Number of WMI filter snapshots written
    pub filters_written: usize,
    /// Daily folders removed by the retention sweep
    pub pruned: Vec<PrunedFolder>,
}

/// Orchestrates a full backup run against one directory service
pub struct BackupJob<'a> {
    directory: &'a dyn DirectoryService,
    settings: Settings,
}

impl<'a> BackupJob<'a> {
    /// Create a new job
    pub fn new(directory: &'a dyn DirectoryService, settings: Settings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Run the job against today's local date
    pub fn run_today(&self, backup_root: &Path) -> BackupResult<RunSummary> {
        self.run(backup_root, Local::now().date_naive())
    }

    /// Run the job: validate, export GPOs, snapshot filters, sweep
    ///
    /// `today` names the daily folder and anchors the retention sweep;
    /// it is injected so runs are deterministic under test.
    pub fn run(&self, backup_root: &Path, today: NaiveDate) -> BackupResult<RunSummary> {
        // Validated before anything else; a bad root creates nothing.
        if !backup_root.is_dir() {
            return Err(BackupError::Validation(format!(
                "Backup path does not exist or is not a directory: {}",
                backup_root.display()
            )));
        }

        let daily_folder = backup_root.join(today.format(DAILY_FOLDER_FORMAT).to_string());
        std::fs::create_dir_all(&daily_folder).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create daily folder {}: {}",
                daily_folder.display(),
                e
            ))
        })?;
        info!(folder = %daily_folder.display(), "daily backup folder ready");

        let (gpos_backed_up, gpos_failed) = self.export_gpos(&daily_folder)?;
        let filters_written = self.snapshot_filters(&daily_folder)?;
        let pruned = self.sweep_expired(backup_root, today);

        Ok(RunSummary {
            daily_folder,
            gpos_backed_up,
            gpos_failed,
            filters_written,
            pruned,
        })
    }

    /// Export every GPO into its own subfolder of the daily folder
    fn export_gpos(&self, daily_folder: &Path) -> BackupResult<(usize, Vec<(String, String)>)> {
        let gpos = self.directory.list_gpos()?;
        info!(count = gpos.len(), "enumerated GPOs");

        let mut backed_up = 0;
        let mut failed = Vec::new();

        for gpo in &gpos {
            let object_folder = daily_folder.join(export::sanitize_file_name(&gpo.display_name));
            std::fs::create_dir_all(&object_folder).map_err(|e| {
                BackupError::Io(format!(
                    "Failed to create folder for '{}': {}",
                    gpo.display_name, e
                ))
            })?;

            match export::export_gpo(
                self.directory,
                &gpo.display_name,
                &object_folder,
                &self.settings.report_file,
            ) {
                Ok(()) => {
                    info!(gpo = %gpo.display_name, "GPO backed up");
                    backed_up += 1;
                }
                Err(e) => match self.settings.on_export_error {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        warn!(gpo = %gpo.display_name, error = %e, "GPO export failed; continuing");
                        failed.push((gpo.display_name.clone(), e.to_string()));
                    }
                },
            }
        }

        Ok((backed_up, failed))
    }

    /// Write one snapshot per WMI filter into the filters folder
    ///
    /// The folder is created even when the query returns nothing; an
    /// empty result is logged, not an error.
    fn snapshot_filters(&self, daily_folder: &Path) -> BackupResult<usize> {
        let filters_dir = daily_folder.join(&self.settings.filters_dir);
        std::fs::create_dir_all(&filters_dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create filters folder {}: {}",
                filters_dir.display(),
                e
            ))
        })?;

        let filters = self.directory.list_wmi_filters()?;
        if filters.is_empty() {
            info!("no WMI filters found; nothing to snapshot");
            return Ok(0);
        }

        for filter in &filters {
            let path = export::write_filter_snapshot(filter, &filters_dir)?;
            info!(filter = %filter.name, path = %path.display(), "WMI filter snapshot written");
        }

        Ok(filters.len())
    }

    /// Sweep expired daily folders, gated on delete rights over the root
    fn sweep_expired(&self, backup_root: &Path, today: NaiveDate) -> Vec<PrunedFolder> {
        if !permissions::can_delete(backup_root) {
            warn!(root = %backup_root.display(), "no delete rights on backup root; skipping retention sweep");
            return Vec::new();
        }

        retention::prune_expired(backup_root, self.settings.retention_days, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fake::FakeDirectory;
    use crate::directory::{Gpo, WmiFilter};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 20).unwrap()
    }

    fn gpo(name: &str) -> Gpo {
        Gpo::new(Uuid::new_v4(), name)
    }

    fn filter(name: &str) -> WmiFilter {
        WmiFilter {
            id: format!("{{{}}}", Uuid::new_v4()),
            name: name.into(),
            description: None,
            query: "1;3;10;20;WQL;root\\CIMv2;SELECT * FROM X;".into(),
        }
    }

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_invalid_root_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let directory = FakeDirectory::new(vec![gpo("A")], Vec::new());
        let job = BackupJob::new(&directory, settings());

        let err = job.run(&missing, today()).unwrap_err();
        assert!(err.is_validation());
        assert!(!missing.exists());
    }

    #[test]
    fn test_full_run_layout() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FakeDirectory::new(
            vec![gpo("Default Domain Policy"), gpo("Workstation Lockdown")],
            vec![filter("Laptops Only")],
        );
        let job = BackupJob::new(&directory, settings());

        let summary = job.run(temp_dir.path(), today()).unwrap();

        assert_eq!(summary.gpos_backed_up, 2);
        assert!(summary.gpos_failed.is_empty());
        assert_eq!(summary.filters_written, 1);

        let daily = temp_dir.path().join("2024-07-20");
        assert_eq!(summary.daily_folder, daily);
        assert!(daily.join("Default Domain Policy").join("GPOReport.html").exists());
        assert!(daily.join("Workstation Lockdown").join("GPOReport.html").exists());
        assert!(daily.join("WMI_Filters").join("Laptops Only.xml").exists());
    }

    #[test]
    fn test_object_folder_count_matches_gpo_count() {
        let temp_dir = TempDir::new().unwrap();
        let gpos: Vec<Gpo> = (0..5).map(|i| gpo(&format!("Policy {}", i))).collect();
        let directory = FakeDirectory::new(gpos, Vec::new());
        let job = BackupJob::new(&directory, settings());

        let summary = job.run(temp_dir.path(), today()).unwrap();
        assert_eq!(summary.gpos_backed_up, 5);

        let daily = temp_dir.path().join("2024-07-20");
        let object_folders: Vec<_> = std::fs::read_dir(&daily)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter(|e| e.file_name() != "WMI_Filters")
            .collect();
        assert_eq!(object_folders.len(), 5);

        for folder in object_folders {
            let reports = std::fs::read_dir(folder.path())
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name() == "GPOReport.html")
                .count();
            assert_eq!(reports, 1);
        }
    }

    #[test]
    fn test_zero_filters_creates_empty_folder_without_error() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FakeDirectory::new(vec![gpo("A")], Vec::new());
        let job = BackupJob::new(&directory, settings());

        let summary = job.run(temp_dir.path(), today()).unwrap();
        assert_eq!(summary.filters_written, 0);

        let filters_dir = temp_dir.path().join("2024-07-20").join("WMI_Filters");
        assert!(filters_dir.is_dir());
        assert_eq!(std::fs::read_dir(&filters_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_abort_policy_stops_run() {
        let temp_dir = TempDir::new().unwrap();
        let directory =
            FakeDirectory::new(vec![gpo("First"), gpo("Broken"), gpo("Last")], Vec::new())
                .fail_on("Broken");
        let job = BackupJob::new(&directory, settings());

        let err = job.run(temp_dir.path(), today()).unwrap_err();
        assert!(matches!(err, BackupError::Export(_)));

        // The run stopped mid-loop: the filters folder was never created.
        let daily = temp_dir.path().join("2024-07-20");
        assert!(!daily.join("WMI_Filters").exists());
        assert!(!daily.join("Last").join("GPOReport.html").exists());
    }

    #[test]
    fn test_continue_policy_finishes_run() {
        let temp_dir = TempDir::new().unwrap();
        let directory =
            FakeDirectory::new(vec![gpo("First"), gpo("Broken"), gpo("Last")], Vec::new())
                .fail_on("Broken");

        let mut settings = settings();
        settings.on_export_error = FailurePolicy::Continue;
        let job = BackupJob::new(&directory, settings);

        let summary = job.run(temp_dir.path(), today()).unwrap();
        assert_eq!(summary.gpos_backed_up, 2);
        assert_eq!(summary.gpos_failed.len(), 1);
        assert_eq!(summary.gpos_failed[0].0, "Broken");

        let daily = temp_dir.path().join("2024-07-20");
        assert!(daily.join("Last").join("GPOReport.html").exists());
    }

    #[test]
    fn test_run_prunes_expired_folders() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("2023-01-01")).unwrap();
        std::fs::create_dir(temp_dir.path().join("2024-07-19")).unwrap();

        let directory = FakeDirectory::new(Vec::new(), Vec::new());
        let job = BackupJob::new(&directory, settings());

        let summary = job.run(temp_dir.path(), today()).unwrap();
        assert_eq!(summary.pruned.len(), 1);
        assert!(!temp_dir.path().join("2023-01-01").exists());
        assert!(temp_dir.path().join("2024-07-19").exists());
        // Today's own folder survives the sweep.
        assert!(temp_dir.path().join("2024-07-20").exists());
    }

    #[test]
    fn test_gpo_names_are_sanitized_for_folders() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FakeDirectory::new(vec![gpo("Servers/DCs: Baseline")], Vec::new());
        let job = BackupJob::new(&directory, settings());

        let summary = job.run(temp_dir.path(), today()).unwrap();
        assert_eq!(summary.gpos_backed_up, 1);

        let daily = temp_dir.path().join("2024-07-20");
        assert!(daily.join("Servers_DCs_ Baseline").join("GPOReport.html").exists());
    }

    #[test]
    fn test_rerun_same_day_is_idempotent_on_folders() {
        let temp_dir = TempDir::new().unwrap();
        let directory = FakeDirectory::new(vec![gpo("A")], vec![filter("F")]);
        let job = BackupJob::new(&directory, settings());

        job.run(temp_dir.path(), today()).unwrap();
        let summary = job.run(temp_dir.path(), today()).unwrap();

        assert_eq!(summary.gpos_backed_up, 1);
        assert_eq!(summary.filters_written, 1);
    }
}
