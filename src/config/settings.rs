//! User settings for gpo-backup
//!
//! Manages the retention window, the fixed file/folder names of the
//! persisted layout, and the per-object export failure policy.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::BackupError;

/// What to do when a single GPO's export or report fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the remainder of the run on the first export failure
    #[default]
    Abort,
    /// Log the failure, record it in the summary, and continue with the
    /// next GPO
    Continue,
}

/// User settings for gpo-backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Number of days a dated backup folder is kept
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Name of the per-GPO report file
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Name of the WMI filter snapshot folder inside a daily folder
    #[serde(default = "default_filters_dir")]
    pub filters_dir: String,

    /// Per-object export failure policy
    #[serde(default)]
    pub on_export_error: FailurePolicy,
}

fn default_schema_version() -> u32 {
    1
}

fn default_retention_days() -> u32 {
    30
}

fn default_report_file() -> String {
    "GPOReport.html".to_string()
}

fn default_filters_dir() -> String {
    "WMI_Filters".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            retention_days: default_retention_days(),
            report_file: default_report_file(),
            filters_dir: default_filters_dir(),
            on_export_error: FailurePolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, BackupError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| BackupError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                BackupError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), BackupError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BackupError::Io(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| BackupError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| BackupError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
