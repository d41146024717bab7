//! Top-level backup job
//!
//! Ties the run together: validate the backup root, create the dated
//! folder, export every GPO into its own subfolder, snapshot the WMI
//! filters, then sweep expired daily folders.

mod job;

pub use job::{BackupJob, RunSummary};
