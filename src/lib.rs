//! gpo-backup - Scheduled Group Policy backup utility
//!
//! This library provides the core functionality for the gpo-backup tool.
//! It exports Group Policy Objects and their associated WMI filters from
//! a directory service into dated, per-object backup folders and prunes
//! backups older than a retention window.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Settings management
//! - `error`: Custom error types
//! - `directory`: Directory-service data model and access layer
//! - `export`: Per-object export and WMI filter snapshots
//! - `retention`: Dated-folder retention sweep
//! - `permissions`: Delete-rights check on a path
//! - `backup`: The top-level backup job
//!
//! # Example
//!
//! ```rust,ignore
//! use gpo_backup::backup::BackupJob;
//! use gpo_backup::config::Settings;
//! use gpo_backup::directory::PowerShellDirectory;
//!
//! let directory = PowerShellDirectory::new();
//! let job = BackupJob::new(&directory, Settings::default());
//! let summary = job.run_today(std::path::Path::new(r"D:\GpoBackups"))?;
//! println!("{} GPOs backed up", summary.gpos_backed_up);
//! ```

pub mod backup;
pub mod config;
pub mod directory;
pub mod error;
pub mod export;
pub mod permissions;
pub mod retention;

pub use error::{BackupError, BackupResult};
