use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpo_backup::backup::BackupJob;
use gpo_backup::config::{FailurePolicy, Settings};
use gpo_backup::directory::PowerShellDirectory;
use gpo_backup::error::BackupError;

#[derive(Parser)]
#[command(
    name = "gpo-backup",
    author = "Kaylee Beyene",
    version,
    about = "Scheduled Group Policy backup utility",
    long_about = "gpo-backup exports every Group Policy Object in the domain into a \
                  dated folder under the backup path, writes an HTML report per GPO, \
                  snapshots all WMI filters, and prunes dated folders older than the \
                  retention window. Intended for unattended runs from a task scheduler."
)]
struct Cli {
    /// Backup destination path (must exist and be a directory)
    backup_path: PathBuf,

    /// Days to keep dated backup folders
    retention_days: Option<u32>,

    /// What to do when a single GPO export fails
    #[arg(long, value_enum)]
    on_export_error: Option<FailurePolicy>,

    /// Optional settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Validate the backup root before any other action; nothing is
    // created when this fails.
    if !cli.backup_path.is_dir() {
        return Err(BackupError::Validation(format!(
            "Backup path does not exist or is not a directory: {}",
            cli.backup_path.display()
        ))
        .into());
    }

    let mut settings = match &cli.config {
        Some(path) => {
            let settings = Settings::load_or_create(path)?;
            // First run against a fresh config path: persist the
            // defaults so the operator has a file to edit.
            if !path.exists() {
                settings.save(path)?;
            }
            settings
        }
        None => Settings::default(),
    };
    if let Some(days) = cli.retention_days {
        settings.retention_days = days;
    }
    if let Some(policy) = cli.on_export_error {
        settings.on_export_error = policy;
    }

    let directory = PowerShellDirectory::new();
    let job = BackupJob::new(&directory, settings);
    let summary = job.run_today(&cli.backup_path)?;

    println!("Backup complete: {}", summary.daily_folder.display());
    println!("  GPOs backed up:   {}", summary.gpos_backed_up);
    if !summary.gpos_failed.is_empty() {
        println!("  GPOs failed:      {}", summary.gpos_failed.len());
        for (name, error) in &summary.gpos_failed {
            println!("    {}: {}", name, error);
        }
    }
    println!("  Filter snapshots: {}", summary.filters_written);
    println!("  Folders pruned:   {}", summary.pruned.len());
    for pruned in &summary.pruned {
        println!(
            "    {} ({} days old)",
            pruned.path.display(),
            pruned.age_days
        );
    }

    Ok(())
}
