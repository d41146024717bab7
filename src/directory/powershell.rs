//! PowerShell bridge to the Group Policy management cmdlets
//!
//! Each directory-service operation shells out to the platform's
//! PowerShell and exchanges data as JSON. Queries always treat the
//! result as a sequence of zero-or-more items: `ConvertTo-Json` emits a
//! bare object for a single result and an array for several, so the
//! output is normalized into a `Vec` in one place before parsing.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BackupError, BackupResult};

use super::models::{Gpo, WmiFilter};
use super::DirectoryService;

/// Environment variable overriding the shell binary
const SHELL_ENV: &str = "GPO_BACKUP_SHELL";

/// Directory service backed by the GroupPolicy and ActiveDirectory
/// PowerShell modules
pub struct PowerShellDirectory {
    shell: String,
}

impl PowerShellDirectory {
    /// Create a bridge using the platform default shell
    /// (`powershell.exe` on Windows, `pwsh` elsewhere), overridable via
    /// the `GPO_BACKUP_SHELL` environment variable.
    pub fn new() -> Self {
        let shell = std::env::var(SHELL_ENV).unwrap_or_else(|_| {
            if cfg!(windows) {
                "powershell.exe".to_string()
            } else {
                "pwsh".to_string()
            }
        });
        Self { shell }
    }

    /// Run a script and return its raw stdout
    ///
    /// Scripts run with `$ErrorActionPreference = 'Stop'` so any
    /// terminating cmdlet error surfaces as a nonzero exit status.
    fn run(&self, script: &str) -> BackupResult<String> {
        debug!(shell = %self.shell, script, "invoking directory bridge");

        let full_script = format!("$ErrorActionPreference = 'Stop'; {}", script);
        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command", &full_script])
            .output()
            .map_err(|e| {
                BackupError::Directory(format!("Failed to launch {}: {}", self.shell, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::Directory(format!(
                "{} exited with {}: {}",
                self.shell,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a script expected to emit JSON, normalized to a sequence
    fn run_json_items(&self, script: &str) -> BackupResult<Vec<serde_json::Value>> {
        let stdout = self.run(script)?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
            BackupError::Directory(format!("Failed to parse bridge output: {}", e))
        })?;

        Ok(as_items(value))
    }
}

impl Default for PowerShellDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryService for PowerShellDirectory {
    fn list_gpos(&self) -> BackupResult<Vec<Gpo>> {
        let script = "Get-GPO -All | ForEach-Object { [pscustomobject]@{ \
                      Id = $_.Id.ToString(); DisplayName = $_.DisplayName } } \
                      | ConvertTo-Json";
        let items = self.run_json_items(script)?;
        items.into_iter().map(parse_gpo).collect()
    }

    fn find_gpo(&self, name: &str) -> BackupResult<Gpo> {
        // A missing GPO yields an empty pipeline rather than a
        // terminating error, so bridge failures (shell launch, module
        // missing, malformed JSON) stay distinguishable from "not found".
        let script = format!(
            "$g = Get-GPO -Name {} -ErrorAction SilentlyContinue; \
             if ($g) {{ [pscustomobject]@{{ \
             Id = $g.Id.ToString(); DisplayName = $g.DisplayName }} | ConvertTo-Json }}",
            ps_quote(name)
        );

        let items = self.run_json_items(&script)?;

        items
            .into_iter()
            .next()
            .map(parse_gpo)
            .transpose()?
            .ok_or_else(|| BackupError::gpo_not_found(name))
    }

    fn list_wmi_filters(&self) -> BackupResult<Vec<WmiFilter>> {
        let script = "Get-ADObject -LDAPFilter '(objectClass=msWMI-Som)' \
                      -Properties 'msWMI-Name','msWMI-Parm1','msWMI-Parm2','msWMI-ID' \
                      | ForEach-Object { [pscustomobject]@{ \
                      Id = $_.'msWMI-ID'; Name = $_.'msWMI-Name'; \
                      Description = $_.'msWMI-Parm1'; Query = $_.'msWMI-Parm2' } } \
                      | ConvertTo-Json";
        let items = self.run_json_items(script)?;
        items.into_iter().map(parse_filter).collect()
    }

    fn backup_gpo(&self, gpo: &Gpo, dest: &Path) -> BackupResult<()> {
        let script = format!(
            "Backup-GPO -Guid '{}' -Path {} | Out-Null",
            gpo.id,
            ps_quote(&dest.display().to_string())
        );
        self.run(&script)
            .map_err(|e| BackupError::Export(format!("Backup of '{}' failed: {}", gpo.display_name, e)))?;
        Ok(())
    }

    fn export_report(&self, gpo: &Gpo, dest_file: &Path) -> BackupResult<()> {
        let script = format!(
            "Get-GPOReport -Guid '{}' -ReportType Html -Path {}",
            gpo.id,
            ps_quote(&dest_file.display().to_string())
        );
        self.run(&script)
            .map_err(|e| BackupError::Export(format!("Report for '{}' failed: {}", gpo.display_name, e)))?;
        Ok(())
    }
}

/// Normalize a JSON value to a sequence of zero-or-more items
///
/// `ConvertTo-Json` emits `null` for empty pipelines, a bare object for
/// one result, and an array for several. Treating all three shapes as a
/// sequence here keeps every caller on a single code path.
fn as_items(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items,
        other => vec![other],
    }
}

/// Quote a string as a PowerShell single-quoted literal
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[derive(Deserialize)]
struct RawGpo {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "DisplayName")]
    display_name: String,
}

fn parse_gpo(value: serde_json::Value) -> BackupResult<Gpo> {
    let raw: RawGpo = serde_json::from_value(value)
        .map_err(|e| BackupError::Directory(format!("Malformed GPO record: {}", e)))?;

    let id = Uuid::parse_str(raw.id.trim_matches(|c| c == '{' || c == '}'))
        .map_err(|e| BackupError::Directory(format!("Malformed GPO id '{}': {}", raw.id, e)))?;

    Ok(Gpo::new(id, raw.display_name))
}

#[derive(Deserialize)]
struct RawFilter {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Query", default)]
    query: Option<String>,
}

fn parse_filter(value: serde_json::Value) -> BackupResult<WmiFilter> {
    let raw: RawFilter = serde_json::from_value(value)
        .map_err(|e| BackupError::Directory(format!("Malformed WMI filter record: {}", e)))?;

    Ok(WmiFilter {
        id: raw.id,
        name: raw.name,
        description: raw.description,
        query: raw.query.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_items_null_is_empty() {
        assert!(as_items(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_as_items_single_object_becomes_sequence() {
        let items = as_items(json!({ "Name": "one" }));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_as_items_array_passes_through() {
        let items = as_items(json!([{ "Name": "a" }, { "Name": "b" }]));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_ps_quote_escapes_single_quotes() {
        assert_eq!(ps_quote("it's"), "'it''s'");
    }

    #[test]
    fn test_parse_gpo_strips_braces() {
        let value = json!({
            "Id": "{31b2f340-016d-11d2-945f-00c04fb984f9}",
            "DisplayName": "Default Domain Policy"
        });
        let gpo = parse_gpo(value).unwrap();
        assert_eq!(
            gpo.id.to_string(),
            "31b2f340-016d-11d2-945f-00c04fb984f9"
        );
    }

    #[test]
    fn test_find_gpo_bridge_failure_is_directory_error() {
        std::env::set_var(SHELL_ENV, "/nonexistent/shell-binary");
        let directory = PowerShellDirectory::new();
        std::env::remove_var(SHELL_ENV);

        let err = directory.find_gpo("Default Domain Policy").unwrap_err();
        assert!(matches!(err, BackupError::Directory(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_parse_filter_missing_optionals() {
        let value = json!({ "Id": "{x}", "Name": "Laptops" });
        let filter = parse_filter(value).unwrap();
        assert_eq!(filter.name, "Laptops");
        assert!(filter.description.is_none());
        assert!(filter.query.is_empty());
    }
}
