//! Data model for directory-service objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Group Policy Object as returned by the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gpo {
    /// Unique handle (the GPO's GUID)
    pub id: Uuid,
    /// Display name; also used as the backup folder name
    pub display_name: String,
}

impl Gpo {
    /// Create a new GPO record
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// A WMI filter object as stored in the directory
///
/// The query blob is kept verbatim as the directory stores it; the
/// snapshot serializes the whole structure so a restore has everything
/// the directory had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "WmiFilter", rename_all = "PascalCase")]
pub struct WmiFilter {
    /// Directory identifier (msWMI-ID)
    pub id: String,
    /// Filter name (msWMI-Name); also used as the snapshot file name
    pub name: String,
    /// Optional description (msWMI-Parm1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Packed query blob (msWMI-Parm2), stored wholesale
    pub query: String,
}
