//! Wire types for the trigger system's change notifications and the
//! response this service returns for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A change notification emitted by the database trigger system.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    /// Unique id of this notification.
    pub id: String,
    pub event: ChangePayload,
    pub table: TableRef,
    pub trigger: TriggerRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePayload {
    /// `INSERT`, `UPDATE` or `DELETE`. Passed through as-is, never validated.
    pub op: String,
    pub data: RowData,
}

/// Row images around the change. `old` is absent on insert, `new` on delete.
#[derive(Debug, Clone, Deserialize)]
pub struct RowData {
    #[serde(default)]
    pub old: Option<Map<String, Value>>,
    #[serde(default)]
    pub new: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRef {
    pub name: String,
    pub schema: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRef {
    pub id: String,
    pub name: String,
}

/// Acknowledgement returned to the trigger system. `oldData` and `newData`
/// echo the inbound row images untouched.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub message: String,
    #[serde(rename = "oldData")]
    pub old_data: Option<Map<String, Value>>,
    #[serde(rename = "newData")]
    pub new_data: Option<Map<String, Value>>,
}
