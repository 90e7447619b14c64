//! Study schedules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::BridgeTypeName;

/// A versioned, soft-deletable schedule of sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Schedule")]
pub struct Schedule2 {
    /// Schedule guid.
    pub guid: String,
    /// Owning app.
    pub app_id: String,
    /// Owning organization.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// ISO 8601 duration of the schedule, such as `P8W`.
    pub duration: String,
    /// Whether the schedule is published and immutable.
    pub published: bool,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Session definitions.
    pub sessions: Vec<Value>,
    /// Client-defined payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_data: Option<Value>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Schedule2 {
    const TYPE_NAME: &'static str = "Schedule";
}
