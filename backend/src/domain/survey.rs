//! Legacy surveys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::BridgeTypeName;

/// One revision of a survey, keyed by `(guid, created_on)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Survey")]
pub struct Survey {
    /// Survey guid shared by every revision.
    pub guid: String,
    /// Revision timestamp.
    pub created_on: DateTime<Utc>,
    /// Owning app.
    pub app_id: String,
    /// Stable identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Copyright notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright_notice: Option<String>,
    /// Shared module this survey was imported from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    /// Whether the revision is published.
    pub published: bool,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Upload schema revision generated on publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_revision: Option<i32>,
    /// Questions and info screens.
    pub elements: Vec<Value>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Survey {
    const TYPE_NAME: &'static str = "Survey";
}
