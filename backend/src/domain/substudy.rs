//! Substudies, the optional sub-scope accounts can be assigned to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::BridgeTypeName;

/// A substudy keyed by `(app_id, id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Substudy")]
pub struct Substudy {
    /// Owning app.
    pub app_id: String,
    /// Substudy id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Substudy {
    const TYPE_NAME: &'static str = "Substudy";
}
