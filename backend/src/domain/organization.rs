//! Organizations and their study sponsorships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::BridgeTypeName;

/// An organization in an app, keyed by `(app_id, identifier)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Organization")]
pub struct Organization {
    /// Owning app.
    pub app_id: String,
    /// Organization id.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Organization {
    const TYPE_NAME: &'static str = "Organization";
}

/// An organization sponsoring a study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsor {
    /// Owning app.
    pub app_id: String,
    /// Sponsored study.
    pub study_id: String,
    /// Sponsoring organization.
    pub org_id: String,
}

impl BridgeTypeName for Sponsor {
    const TYPE_NAME: &'static str = "Sponsor";
}

impl Sponsor {
    /// Sponsorship of `study_id` by `org_id`.
    pub fn new(
        app_id: impl Into<String>,
        study_id: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            study_id: study_id.into(),
            org_id: org_id.into(),
        }
    }
}
