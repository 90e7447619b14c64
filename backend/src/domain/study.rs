//! Studies and the value objects embedded in them.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::account::{AccountRef, Phone};
use super::entity::BridgeTypeName;

/// Lifecycle phase of a study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyPhase {
    /// Created before phases existed.
    Legacy,
    /// Being designed.
    #[default]
    Design,
    /// Recruiting participants.
    Recruitment,
    /// Running, no longer recruiting.
    InFlight,
    /// Data under analysis.
    Analysis,
    /// Finished.
    Completed,
    /// Stopped before completion.
    Withdrawn,
}

/// Outcome of IRB review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrbDecisionType {
    /// Exempt from review.
    Exempt,
    /// Approved.
    Approved,
}

/// Role of a study contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    /// Institutional review board.
    Irb,
    /// Principal investigator.
    PrincipalInvestigator,
    /// Investigator.
    Investigator,
    /// Sponsor.
    Sponsor,
    /// Study support.
    StudySupport,
    /// Technical support.
    TechnicalSupport,
}

/// Postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Building or institution name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
    /// Street lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Routing information inside the organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_routing: Option<String>,
    /// City.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or province.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    /// Postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Person or office to contact about a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Role.
    pub role: ContactRole,
    /// Name.
    pub name: String,
    /// Position held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Affiliated institution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// Postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    /// Jurisdiction the contact covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

/// How a custom event's timestamp may change once set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventUpdateType {
    /// May be changed freely.
    #[default]
    Mutable,
    /// Set once.
    Immutable,
    /// May only move later.
    FutureOnly,
}

/// Study-defined event participants can be scheduled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCustomEvent {
    /// Event id.
    pub event_id: String,
    /// Update rule.
    pub update_type: EventUpdateType,
}

/// Colors used to brand a study or assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    /// Background color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Foreground color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    /// Color of active controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<String>,
    /// Color of inactive controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivated: Option<String>,
}

/// Synapse export settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exporter3Configuration {
    /// Notification topic for new study exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_study_notification_topic_arn: Option<String>,
    /// Synapse team with data access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_access_team_id: Option<i64>,
    /// Participant version table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_version_table_id: Option<String>,
    /// Synapse project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Folder receiving raw data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data_folder_id: Option<String>,
    /// Storage location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location_id: Option<i64>,
}

impl Exporter3Configuration {
    /// Whether every identifier needed for export is present.
    pub fn is_configured(&self) -> bool {
        self.data_access_team_id.is_some()
            && self.project_id.is_some()
            && self.raw_data_folder_id.is_some()
            && self.storage_location_id.is_some()
    }
}

/// A research protocol in an app.
///
/// Keyed by `(app_id, identifier)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Study")]
pub struct Study {
    /// Owning app.
    pub app_id: String,
    /// Study id, immutable once created.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Lifecycle phase.
    pub phase: StudyPhase,
    /// Logo URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_logo_url: Option<String>,
    /// Branding colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    /// Sponsoring institution's study id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    /// Reviewing IRB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_name: Option<String>,
    /// Protocol name on file with the IRB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_protocol_name: Option<String>,
    /// Protocol id on file with the IRB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_protocol_id: Option<String>,
    /// Date of the IRB decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_decision_on: Option<NaiveDate>,
    /// Date the IRB approval lapses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_expires_on: Option<NaiveDate>,
    /// IRB decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_decision_type: Option<IrbDecisionType>,
    /// Search keywords.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Conditions studied.
    pub diseases: BTreeSet<String>,
    /// Study design labels.
    pub study_designs: BTreeSet<String>,
    /// Contacts.
    pub contacts: Vec<Contact>,
    /// Custom events.
    pub custom_events: Vec<StudyCustomEvent>,
    /// Synapse export settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exporter3_configuration: Option<Exporter3Configuration>,
    /// Whether Synapse export is on.
    pub exporter3_enabled: bool,
    /// Schedule assigned to the study.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_guid: Option<String>,
    /// Account that created the study.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// When recruitment started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launched_on: Option<DateTime<Utc>>,
    /// When the study completed or was withdrawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closeout_on: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Optimistic-lock version.
    pub version: i64,
}

impl BridgeTypeName for Study {
    const TYPE_NAME: &'static str = "Study";
}

/// Read-only study projection with the creator resolved to an
/// [`AccountRef`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "StudyDetail")]
pub struct StudyDetail {
    /// Study id.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Lifecycle phase.
    pub phase: StudyPhase,
    /// Logo URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_logo_url: Option<String>,
    /// Branding colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    /// Sponsoring institution's study id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    /// Reviewing IRB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_name: Option<String>,
    /// Date of the IRB decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_decision_on: Option<NaiveDate>,
    /// Date the IRB approval lapses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_expires_on: Option<NaiveDate>,
    /// IRB decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irb_decision_type: Option<IrbDecisionType>,
    /// Search keywords.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Conditions studied.
    pub diseases: BTreeSet<String>,
    /// Study design labels.
    pub study_designs: BTreeSet<String>,
    /// Contacts.
    pub contacts: Vec<Contact>,
    /// Creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<AccountRef>,
    /// When recruitment started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launched_on: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Optimistic-lock version.
    pub version: i64,
}

impl StudyDetail {
    /// Project a study, substituting the resolved creator.
    pub fn new(study: Study, created_by: Option<AccountRef>) -> Self {
        Self {
            identifier: study.identifier,
            name: study.name,
            details: study.details,
            phase: study.phase,
            study_logo_url: study.study_logo_url,
            color_scheme: study.color_scheme,
            institution_id: study.institution_id,
            irb_name: study.irb_name,
            irb_decision_on: study.irb_decision_on,
            irb_expires_on: study.irb_expires_on,
            irb_decision_type: study.irb_decision_type,
            keywords: study.keywords,
            diseases: study.diseases,
            study_designs: study.study_designs,
            contacts: study.contacts,
            created_by,
            launched_on: study.launched_on,
            created_on: study.created_on,
            modified_on: study.modified_on,
            deleted: study.deleted,
            version: study.version,
        }
    }
}
