//! Enrollment of an account in a study and its read projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountRef;
use super::entity::BridgeTypeName;

/// Association of an account with a study.
///
/// Keyed by `(app_id, study_id, account_id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Enrollment")]
pub struct Enrollment {
    /// Owning app.
    pub app_id: String,
    /// Study enrolled in.
    pub study_id: String,
    /// Enrolled account.
    pub account_id: String,
    /// Study-specific participant identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// When the account was enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_on: Option<DateTime<Utc>>,
    /// Account that performed the enrollment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_by: Option<String>,
    /// When the account withdrew or was withdrawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_on: Option<DateTime<Utc>>,
    /// Account that performed the withdrawal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_by: Option<String>,
    /// Reason given for withdrawal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_note: Option<String>,
    /// Whether the study requires consent.
    pub consent_required: bool,
    /// Administrative note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BridgeTypeName for Enrollment {
    const TYPE_NAME: &'static str = "Enrollment";
}

impl Enrollment {
    /// Enrollment of `account_id` in `study_id`.
    pub fn new(
        app_id: impl Into<String>,
        study_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            study_id: study_id.into(),
            account_id: account_id.into(),
            ..Self::default()
        }
    }

    /// Set the external id.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Whether the enrollment is still active.
    pub fn is_active(&self) -> bool {
        self.withdrawn_on.is_none()
    }
}

/// Which enrollments a study listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentFilter {
    /// Active enrollments.
    Enrolled,
    /// Withdrawn enrollments.
    Withdrawn,
    /// Both.
    #[default]
    All,
}

/// Participant-facing summary of one enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "EnrollmentInfo")]
pub struct EnrollmentInfo {
    /// Study-specific participant identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Whether the study requires consent.
    pub consent_required: bool,
    /// When the account was enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_on: Option<DateTime<Utc>>,
    /// When the account withdrew.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_on: Option<DateTime<Utc>>,
    /// Whether the participant enrolled themselves.
    pub enrolled_by_self: bool,
    /// Whether the participant withdrew themselves.
    pub withdrawn_by_self: bool,
}

impl From<&Enrollment> for EnrollmentInfo {
    fn from(enrollment: &Enrollment) -> Self {
        let by_self = |actor: &Option<String>| {
            actor
                .as_deref()
                .is_none_or(|id| id == enrollment.account_id)
        };
        Self {
            external_id: enrollment.external_id.clone(),
            consent_required: enrollment.consent_required,
            enrolled_on: enrollment.enrolled_on,
            withdrawn_on: enrollment.withdrawn_on,
            enrolled_by_self: by_self(&enrollment.enrolled_by),
            withdrawn_by_self: enrollment.withdrawn_on.is_some()
                && by_self(&enrollment.withdrawn_by),
        }
    }
}

/// Administrative view of an enrollment with account references in place
/// of raw ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "EnrollmentDetail")]
pub struct EnrollmentDetail {
    /// Enrolled participant.
    pub participant: AccountRef,
    /// Study enrolled in.
    pub study_id: String,
    /// Study-specific participant identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Whether the study requires consent.
    pub consent_required: bool,
    /// When the account was enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_on: Option<DateTime<Utc>>,
    /// Account that performed the enrollment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_by: Option<AccountRef>,
    /// When the account withdrew.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_on: Option<DateTime<Utc>>,
    /// Account that performed the withdrawal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_by: Option<AccountRef>,
    /// Reason given for withdrawal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_note: Option<String>,
    /// Administrative note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EnrollmentDetail {
    /// Combine an enrollment with resolved account references.
    pub fn new(
        enrollment: Enrollment,
        participant: AccountRef,
        enrolled_by: Option<AccountRef>,
        withdrawn_by: Option<AccountRef>,
    ) -> Self {
        Self {
            participant,
            study_id: enrollment.study_id,
            external_id: enrollment.external_id,
            consent_required: enrollment.consent_required,
            enrolled_on: enrollment.enrolled_on,
            enrolled_by,
            withdrawn_on: enrollment.withdrawn_on,
            withdrawn_by,
            withdrawal_note: enrollment.withdrawal_note,
            note: enrollment.note,
        }
    }
}
