//! Participant and administrator accounts.
//!
//! An [`Account`] owns its enrollments (at most one per study) and its
//! consent-signature histories. [`AccountId`] names the ways an account can
//! be looked up, and [`AccountSummary`] is the projection returned by
//! paged searches.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, Utc};
use pagination::PageRequest;
use serde::{Deserialize, Serialize};

use super::context::{Role, StudyScope};
use super::enrollment::Enrollment;
use super::entity::BridgeTypeName;

/// Phone number with its ISO region code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    /// Number as entered.
    pub number: String,
    /// Two-letter region code such as `US`.
    pub region_code: String,
}

impl Phone {
    /// Create a phone number.
    pub fn new(number: impl Into<String>, region_code: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            region_code: region_code.into(),
        }
    }
}

/// Lifecycle state of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Created but no credential verified yet.
    #[default]
    Unverified,
    /// Active.
    Enabled,
    /// Locked by an administrator.
    Disabled,
}

impl AccountStatus {
    /// Column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

/// One signature of a consent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSignature {
    /// Signer's name.
    pub name: String,
    /// Signer's birthdate as entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    /// Creation time of the consent document that was signed.
    pub consent_created_on: DateTime<Utc>,
    /// When the signature was made.
    pub signed_on: DateTime<Utc>,
    /// When consent was withdrawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrew_on: Option<DateTime<Utc>>,
}

/// A Bridge account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "Account")]
pub struct Account {
    /// Account id.
    pub id: String,
    /// Owning app.
    pub app_id: String,
    /// Organization the account administers for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_membership: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the email was verified.
    pub email_verified: bool,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    /// Whether the phone was verified.
    pub phone_verified: bool,
    /// Linked Synapse user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synapse_user_id: Option<String>,
    /// De-identified health code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_code: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Free-form profile attributes.
    pub attributes: BTreeMap<String, String>,
    /// Password hash; never serialized.
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// Administrative roles.
    pub roles: BTreeSet<Role>,
    /// Data groups used for filtering.
    pub data_groups: BTreeSet<String>,
    /// Preferred languages, most preferred first.
    pub languages: Vec<String>,
    /// Lifecycle state.
    pub status: AccountStatus,
    /// Time zone offset captured at sign-up.
    #[serde(
        with = "super::time_zone::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub time_zone: Option<FixedOffset>,
    /// IANA zone reported by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_time_zone: Option<String>,
    /// Administrative note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Last modification time.
    pub modified_on: DateTime<Utc>,
    /// Optimistic-lock version.
    pub version: i64,
    /// Study enrollments.
    pub enrollments: Vec<Enrollment>,
    /// Consent signatures keyed by subpopulation guid.
    pub consent_signature_histories: BTreeMap<String, Vec<ConsentSignature>>,
}

impl BridgeTypeName for Account {
    const TYPE_NAME: &'static str = "Account";
}

impl Account {
    /// Enrollment in a study, if any.
    pub fn enrollment_for(&self, study_id: &str) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.study_id == study_id)
    }

    /// Add an enrollment, replacing any existing enrollment in the same
    /// study so an account never holds two.
    pub fn enroll(&mut self, enrollment: Enrollment) {
        match self
            .enrollments
            .iter_mut()
            .find(|existing| existing.study_id == enrollment.study_id)
        {
            Some(existing) => *existing = enrollment,
            None => self.enrollments.push(enrollment),
        }
    }

    /// External ids keyed by study id.
    pub fn external_ids(&self) -> BTreeMap<String, String> {
        self.enrollments
            .iter()
            .filter_map(|e| {
                e.external_id
                    .as_ref()
                    .map(|ext| (e.study_id.clone(), ext.clone()))
            })
            .collect()
    }

    /// Drop enrollments outside the caller's visible studies.
    #[must_use]
    pub fn restricted_to(mut self, scope: &StudyScope) -> Self {
        self.enrollments.retain(|e| scope.allows(&e.study_id));
        self
    }
}

/// The ways an account can be addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountId {
    /// By account id.
    Id {
        /// App scope.
        app_id: String,
        /// Account id.
        id: String,
    },
    /// By email.
    Email {
        /// App scope.
        app_id: String,
        /// Email address.
        email: String,
    },
    /// By phone number.
    Phone {
        /// App scope.
        app_id: String,
        /// Phone number.
        phone: Phone,
    },
    /// By an external id held on any enrollment.
    ExternalId {
        /// App scope.
        app_id: String,
        /// External id.
        external_id: String,
    },
    /// By Synapse user id.
    SynapseUserId {
        /// App scope.
        app_id: String,
        /// Synapse user id.
        synapse_user_id: String,
    },
    /// By health code.
    HealthCode {
        /// App scope.
        app_id: String,
        /// Health code.
        health_code: String,
    },
}

impl AccountId {
    /// Address by account id.
    pub fn for_id(app_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Id {
            app_id: app_id.into(),
            id: id.into(),
        }
    }

    /// Address by email.
    pub fn for_email(app_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::Email {
            app_id: app_id.into(),
            email: email.into(),
        }
    }

    /// Address by phone.
    pub fn for_phone(app_id: impl Into<String>, phone: Phone) -> Self {
        Self::Phone {
            app_id: app_id.into(),
            phone,
        }
    }

    /// Address by external id.
    pub fn for_external_id(app_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self::ExternalId {
            app_id: app_id.into(),
            external_id: external_id.into(),
        }
    }

    /// Address by Synapse user id.
    pub fn for_synapse_user_id(
        app_id: impl Into<String>,
        synapse_user_id: impl Into<String>,
    ) -> Self {
        Self::SynapseUserId {
            app_id: app_id.into(),
            synapse_user_id: synapse_user_id.into(),
        }
    }

    /// Address by health code.
    pub fn for_health_code(app_id: impl Into<String>, health_code: impl Into<String>) -> Self {
        Self::HealthCode {
            app_id: app_id.into(),
            health_code: health_code.into(),
        }
    }

    /// App the lookup is scoped to.
    pub fn app_id(&self) -> &str {
        match self {
            Self::Id { app_id, .. }
            | Self::Email { app_id, .. }
            | Self::Phone { app_id, .. }
            | Self::ExternalId { app_id, .. }
            | Self::SynapseUserId { app_id, .. }
            | Self::HealthCode { app_id, .. } => app_id,
        }
    }
}

/// Compact reference to an account embedded in other projections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "AccountRef")]
pub struct AccountRef {
    /// Account id.
    pub identifier: String,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    /// Synapse user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synapse_user_id: Option<String>,
    /// Organization membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_membership: Option<String>,
    /// External id in the referencing study.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl AccountRef {
    /// Reference an account, resolving the external id for `study_id`.
    pub fn from_account(account: &Account, study_id: Option<&str>) -> Self {
        let external_id = study_id
            .and_then(|id| account.enrollment_for(id))
            .and_then(|e| e.external_id.clone());
        Self {
            identifier: account.id.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            synapse_user_id: account.synapse_user_id.clone(),
            org_membership: account.org_membership.clone(),
            external_id,
        }
    }
}

/// Row of a paged account search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", rename = "AccountSummary")]
pub struct AccountSummary {
    /// Account id.
    pub id: String,
    /// Owning app.
    pub app_id: String,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    /// Synapse user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synapse_user_id: Option<String>,
    /// External ids keyed by study id, restricted to visible studies.
    pub external_ids: BTreeMap<String, String>,
    /// Visible study ids the account is enrolled in.
    pub study_ids: BTreeSet<String>,
    /// Creation time.
    pub created_on: DateTime<Utc>,
    /// Lifecycle state.
    pub status: AccountStatus,
    /// Organization membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_membership: Option<String>,
    /// Administrative note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Data groups.
    pub data_groups: BTreeSet<String>,
    /// Roles.
    pub roles: BTreeSet<Role>,
    /// Profile attributes.
    pub attributes: BTreeMap<String, String>,
}

impl AccountSummary {
    /// Summarize an account as seen through `scope`.
    pub fn from_account(account: &Account, scope: &StudyScope) -> Self {
        let visible = account
            .enrollments
            .iter()
            .filter(|e| scope.allows(&e.study_id));
        let mut external_ids = BTreeMap::new();
        let mut study_ids = BTreeSet::new();
        for enrollment in visible {
            study_ids.insert(enrollment.study_id.clone());
            if let Some(ext) = &enrollment.external_id {
                external_ids.insert(enrollment.study_id.clone(), ext.clone());
            }
        }
        Self {
            id: account.id.clone(),
            app_id: account.app_id.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            synapse_user_id: account.synapse_user_id.clone(),
            external_ids,
            study_ids,
            created_on: account.created_on,
            status: account.status,
            org_membership: account.org_membership.clone(),
            note: account.note.clone(),
            data_groups: account.data_groups.clone(),
            roles: account.roles.clone(),
            attributes: account.attributes.clone(),
        }
    }
}

/// Filters for a paged account search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSummarySearch {
    /// Offset and page size.
    pub page: PageRequest,
    /// Substring match on email.
    pub email_filter: Option<String>,
    /// Substring match on phone number.
    pub phone_filter: Option<String>,
    /// Substring match on any enrollment's external id.
    pub external_id_filter: Option<String>,
    /// Exact organization; `"<none>"` matches accounts without one.
    pub org_membership: Option<String>,
    /// Restrict to accounts with (`true`) or without (`false`) roles.
    pub admin_only: Option<bool>,
    /// Restrict to accounts enrolled in this study.
    pub enrolled_in_study: Option<String>,
    /// Restrict by lifecycle state.
    pub status: Option<AccountStatus>,
    /// Restrict to accounts preferring this language.
    pub language: Option<String>,
    /// Accounts must belong to every one of these groups.
    pub all_of_groups: BTreeSet<String>,
    /// Accounts must belong to none of these groups.
    pub none_of_groups: BTreeSet<String>,
    /// Created on or after.
    pub start_time: Option<DateTime<Utc>>,
    /// Created on or before.
    pub end_time: Option<DateTime<Utc>>,
}

/// Organization filter value that selects accounts with no organization.
pub const NO_ORGANIZATION: &str = "<none>";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn account() -> Account {
        let mut account = Account {
            id: "user-1".into(),
            app_id: "api".into(),
            ..Account::default()
        };
        account.enroll(Enrollment::new("api", "study-a", "user-1").with_external_id("ext-a"));
        account.enroll(Enrollment::new("api", "study-b", "user-1").with_external_id("ext-b"));
        account
    }

    #[rstest]
    fn enroll_replaces_an_existing_enrollment_in_the_same_study(mut account: Account) {
        account.enroll(Enrollment::new("api", "study-a", "user-1").with_external_id("ext-c"));
        assert_eq!(account.enrollments.len(), 2);
        assert_eq!(
            account
                .enrollment_for("study-a")
                .and_then(|e| e.external_id.as_deref()),
            Some("ext-c")
        );
    }

    #[rstest]
    fn restricted_scope_hides_other_studies(account: Account) {
        let scope = StudyScope::Restricted(BTreeSet::from(["study-b".to_owned()]));
        let visible = account.restricted_to(&scope);
        assert_eq!(
            visible.external_ids(),
            BTreeMap::from([("study-b".to_owned(), "ext-b".to_owned())])
        );
    }

    #[rstest]
    fn summary_only_lists_visible_external_ids(account: Account) {
        let scope = StudyScope::Restricted(BTreeSet::from(["study-a".to_owned()]));
        let summary = AccountSummary::from_account(&account, &scope);
        assert_eq!(summary.study_ids, BTreeSet::from(["study-a".to_owned()]));
        assert_eq!(summary.external_ids.len(), 1);
    }

    #[rstest]
    fn account_json_omits_nulls_and_secrets(mut account: Account) {
        account.password_hash = Some("secret".into());
        let json = serde_json::to_value(&account).expect("serializable");
        assert_eq!(json["type"], "Account");
        assert!(json.get("email").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["appId"], "api");
    }

    #[rstest]
    fn account_ref_resolves_external_id_for_the_study(account: Account) {
        let reference = AccountRef::from_account(&account, Some("study-b"));
        assert_eq!(reference.external_id.as_deref(), Some("ext-b"));
        assert_eq!(reference.identifier, "user-1");
    }
}
