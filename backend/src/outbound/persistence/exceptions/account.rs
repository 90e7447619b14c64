//! Account constraint translation.
//!
//! A unique-index violation says which column collided but not which
//! account holds the value, so the converter looks the value up again to
//! report the existing account's id.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::AccountLookup;
use crate::domain::{Account, AccountId, BridgeEntity, BridgeError, PersistenceFailure};

use super::{Conversion, PersistenceExceptionConverter, Violation, convert_basic, keys};

/// Unique index on `(app_id, email)`.
pub const EMAIL_INDEX: &str = "Accounts-StudyId-Email-Index";
/// Unique index on `(app_id, phone_number)`.
pub const PHONE_INDEX: &str = "Accounts-StudyId-Phone-Index";
/// Unique index on enrollment external ids.
pub const EXTERNAL_ID_INDEX: &str = "Accounts-StudyId-ExternalId-Index";
/// Unique index on `(app_id, synapse_user_id)`.
pub const SYNAPSE_USER_ID_INDEX: &str = "Accounts-StudyId-SynapseUserId-Index";

/// Message for account constraint violations that cannot be attributed.
pub const ACCOUNT_CONSTRAINT_MESSAGE: &str = "Accounts table constraint prevented save or update.";

const FK_ORGANIZATION: &str = "fk_accounts_organization";
const FK_ENROLLMENT_STUDY: &str = "fk_enrollments_study";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountIndex {
    Email,
    Phone,
    ExternalId,
    SynapseUserId,
}

impl AccountIndex {
    const ALL: [Self; 4] = [Self::Email, Self::Phone, Self::ExternalId, Self::SynapseUserId];

    fn name(self) -> &'static str {
        match self {
            Self::Email => EMAIL_INDEX,
            Self::Phone => PHONE_INDEX,
            Self::ExternalId => EXTERNAL_ID_INDEX,
            Self::SynapseUserId => SYNAPSE_USER_ID_INDEX,
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::Email => "Email address has already been used by another account.",
            Self::Phone => "Phone number has already been used by another account.",
            Self::ExternalId => "External ID has already been used by another account.",
            Self::SynapseUserId => "Synapse User ID has already been used by another account.",
        }
    }

    /// Lookups that could find the account holding the colliding value.
    /// External ids are tried in enrollment order.
    fn candidates(self, account: &Account) -> Vec<AccountId> {
        let app_id = account.app_id.as_str();
        match self {
            Self::Email => account
                .email
                .iter()
                .map(|email| AccountId::for_email(app_id, email.as_str()))
                .collect(),
            Self::Phone => account
                .phone
                .iter()
                .map(|phone| AccountId::for_phone(app_id, phone.clone()))
                .collect(),
            Self::ExternalId => account
                .enrollments
                .iter()
                .filter_map(|enrollment| enrollment.external_id.as_deref())
                .map(|external_id| AccountId::for_external_id(app_id, external_id))
                .collect(),
            Self::SynapseUserId => account
                .synapse_user_id
                .iter()
                .map(|id| AccountId::for_synapse_user_id(app_id, id.as_str()))
                .collect(),
        }
    }
}

/// Converter for account writes.
#[derive(Clone)]
pub struct AccountPersistenceExceptionConverter {
    lookup: Arc<dyn AccountLookup>,
}

impl AccountPersistenceExceptionConverter {
    /// Build with the lookup used to find conflicting accounts.
    pub fn new(lookup: Arc<dyn AccountLookup>) -> Self {
        Self { lookup }
    }

    async fn existing_holder(&self, index: AccountIndex, account: &Account) -> Option<Account> {
        for candidate in index.candidates(account) {
            match self.lookup.find_account(&candidate).await {
                Ok(Some(existing)) if existing.id != account.id => return Some(existing),
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, index = index.name(), "conflicting account lookup failed");
                }
            }
        }
        None
    }

    async fn translate(&self, violation: Violation<'_>, account: Option<&Account>) -> BridgeError {
        if violation.mentions(FK_ORGANIZATION) {
            let message = match account.and_then(|a| a.org_membership.as_deref()) {
                Some(org_id) => format!("Organization '{org_id}' not found."),
                None => "Organization not found.".to_owned(),
            };
            return BridgeError::not_found_with_message("Organization", message);
        }
        if violation.mentions(FK_ENROLLMENT_STUDY) {
            return BridgeError::not_found("Study");
        }
        let index = AccountIndex::ALL
            .into_iter()
            .find(|index| violation.mentions(index.name()));
        if let (Some(index), Some(account)) = (index, account) {
            if let Some(existing) = self.existing_holder(index, account).await {
                return BridgeError::already_exists(
                    "Account",
                    index.message(),
                    keys([("userId", existing.id)]),
                );
            }
        }
        BridgeError::constraint_violation(ACCOUNT_CONSTRAINT_MESSAGE)
    }
}

#[async_trait]
impl PersistenceExceptionConverter for AccountPersistenceExceptionConverter {
    async fn convert(
        &self,
        failure: PersistenceFailure,
        subject: Option<&dyn BridgeEntity>,
    ) -> Conversion {
        let Some(violation) = Violation::find(&failure) else {
            return convert_basic(failure, subject);
        };
        let account = subject.and_then(|s| s.downcast_ref::<Account>());
        Conversion::Converted(self.translate(violation, account).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockAccountLookup;
    use crate::domain::{Enrollment, Phone};
    use mockall::predicate::eq;
    use rstest::{fixture, rstest};

    const TEST_APP_ID: &str = "test-app";
    const TEST_USER_ID: &str = "existing-user";

    #[fixture]
    fn account() -> Account {
        Account {
            id: "subject-user".into(),
            app_id: TEST_APP_ID.into(),
            email: Some("email@example.com".into()),
            phone: Some(Phone::new("4082588569", "US")),
            synapse_user_id: Some("12345".into()),
            enrollments: vec![
                Enrollment::new(TEST_APP_ID, "something", "subject-user").with_external_id("ext"),
            ],
            ..Account::default()
        }
    }

    fn existing() -> Account {
        Account {
            id: TEST_USER_ID.into(),
            app_id: TEST_APP_ID.into(),
            ..Account::default()
        }
    }

    fn duplicate(index: &str, value: &str) -> PersistenceFailure {
        PersistenceFailure::query("could not execute statement").with_cause(
            PersistenceFailure::query(format!("Duplicate entry '{value}' for key '{index}'"))
                .with_cause(PersistenceFailure::unique_violation(format!(
                    "Duplicate entry '{value}' for key '{index}'"
                ))),
        )
    }

    fn converter_finding(
        expected: AccountId,
        found: Option<Account>,
    ) -> AccountPersistenceExceptionConverter {
        let mut lookup = MockAccountLookup::new();
        lookup
            .expect_find_account()
            .with(eq(expected))
            .times(1)
            .return_once(move |_| Ok(found));
        AccountPersistenceExceptionConverter::new(Arc::new(lookup))
    }

    #[rstest]
    #[tokio::test]
    async fn external_id_collision_names_the_existing_account(account: Account) {
        let converter = converter_finding(
            AccountId::for_external_id(TEST_APP_ID, "ext"),
            Some(existing()),
        );
        let failure = duplicate(EXTERNAL_ID_INDEX, "testStudy-ext");

        let converted = converter.convert(failure, Some(&account)).await.into_error();

        assert_eq!(
            converted.message(),
            "External ID has already been used by another account."
        );
        assert!(matches!(converted, BridgeError::EntityAlreadyExists { .. }));
        assert_eq!(
            converted.entity_keys().and_then(|k| k.get("userId")).map(String::as_str),
            Some(TEST_USER_ID)
        );
    }

    #[rstest]
    #[case(
        EMAIL_INDEX,
        AccountId::for_email(TEST_APP_ID, "email@example.com"),
        "Email address has already been used by another account."
    )]
    #[case(
        PHONE_INDEX,
        AccountId::for_phone(TEST_APP_ID, Phone::new("4082588569", "US")),
        "Phone number has already been used by another account."
    )]
    #[case(
        SYNAPSE_USER_ID_INDEX,
        AccountId::for_synapse_user_id(TEST_APP_ID, "12345"),
        "Synapse User ID has already been used by another account."
    )]
    #[tokio::test]
    async fn identifier_collisions_name_the_field(
        account: Account,
        #[case] index: &str,
        #[case] lookup: AccountId,
        #[case] message: &str,
    ) {
        let converter = converter_finding(lookup, Some(existing()));

        let converted = converter
            .convert(duplicate(index, "value"), Some(&account))
            .await
            .into_error();

        assert_eq!(converted.message(), message);
        assert_eq!(converted.status_code(), 409);
    }

    #[rstest]
    #[tokio::test]
    async fn external_ids_are_tried_in_enrollment_order(mut account: Account) {
        account.enroll(
            Enrollment::new(TEST_APP_ID, "other", "subject-user").with_external_id("ext2"),
        );
        let mut lookup = MockAccountLookup::new();
        let mut order = mockall::Sequence::new();
        lookup
            .expect_find_account()
            .with(eq(AccountId::for_external_id(TEST_APP_ID, "ext")))
            .times(1)
            .in_sequence(&mut order)
            .return_once(|_| Ok(None));
        lookup
            .expect_find_account()
            .with(eq(AccountId::for_external_id(TEST_APP_ID, "ext2")))
            .times(1)
            .in_sequence(&mut order)
            .return_once(|_| Ok(Some(existing())));
        let converter = AccountPersistenceExceptionConverter::new(Arc::new(lookup));

        let converted = converter
            .convert(duplicate(EXTERNAL_ID_INDEX, "other-ext2"), Some(&account))
            .await
            .into_error();

        assert_eq!(
            converted.entity_keys().and_then(|k| k.get("userId")).map(String::as_str),
            Some(TEST_USER_ID)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn the_subject_itself_is_not_a_conflict(account: Account) {
        let myself = account.clone();
        let converter = converter_finding(
            AccountId::for_external_id(TEST_APP_ID, "ext"),
            Some(myself),
        );

        let converted = converter
            .convert(duplicate(EXTERNAL_ID_INDEX, "x"), Some(&account))
            .await
            .into_error();

        assert_eq!(converted, BridgeError::constraint_violation(ACCOUNT_CONSTRAINT_MESSAGE));
    }

    #[rstest]
    #[tokio::test]
    async fn unattributed_violations_are_generic(account: Account) {
        let converter =
            AccountPersistenceExceptionConverter::new(Arc::new(MockAccountLookup::new()));
        let failure = PersistenceFailure::unique_violation(
            "duplicate key value violates unique constraint \"accounts_pkey\"",
        );

        let converted = converter.convert(failure, Some(&account)).await.into_error();

        assert_eq!(converted, BridgeError::constraint_violation(ACCOUNT_CONSTRAINT_MESSAGE));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_organizations_are_not_found(mut account: Account) {
        account.org_membership = Some("orgA".into());
        let converter =
            AccountPersistenceExceptionConverter::new(Arc::new(MockAccountLookup::new()));
        let failure = PersistenceFailure::foreign_key_violation(
            "insert or update on table \"accounts\" violates foreign key constraint \
             \"fk_accounts_organization\"",
        );

        let converted = converter.convert(failure, Some(&account)).await.into_error();

        assert_eq!(converted.message(), "Organization 'orgA' not found.");
        assert_eq!(converted.status_code(), 404);
    }

    #[rstest]
    #[tokio::test]
    async fn other_failures_pass_through_unchanged(account: Account) {
        let converter =
            AccountPersistenceExceptionConverter::new(Arc::new(MockAccountLookup::new()));
        let failure = PersistenceFailure::connection("connection refused");

        let converted = converter.convert(failure.clone(), Some(&account)).await;

        assert_eq!(converted, Conversion::Unconverted(failure));
    }
}
