//! Organization constraint translation.

use crate::domain::{BridgeEntity, BridgeError, EntityKeys, Organization};

use super::{TranslationRule, already_exists, keys};

const FK_ACCOUNTS: &str = "fk_accounts_organization";
const FK_ASSESSMENTS: &str = "fk_assessments_organization";
const FK_SCHEDULES: &str = "fk_schedules_organization";

fn organization_keys(subject: Option<&dyn BridgeEntity>) -> EntityKeys {
    subject
        .and_then(|s| s.downcast_ref::<Organization>())
        .map(|org| keys([("identifier", org.identifier.clone())]))
        .unwrap_or_default()
}

fn referenced_by(what: &str, subject: Option<&dyn BridgeEntity>) -> BridgeError {
    BridgeError::ConstraintViolation {
        message: format!("Organization cannot be deleted, it is referenced by {what}."),
        entity_keys: organization_keys(subject),
    }
}

const RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| already_exists("Organization", organization_keys(subject)),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_ACCOUNTS),
        build: |_, subject| referenced_by("an account", subject),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_ASSESSMENTS),
        build: |_, subject| referenced_by("an assessment", subject),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_SCHEDULES),
        build: |_, subject| referenced_by("a schedule", subject),
    },
];

rule_table_converter! {
    /// Converter for organization writes.
    OrganizationPersistenceExceptionConverter => RULES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PersistenceFailure;
    use crate::outbound::persistence::exceptions::{
        Conversion, PersistenceExceptionConverter, Violation,
    };
    use rstest::rstest;

    fn organization() -> Organization {
        Organization {
            app_id: "api".into(),
            identifier: "orgA".into(),
            ..Organization::default()
        }
    }

    #[rstest]
    #[case(FK_ACCOUNTS, "Organization cannot be deleted, it is referenced by an account.")]
    #[case(FK_ASSESSMENTS, "Organization cannot be deleted, it is referenced by an assessment.")]
    #[tokio::test]
    async fn references_block_deletion(#[case] constraint: &str, #[case] message: &str) {
        let failure = PersistenceFailure::query("could not execute statement").with_cause(
            PersistenceFailure::foreign_key_violation(format!(
                "update or delete on table \"organizations\" violates foreign key \
                 constraint \"{constraint}\""
            )),
        );
        let org = organization();

        let converted = OrganizationPersistenceExceptionConverter
            .convert(failure, Some(&org))
            .await
            .into_error();

        assert_eq!(converted.message(), message);
        assert_eq!(
            converted.entity_keys().and_then(|k| k.get("identifier")).map(String::as_str),
            Some("orgA")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn duplicates_already_exist() {
        let failure = PersistenceFailure::unique_violation(
            "duplicate key value violates unique constraint \"organizations_pkey\"",
        );
        let org = organization();

        let converted = OrganizationPersistenceExceptionConverter
            .convert(failure, Some(&org))
            .await;

        assert!(matches!(
            converted,
            Conversion::Converted(BridgeError::EntityAlreadyExists { ref message, .. })
                if message == "Organization already exists."
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn unmatched_violations_pass_through() {
        let failure = PersistenceFailure::new(
            crate::domain::FailureKind::ConstraintViolation(crate::domain::ConstraintKind::Other),
            "null value in column \"name\" violates not-null constraint",
        );

        let converted = OrganizationPersistenceExceptionConverter
            .convert(failure.clone(), None)
            .await;

        assert_eq!(converted, Conversion::Unconverted(failure));
    }

    #[rstest]
    fn violations_are_matched_against_the_constraint_name() {
        let failure = PersistenceFailure::foreign_key_violation("violates foreign key constraint")
            .with_constraint(FK_SCHEDULES);
        let violation = Violation::find(&failure).expect("violation present");
        assert!(violation.mentions(FK_SCHEDULES));
        assert!(!violation.mentions(FK_ACCOUNTS));
    }
}
