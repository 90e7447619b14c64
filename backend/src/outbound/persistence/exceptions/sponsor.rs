//! Sponsor constraint translation.

use crate::domain::{BridgeEntity, BridgeError, EntityKeys, Sponsor};

use super::{TranslationRule, keys};

const FK_STUDY: &str = "fk_sponsors_study";
const FK_ORGANIZATION: &str = "fk_sponsors_organization";

fn sponsor(subject: Option<&dyn BridgeEntity>) -> Option<&Sponsor> {
    subject.and_then(|s| s.downcast_ref::<Sponsor>())
}

fn duplicate_sponsor(subject: Option<&dyn BridgeEntity>) -> BridgeError {
    match sponsor(subject) {
        Some(sponsor) => BridgeError::already_exists(
            "Sponsor",
            format!(
                "Organization '{}' already sponsors study '{}'.",
                sponsor.org_id, sponsor.study_id
            ),
            keys([
                ("orgId", sponsor.org_id.clone()),
                ("studyId", sponsor.study_id.clone()),
            ]),
        ),
        None => BridgeError::already_exists(
            "Sponsor",
            "Organization already sponsors study.",
            EntityKeys::new(),
        ),
    }
}

const RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| duplicate_sponsor(subject),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_STUDY),
        build: |_, _| BridgeError::not_found("Study"),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_ORGANIZATION),
        build: |_, _| BridgeError::not_found("Organization"),
    },
];

rule_table_converter! {
    /// Converter for sponsorship writes.
    SponsorPersistenceExceptionConverter => RULES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PersistenceFailure;
    use crate::outbound::persistence::exceptions::PersistenceExceptionConverter;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn duplicate_sponsorship_names_both_sides() {
        let subject = Sponsor::new("api", "study1", "orgA");
        let failure = PersistenceFailure::unique_violation(
            "duplicate key value violates unique constraint \"sponsors_pkey\"",
        );

        let converted = SponsorPersistenceExceptionConverter
            .convert(failure, Some(&subject))
            .await
            .into_error();

        assert_eq!(
            converted.message(),
            "Organization 'orgA' already sponsors study 'study1'."
        );
    }

    #[rstest]
    #[case(FK_STUDY, "Study not found.")]
    #[case(FK_ORGANIZATION, "Organization not found.")]
    #[tokio::test]
    async fn missing_parents_are_not_found(#[case] constraint: &str, #[case] message: &str) {
        let subject = Sponsor::new("api", "study1", "orgA");
        let failure = PersistenceFailure::foreign_key_violation(format!(
            "insert or update on table \"sponsors\" violates foreign key \
             constraint \"{constraint}\""
        ));

        let converted = SponsorPersistenceExceptionConverter
            .convert(failure, Some(&subject))
            .await
            .into_error();

        assert_eq!(converted.message(), message);
        assert_eq!(converted.status_code(), 404);
    }
}
