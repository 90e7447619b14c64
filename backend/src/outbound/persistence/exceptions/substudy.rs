//! Substudy constraint translation.

use crate::domain::{BridgeEntity, BridgeError, EntityKeys, Substudy};

use super::{TranslationRule, already_exists, keys};

const FK_ACCOUNT_SUBSTUDIES: &str = "fk_account_substudies_substudy";

fn substudy_keys(subject: Option<&dyn BridgeEntity>) -> EntityKeys {
    subject
        .and_then(|s| s.downcast_ref::<Substudy>())
        .map(|substudy| keys([("id", substudy.id.clone())]))
        .unwrap_or_default()
}

const RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| already_exists("Substudy", substudy_keys(subject)),
    },
    TranslationRule {
        matches: |v| v.is_foreign_key() && v.mentions(FK_ACCOUNT_SUBSTUDIES),
        build: |_, subject| BridgeError::ConstraintViolation {
            message: "Substudy cannot be deleted, it is referenced by an account.".to_owned(),
            entity_keys: substudy_keys(subject),
        },
    },
];

rule_table_converter! {
    /// Converter for substudy writes.
    SubstudyPersistenceExceptionConverter => RULES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PersistenceFailure;
    use crate::outbound::persistence::exceptions::PersistenceExceptionConverter;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn referenced_substudies_cannot_be_deleted() {
        let subject = Substudy {
            app_id: "api".into(),
            id: "sub1".into(),
            ..Substudy::default()
        };
        let failure = PersistenceFailure::foreign_key_violation(
            "update or delete on table \"substudies\" violates foreign key constraint \
             \"fk_account_substudies_substudy\"",
        );

        let converted = SubstudyPersistenceExceptionConverter
            .convert(failure, Some(&subject))
            .await
            .into_error();

        assert_eq!(
            converted.message(),
            "Substudy cannot be deleted, it is referenced by an account."
        );
        assert_eq!(
            converted.entity_keys().and_then(|k| k.get("id")).map(String::as_str),
            Some("sub1")
        );
    }
}
