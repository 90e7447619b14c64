//! Study constraint translation.

use crate::domain::{BridgeEntity, BridgeError, EntityKeys, Study};

use super::{TranslationRule, already_exists, keys};

const FK_ENROLLMENTS: &str = "fk_enrollments_study";
const FK_SCHEDULE: &str = "fk_studies_schedule";

fn study_keys(subject: Option<&dyn BridgeEntity>) -> EntityKeys {
    subject
        .and_then(|s| s.downcast_ref::<Study>())
        .map(|study| keys([("identifier", study.identifier.clone())]))
        .unwrap_or_default()
}

const RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| already_exists("Study", study_keys(subject)),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_ENROLLMENTS),
        build: |_, subject| BridgeError::ConstraintViolation {
            message: "Study cannot be deleted, it is referenced by an enrollment.".to_owned(),
            entity_keys: study_keys(subject),
        },
    },
    TranslationRule {
        matches: |v| v.mentions(FK_SCHEDULE),
        build: |_, _| BridgeError::not_found("Schedule"),
    },
];

rule_table_converter! {
    /// Converter for study writes.
    StudyPersistenceExceptionConverter => RULES
}
