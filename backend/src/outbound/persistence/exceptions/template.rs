//! Template and template revision constraint translation.

use chrono::SecondsFormat;

use crate::domain::{BridgeEntity, BridgeError, EntityKeys, Template, TemplateRevision};

use super::{TranslationRule, already_exists, keys};

const FK_REVISIONS_TEMPLATE: &str = "fk_template_revisions_template";

fn template_keys(subject: Option<&dyn BridgeEntity>) -> EntityKeys {
    subject
        .and_then(|s| s.downcast_ref::<Template>())
        .map(|template| keys([("guid", template.guid.clone())]))
        .unwrap_or_default()
}

fn revision_keys(subject: Option<&dyn BridgeEntity>) -> EntityKeys {
    subject
        .and_then(|s| s.downcast_ref::<TemplateRevision>())
        .map(|revision| {
            keys([
                ("templateGuid", revision.template_guid.clone()),
                (
                    "createdOn",
                    revision.created_on.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            ])
        })
        .unwrap_or_default()
}

const TEMPLATE_RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| already_exists("Template", template_keys(subject)),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_REVISIONS_TEMPLATE),
        build: |_, subject| BridgeError::ConstraintViolation {
            message: "Template cannot be deleted while it has revisions.".to_owned(),
            entity_keys: template_keys(subject),
        },
    },
];

const REVISION_RULES: &[TranslationRule] = &[
    TranslationRule {
        matches: |v| v.is_duplicate(),
        build: |_, subject| already_exists("TemplateRevision", revision_keys(subject)),
    },
    TranslationRule {
        matches: |v| v.mentions(FK_REVISIONS_TEMPLATE),
        build: |_, _| BridgeError::not_found("Template"),
    },
];

rule_table_converter! {
    /// Converter for template writes.
    TemplatePersistenceExceptionConverter => TEMPLATE_RULES
}

rule_table_converter! {
    /// Converter for template revision writes.
    TemplateRevisionPersistenceExceptionConverter => REVISION_RULES
}
