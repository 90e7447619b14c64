//! Translation of low-level persistence failures into domain errors.
//!
//! Drivers do not report constraint metadata consistently, so translation
//! is heuristic: each entity family owns an ordered table of
//! [`TranslationRule`]s matched against the violated constraint's message.
//! The first matching rule wins. Failures no rule claims fall through to
//! [`BasicPersistenceExceptionConverter`], which handles optimistic-lock
//! and not-found failures and returns everything else unchanged.

/// Declare a stateless converter driven by a rule table.
macro_rules! rule_table_converter {
    ($(#[$meta:meta])* $name:ident => $rules:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        #[async_trait::async_trait]
        impl $crate::outbound::persistence::exceptions::PersistenceExceptionConverter for $name {
            async fn convert(
                &self,
                failure: $crate::domain::PersistenceFailure,
                subject: Option<&dyn $crate::domain::BridgeEntity>,
            ) -> $crate::outbound::persistence::exceptions::Conversion {
                $crate::outbound::persistence::exceptions::convert_with_rules(
                    $rules, failure, subject,
                )
            }
        }
    };
}

mod account;
mod basic;
mod mysql;
mod organization;
mod sponsor;
mod study;
mod substudy;
mod template;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{
    BridgeEntity, BridgeError, ConstraintKind, EntityKeys, FailureKind, PersistenceFailure,
};

pub use self::account::{
    ACCOUNT_CONSTRAINT_MESSAGE, AccountPersistenceExceptionConverter, EMAIL_INDEX,
    EXTERNAL_ID_INDEX, PHONE_INDEX, SYNAPSE_USER_ID_INDEX,
};
pub use self::basic::{BasicPersistenceExceptionConverter, convert_basic};
pub use self::mysql::MySqlPersistenceExceptionConverter;
pub use self::organization::OrganizationPersistenceExceptionConverter;
pub use self::sponsor::SponsorPersistenceExceptionConverter;
pub use self::study::StudyPersistenceExceptionConverter;
pub use self::substudy::SubstudyPersistenceExceptionConverter;
pub use self::template::{
    TemplatePersistenceExceptionConverter, TemplateRevisionPersistenceExceptionConverter,
};

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The failure has a domain meaning.
    Converted(BridgeError),
    /// The failure is returned as it was received.
    Unconverted(PersistenceFailure),
}

impl Conversion {
    /// Domain error for this outcome, wrapping unconverted failures in a
    /// generic persistence error.
    pub fn into_error(self) -> BridgeError {
        match self {
            Self::Converted(error) => error,
            Self::Unconverted(failure) => BridgeError::persistence(failure),
        }
    }
}

/// Converts a failure raised while persisting `subject`.
#[async_trait]
pub trait PersistenceExceptionConverter: Send + Sync {
    /// Translate `failure`; unrecognised failures come back unconverted.
    async fn convert(
        &self,
        failure: PersistenceFailure,
        subject: Option<&dyn BridgeEntity>,
    ) -> Conversion;
}

/// The constraint violation found in a failure's cause chain.
#[derive(Debug, Clone, Copy)]
pub struct Violation<'a> {
    failure: &'a PersistenceFailure,
}

impl<'a> Violation<'a> {
    /// First constraint violation in the chain.
    pub fn find(failure: &'a PersistenceFailure) -> Option<Self> {
        failure
            .constraint_violation()
            .map(|failure| Self { failure })
    }

    /// Raw driver message.
    pub fn message(&self) -> &'a str {
        self.failure.message()
    }

    /// Constraint name, when the driver reported one.
    pub fn constraint(&self) -> Option<&'a str> {
        self.failure.constraint()
    }

    /// Whether the message or reported constraint names `name`.
    pub fn mentions(&self, name: &str) -> bool {
        self.constraint() == Some(name) || self.message().contains(name)
    }

    /// Unique-key collision, in MySQL or PostgreSQL wording.
    pub fn is_duplicate(&self) -> bool {
        self.failure.kind() == FailureKind::ConstraintViolation(ConstraintKind::Unique)
            || self.message().contains("Duplicate entry")
            || self.message().contains("duplicate key value")
    }

    /// Foreign-key failure, in MySQL or PostgreSQL wording.
    pub fn is_foreign_key(&self) -> bool {
        self.failure.kind() == FailureKind::ConstraintViolation(ConstraintKind::ForeignKey)
            || self.message().contains("foreign key constraint")
    }
}

/// One row of a translation table.
#[derive(Clone, Copy)]
pub struct TranslationRule {
    /// Whether this rule claims the violation.
    pub matches: fn(&Violation<'_>) -> bool,
    /// Domain error for a claimed violation.
    pub build: fn(&Violation<'_>, Option<&dyn BridgeEntity>) -> BridgeError,
}

/// Evaluate `rules` in order against the failure's constraint violation.
pub fn apply_rules(
    rules: &[TranslationRule],
    failure: &PersistenceFailure,
    subject: Option<&dyn BridgeEntity>,
) -> Option<BridgeError> {
    let violation = Violation::find(failure)?;
    rules
        .iter()
        .find(|rule| (rule.matches)(&violation))
        .map(|rule| (rule.build)(&violation, subject))
}

/// Apply `rules`, falling back to the basic conversion.
pub fn convert_with_rules(
    rules: &[TranslationRule],
    failure: PersistenceFailure,
    subject: Option<&dyn BridgeEntity>,
) -> Conversion {
    if let Some(error) = apply_rules(rules, &failure, subject) {
        return Conversion::Converted(error);
    }
    if let Some(violation) = Violation::find(&failure) {
        warn!(
            constraint = violation.constraint(),
            message = violation.message(),
            subject = subject.map(|s| s.type_name()),
            "unrecognised constraint violation"
        );
    }
    convert_basic(failure, subject)
}

/// `"<Type> already exists."` with the given keys.
pub(crate) fn already_exists(entity_type: &str, keys: EntityKeys) -> BridgeError {
    BridgeError::already_exists(entity_type, format!("{entity_type} already exists."), keys)
}

/// Build entity keys from pairs.
pub(crate) fn keys<const N: usize>(pairs: [(&str, String); N]) -> EntityKeys {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
