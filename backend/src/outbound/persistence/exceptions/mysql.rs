//! MySQL message parsing in front of another converter.
//!
//! MySQL drivers report lock conflicts and constraint failures only as
//! message text. This converter recognises lock conflicts itself and
//! reclassifies constraint texts into constraint violations carrying the
//! constraint name before delegating.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BridgeEntity, BridgeError, PersistenceFailure};

use super::{Conversion, PersistenceExceptionConverter};

const DEADLOCK: &str = "Deadlock found when trying to get lock";
const LOCK_WAIT_TIMEOUT: &str = "Lock wait timeout exceeded";

/// Wraps a converter with MySQL message handling.
#[derive(Clone)]
pub struct MySqlPersistenceExceptionConverter {
    inner: Arc<dyn PersistenceExceptionConverter>,
}

impl MySqlPersistenceExceptionConverter {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn PersistenceExceptionConverter>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PersistenceExceptionConverter for MySqlPersistenceExceptionConverter {
    async fn convert(
        &self,
        failure: PersistenceFailure,
        subject: Option<&dyn BridgeEntity>,
    ) -> Conversion {
        let lock_conflict = failure.chain().any(|f| {
            f.message().contains(DEADLOCK) || f.message().contains(LOCK_WAIT_TIMEOUT)
        });
        if lock_conflict {
            let entity_type = subject
                .map(|s| s.type_name().to_owned())
                .or_else(|| failure.entity_type().map(str::to_owned))
                .unwrap_or_else(|| "Entity".to_owned());
            return Conversion::Converted(BridgeError::concurrent_modification(entity_type));
        }
        match self.inner.convert(reclassify(failure.clone()), subject).await {
            Conversion::Unconverted(_) => Conversion::Unconverted(failure),
            converted => converted,
        }
    }
}

/// Promote a MySQL constraint text to a constraint violation.
fn reclassify(failure: PersistenceFailure) -> PersistenceFailure {
    if failure.constraint_violation().is_some() {
        return failure;
    }
    let parsed = failure.chain().find_map(|f| {
        let message = f.message();
        if let Some(key) = duplicate_key(message) {
            Some(PersistenceFailure::unique_violation(message).with_constraint(key))
        } else {
            foreign_key(message).map(|name| {
                PersistenceFailure::foreign_key_violation(message).with_constraint(name)
            })
        }
    });
    match parsed {
        Some(violation) => violation.with_cause(failure),
        None => failure,
    }
}

/// Key name from `Duplicate entry 'v' for key 'k'`. MySQL 8 prefixes the
/// key with its table (`'t.k'`).
fn duplicate_key(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("Duplicate entry ")?;
    let (_, key) = rest.rsplit_once(" for key '")?;
    let key = key.split('\'').next()?;
    Some(key.rsplit_once('.').map_or(key, |(_, name)| name))
}

/// Constraint name from `... CONSTRAINT `name` FOREIGN KEY ...`.
fn foreign_key(message: &str) -> Option<&str> {
    if !message.contains("foreign key constraint fails") {
        return None;
    }
    let (_, rest) = message.split_once("CONSTRAINT `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintKind, FailureKind, Schedule2};
    use crate::outbound::persistence::BasicPersistenceExceptionConverter;
    use rstest::rstest;

    fn converter() -> MySqlPersistenceExceptionConverter {
        MySqlPersistenceExceptionConverter::new(Arc::new(BasicPersistenceExceptionConverter))
    }

    #[rstest]
    #[case(
        "Duplicate entry 'api-x' for key 'Accounts-StudyId-Email-Index'",
        Some("Accounts-StudyId-Email-Index")
    )]
    #[case(
        "Duplicate entry 'api-x' for key 'Accounts.Accounts-StudyId-Email-Index'",
        Some("Accounts-StudyId-Email-Index")
    )]
    #[case("Something else", None)]
    fn duplicate_keys_are_parsed(#[case] message: &str, #[case] expected: Option<&str>) {
        assert_eq!(duplicate_key(message), expected);
    }

    #[rstest]
    fn foreign_key_names_are_parsed() {
        let message = "Cannot delete or update a parent row: a foreign key constraint fails \
            (`bridge`.`Accounts`, CONSTRAINT `fk_accounts_organization` \
            FOREIGN KEY (`orgMembership`))";
        assert_eq!(foreign_key(message), Some("fk_accounts_organization"));
    }

    #[rstest]
    fn constraint_texts_become_violations() {
        let raw = PersistenceFailure::query("could not execute statement").with_cause(
            PersistenceFailure::query("Duplicate entry 'a-b' for key 'PRIMARY'"),
        );
        let reclassified = reclassify(raw.clone());
        assert_eq!(
            reclassified.kind(),
            FailureKind::ConstraintViolation(ConstraintKind::Unique)
        );
        assert_eq!(reclassified.constraint(), Some("PRIMARY"));
        assert_eq!(reclassified.cause(), Some(&raw));
    }

    #[rstest]
    #[tokio::test]
    async fn deadlocks_are_concurrent_modifications() {
        let failure = PersistenceFailure::query(
            "Deadlock found when trying to get lock; try restarting transaction",
        );
        let schedule = Schedule2::default();
        let converted = converter().convert(failure, Some(&schedule)).await;
        assert_eq!(
            converted,
            Conversion::Converted(BridgeError::concurrent_modification("Schedule"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn unrelated_failures_pass_through() {
        let failure = PersistenceFailure::connection("connection reset");
        let converted = converter().convert(failure.clone(), None).await;
        assert_eq!(converted, Conversion::Unconverted(failure));
    }
}
