//! Mapping between domain entities and table rows.
//!
//! A [`StoredRow`] is a Diesel row struct that knows its table and key and
//! how to write itself. An [`Entity`] converts a domain record to and from
//! its row. The functions here run entity operations inside an open
//! [`Session`].

use std::fmt::Debug;

use async_trait::async_trait;
use diesel::QueryResult;
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel_async::AsyncPgConnection;

use crate::domain::{BridgeTypeName, PersistenceFailure};

use super::session::Session;
use super::statement::Statement;

/// A row struct bound to one table.
///
/// Implemented by `stored_row!` for every row in `models`.
#[async_trait]
pub trait StoredRow: QueryableByName<Pg> + Send + Sync + Sized + 'static {
    /// Primary key: one column's value, or a tuple in key-column order.
    type Key: Debug + Send + Sync + 'static;

    /// Table name.
    const TABLE: &'static str;

    /// Whether updates are guarded by the `version` column.
    const VERSIONED: bool;

    /// `INSERT` this row.
    async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize>;

    /// Overwrite the row with this key. Versioned rows only match when the
    /// stored version is `expected_version`.
    async fn update(&self, conn: &mut AsyncPgConnection, expected_version: i64)
    -> QueryResult<usize>;

    /// Load by key.
    async fn find(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<Option<Self>>;

    /// Delete by key.
    async fn delete(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<usize>;

    /// Flag a live row as deleted and bump its version. Tables without a
    /// `deleted` column refuse.
    async fn soft_delete(conn: &mut AsyncPgConnection, key: &Self::Key) -> QueryResult<usize>;
}

/// Key of an entity's row.
pub type Key<E> = <<E as Entity>::Row as StoredRow>::Key;

/// A domain type stored in one table.
pub trait Entity: BridgeTypeName + Sized + Send + Sync + 'static {
    /// Row struct for the table.
    type Row: StoredRow;

    /// Key of this instance.
    fn key(&self) -> Key<Self>;

    /// Convert to a row.
    ///
    /// # Errors
    ///
    /// Fails when an attribute cannot be converted to its column form.
    fn to_row(&self) -> Result<Self::Row, PersistenceFailure>;

    /// Convert from a row.
    ///
    /// # Errors
    ///
    /// Fails with a malformed-data failure when a column cannot be decoded.
    fn from_row(row: Self::Row) -> Result<Self, PersistenceFailure>;

    /// Current version; unversioned entities report zero.
    fn version(&self) -> i64 {
        0
    }

    /// Set the version.
    fn set_version(&mut self, _version: i64) {}
}

/// Whether `E` is guarded by optimistic locking.
pub fn is_versioned<E: Entity>() -> bool {
    <E::Row as StoredRow>::VERSIONED
}

/// Failure for an update that matched no row.
pub fn stale<E: Entity>() -> PersistenceFailure {
    if is_versioned::<E>() {
        PersistenceFailure::optimistic_lock(E::TYPE_NAME)
    } else {
        PersistenceFailure::not_found(E::TYPE_NAME)
    }
}

/// Run an entity query within an open session. The query must select the
/// table's columns.
///
/// # Errors
///
/// Propagates statement and decoding failures.
pub async fn query<E: Entity, S: Session>(
    session: &mut S,
    statement: &Statement,
) -> Result<Vec<E>, PersistenceFailure> {
    let rows: Vec<E::Row> = session
        .load(statement)
        .await
        .map_err(|failure| failure.with_entity_type(E::TYPE_NAME))?;
    rows.into_iter().map(E::from_row).collect()
}

/// Insert an entity within an open session.
///
/// # Errors
///
/// Propagates conversion and statement failures.
pub async fn insert<E: Entity, S: Session>(
    session: &mut S,
    entity: &E,
) -> Result<(), PersistenceFailure> {
    let row = entity.to_row()?;
    session.insert(&row).await?;
    Ok(())
}

/// Apply a versioned update within an open session.
///
/// The entity's version is incremented. When no row matches the key and
/// expected version the version is restored, and versioned entities fail
/// with an optimistic-lock failure and unversioned ones with not-found.
///
/// # Errors
///
/// Propagates conversion and statement failures.
pub async fn update<E: Entity, S: Session>(
    session: &mut S,
    entity: &mut E,
) -> Result<(), PersistenceFailure> {
    let expected = entity.version();
    if is_versioned::<E>() {
        entity.set_version(expected + 1);
    }
    let outcome = match entity.to_row() {
        Ok(row) => session.update(&row, expected).await,
        Err(failure) => Err(failure),
    };
    match outcome {
        Ok(0) => {
            entity.set_version(expected);
            Err(stale::<E>())
        }
        Ok(_) => Ok(()),
        Err(failure) => {
            entity.set_version(expected);
            Err(failure)
        }
    }
}

/// Load an entity by key within an open session.
///
/// # Errors
///
/// Propagates statement and decoding failures.
pub async fn load<E: Entity, S: Session>(
    session: &mut S,
    key: &Key<E>,
) -> Result<Option<E>, PersistenceFailure> {
    let row: Option<E::Row> = session.find(key).await?;
    row.map(E::from_row).transpose()
}

/// Delete an entity by key within an open session, returning the number of
/// rows removed.
///
/// # Errors
///
/// Propagates statement failures.
pub async fn delete<E: Entity, S: Session>(
    session: &mut S,
    key: &Key<E>,
) -> Result<u64, PersistenceFailure> {
    session.delete::<E::Row>(key).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use diesel_async::scoped_futures::ScopedFutureExt;
    use rstest::rstest;

    use super::*;
    use crate::domain::{Alert, FailureKind, Schedule2};
    use crate::outbound::persistence::session::SessionFactory;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent};

    fn schedule() -> Schedule2 {
        Schedule2 {
            guid: "sched-1".into(),
            version: 4,
            ..Schedule2::default()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn updates_are_guarded_by_the_prior_version() {
        let sessions = Arc::new(ScriptedSessionFactory::new());

        let updated = sessions
            .unit_of_work(|session| {
                async move {
                    let mut schedule = schedule();
                    update(session, &mut schedule).await?;
                    Ok(schedule)
                }
                .scope_boxed()
            })
            .await
            .expect("update applies");

        assert_eq!(updated.version, 5);
        assert!(sessions.events().contains(&SessionEvent::Update("schedules", 4)));
    }

    #[rstest]
    #[tokio::test]
    async fn stale_updates_restore_the_version() {
        let sessions = Arc::new(ScriptedSessionFactory::new().with_response(Scripted::Affected(0)));

        let outcome = sessions
            .unit_of_work(|session| {
                async move {
                    let mut schedule = schedule();
                    let failure = update(session, &mut schedule)
                        .await
                        .expect_err("stale version");
                    Ok((schedule.version, failure))
                }
                .scope_boxed()
            })
            .await
            .expect("work completes");

        assert_eq!(outcome.0, 4);
        assert_eq!(outcome.1, PersistenceFailure::optimistic_lock("Schedule"));
    }

    #[rstest]
    fn unversioned_entities_go_missing_rather_than_stale() {
        assert!(!is_versioned::<Alert>());
        assert_eq!(stale::<Alert>().kind(), FailureKind::NotFound);
        assert_eq!(stale::<Schedule2>().kind(), FailureKind::OptimisticLock);
    }

    #[rstest]
    #[tokio::test]
    async fn rows_load_back_into_entities() {
        let stored = schedule();
        let sessions = Arc::new(ScriptedSessionFactory::new().with_rows([stored
            .to_row()
            .expect("row builds")]));

        let loaded = sessions
            .unit_of_work(|session| {
                async move { load::<Schedule2, _>(session, &"sched-1".to_owned()).await }
                    .scope_boxed()
            })
            .await
            .expect("load succeeds");

        assert_eq!(loaded, Some(stored));
        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Find("schedules", "\"sched-1\"".into()))
        );
    }
}
