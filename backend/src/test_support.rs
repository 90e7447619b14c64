//! Test utilities for the backend crate.
//!
//! Shared by unit tests under `src/` and integration tests under `tests/`
//! (through the `test-support` feature).

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel_async::scoped_futures::ScopedBoxFuture;

use crate::domain::PersistenceFailure;
use crate::outbound::persistence::{CountRow, Entity, Session, SessionFactory, Statement, StoredRow};

/// An entity's row, as a query would return it.
///
/// # Panics
///
/// Panics when the entity cannot be converted, which is a broken fixture.
pub fn entity_row<E: Entity>(entity: &E) -> E::Row {
    entity.to_row().expect("fixture converts to a row")
}

/// Scripted outcome of the next session call.
pub enum Scripted {
    /// Rows returned by a load or find. Each must be the row type the call
    /// asks for.
    Rows(Vec<Box<dyn Any + Send>>),
    /// Affected-row count returned by a write.
    Affected(u64),
    /// Failure raised by any call.
    Fail(PersistenceFailure),
}

impl fmt::Debug for Scripted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            Self::Affected(count) => f.debug_tuple("Affected").field(count).finish(),
            Self::Fail(failure) => f.debug_tuple("Fail").field(failure).finish(),
        }
    }
}

/// Session call recorded by [`ScriptedSessionFactory`].
///
/// Keys are recorded in their `Debug` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A unit of work acquired its session.
    Open,
    /// The transaction began.
    Begin,
    /// The transaction committed.
    Commit,
    /// The transaction rolled back.
    Rollback,
    /// A row was inserted into the table.
    Insert(&'static str),
    /// A row of the table was updated against the expected version.
    Update(&'static str, i64),
    /// A row was looked up by key.
    Find(&'static str, String),
    /// A row was deleted by key.
    Delete(&'static str, String),
    /// A row was flagged deleted by key.
    SoftDelete(&'static str, String),
    /// A query statement was loaded.
    Query(Statement),
    /// A data-modifying statement was executed.
    Execute(Statement),
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Scripted>,
    events: Vec<SessionEvent>,
    fail_open: Option<PersistenceFailure>,
    fail_commit: Option<PersistenceFailure>,
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// In-memory [`SessionFactory`] replaying queued responses and logging
/// every call.
///
/// Every session call takes the next queued response. Loads and finds with
/// nothing queued return no rows; writes with nothing queued report one
/// affected row.
///
/// # Examples
/// ```
/// use bridge_backend::test_support::{Scripted, ScriptedSessionFactory};
///
/// let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));
/// assert!(sessions.events().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ScriptedSessionFactory {
    script: Arc<Mutex<Script>>,
}

impl fmt::Debug for ScriptedSessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedSessionFactory")
            .field("events", &lock(&self.script).events)
            .finish_non_exhaustive()
    }
}

impl ScriptedSessionFactory {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        lock(&self.script)
    }

    /// Queue a response.
    #[must_use]
    pub fn with_response(self, response: Scripted) -> Self {
        self.push(response);
        self
    }

    /// Queue rows for the next load or find.
    #[must_use]
    pub fn with_rows<R: Send + 'static>(self, rows: impl IntoIterator<Item = R>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn Any + Send>)
            .collect();
        self.with_response(Scripted::Rows(rows))
    }

    /// Queue a single `count` row.
    #[must_use]
    pub fn with_count(self, count: i64) -> Self {
        self.with_rows([CountRow { count }])
    }

    /// Fail the next unit of work before it starts.
    #[must_use]
    pub fn failing_open(self, failure: PersistenceFailure) -> Self {
        self.script().fail_open = Some(failure);
        self
    }

    /// Fail the next commit.
    #[must_use]
    pub fn failing_commit(self, failure: PersistenceFailure) -> Self {
        self.script().fail_commit = Some(failure);
        self
    }

    /// Queue a response on a shared factory.
    pub fn push(&self, response: Scripted) {
        self.script().responses.push_back(response);
    }

    /// Calls recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.script().events.clone()
    }

    /// Statements passed to `load` and `execute`, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Query(stmt) | SessionEvent::Execute(stmt) => Some(stmt),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    type Session = ScriptedSession;

    async fn unit_of_work<T, F>(&self, work: F) -> Result<T, PersistenceFailure>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(
                &'s mut Self::Session,
            ) -> ScopedBoxFuture<'static, 's, Result<T, PersistenceFailure>>
            + Send
            + 'static,
    {
        {
            let mut script = self.script();
            if let Some(failure) = script.fail_open.take() {
                return Err(failure);
            }
            script.events.push(SessionEvent::Open);
            script.events.push(SessionEvent::Begin);
        }

        let mut session = ScriptedSession {
            script: Arc::clone(&self.script),
        };
        let outcome = work(&mut session).await;

        let mut script = self.script();
        match outcome {
            Ok(value) => {
                script.events.push(SessionEvent::Commit);
                match script.fail_commit.take() {
                    Some(failure) => {
                        script.events.push(SessionEvent::Rollback);
                        Err(failure)
                    }
                    None => Ok(value),
                }
            }
            Err(failure) => {
                script.events.push(SessionEvent::Rollback);
                Err(failure)
            }
        }
    }
}

/// Session handed to units of work by [`ScriptedSessionFactory`].
pub struct ScriptedSession {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSession {
    fn record(&self, event: SessionEvent) -> Option<Scripted> {
        let mut script = lock(&self.script);
        script.events.push(event);
        script.responses.pop_front()
    }

    fn write(&self, event: SessionEvent) -> Result<u64, PersistenceFailure> {
        match self.record(event) {
            Some(Scripted::Affected(count)) => Ok(count),
            Some(Scripted::Fail(failure)) => Err(failure),
            Some(Scripted::Rows(_)) | None => Ok(1),
        }
    }

    fn rows<R: 'static>(&self, event: SessionEvent) -> Result<Vec<R>, PersistenceFailure> {
        match self.record(event) {
            Some(Scripted::Rows(rows)) => rows
                .into_iter()
                .map(|row| {
                    row.downcast::<R>().map(|row| *row).map_err(|_| {
                        PersistenceFailure::malformed(format!(
                            "scripted row is not a {}",
                            std::any::type_name::<R>()
                        ))
                    })
                })
                .collect(),
            Some(Scripted::Fail(failure)) => Err(failure),
            Some(Scripted::Affected(_)) | None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn insert<R: StoredRow>(&mut self, _row: &R) -> Result<u64, PersistenceFailure> {
        self.write(SessionEvent::Insert(R::TABLE))
    }

    async fn update<R: StoredRow>(
        &mut self,
        _row: &R,
        expected_version: i64,
    ) -> Result<u64, PersistenceFailure> {
        self.write(SessionEvent::Update(R::TABLE, expected_version))
    }

    async fn find<R: StoredRow>(&mut self, key: &R::Key) -> Result<Option<R>, PersistenceFailure> {
        let rows = self.rows::<R>(SessionEvent::Find(R::TABLE, format!("{key:?}")))?;
        Ok(rows.into_iter().next())
    }

    async fn delete<R: StoredRow>(&mut self, key: &R::Key) -> Result<u64, PersistenceFailure> {
        self.write(SessionEvent::Delete(R::TABLE, format!("{key:?}")))
    }

    async fn soft_delete<R: StoredRow>(
        &mut self,
        key: &R::Key,
    ) -> Result<u64, PersistenceFailure> {
        self.write(SessionEvent::SoftDelete(R::TABLE, format!("{key:?}")))
    }

    async fn load<R>(&mut self, statement: &Statement) -> Result<Vec<R>, PersistenceFailure>
    where
        R: QueryableByName<Pg> + Send + 'static,
    {
        self.rows::<R>(SessionEvent::Query(statement.clone()))
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64, PersistenceFailure> {
        self.write(SessionEvent::Execute(statement.clone()))
    }
}
