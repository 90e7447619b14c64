//! PostgreSQL sessions on pooled `diesel-async` connections.
//!
//! Every unit of work checks out a connection and runs inside
//! `AsyncConnection::transaction`, so Diesel's transaction manager tracks
//! the open transaction and the pool discards connections left in one.

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_query;
use diesel::sql_types::{Array, BigInt, Bool, Integer, Nullable, Text};
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::PersistenceFailure;

use super::entity::StoredRow;
use super::pool::DbPool;
use super::session::{Session, SessionFactory};
use super::statement::{SqlValue, Statement};

/// Runs units of work on connections from a [`DbPool`].
#[derive(Clone)]
pub struct PgSessionFactory {
    pool: DbPool,
}

impl PgSessionFactory {
    /// Wrap a pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    type Session = AsyncPgConnection;

    async fn unit_of_work<T, F>(&self, work: F) -> Result<T, PersistenceFailure>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(
                &'s mut AsyncPgConnection,
            ) -> ScopedBoxFuture<'static, 's, Result<T, PersistenceFailure>>
            + Send
            + 'static,
    {
        let mut pooled = self.pool.get_owned().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        conn.transaction(work).await
    }
}

#[async_trait]
impl Session for AsyncPgConnection {
    async fn insert<R: StoredRow>(&mut self, row: &R) -> Result<u64, PersistenceFailure> {
        let inserted = row.insert(self).await?;
        Ok(inserted as u64)
    }

    async fn update<R: StoredRow>(
        &mut self,
        row: &R,
        expected_version: i64,
    ) -> Result<u64, PersistenceFailure> {
        let updated = row.update(self, expected_version).await?;
        Ok(updated as u64)
    }

    async fn find<R: StoredRow>(&mut self, key: &R::Key) -> Result<Option<R>, PersistenceFailure> {
        Ok(R::find(self, key).await?)
    }

    async fn delete<R: StoredRow>(&mut self, key: &R::Key) -> Result<u64, PersistenceFailure> {
        let deleted = R::delete(self, key).await?;
        Ok(deleted as u64)
    }

    async fn soft_delete<R: StoredRow>(
        &mut self,
        key: &R::Key,
    ) -> Result<u64, PersistenceFailure> {
        let flagged = R::soft_delete(self, key).await?;
        Ok(flagged as u64)
    }

    async fn load<R>(&mut self, statement: &Statement) -> Result<Vec<R>, PersistenceFailure>
    where
        R: QueryableByName<Pg> + Send + 'static,
    {
        let (sql, values) = statement.to_positional()?;
        let rows: Vec<R> = bind_values(sql_query(sql).into_boxed::<Pg>(), values)
            .load(self)
            .await?;
        Ok(rows)
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64, PersistenceFailure> {
        let (sql, values) = statement.to_positional()?;
        let affected = bind_values(sql_query(sql).into_boxed::<Pg>(), values)
            .execute(self)
            .await?;
        Ok(affected as u64)
    }
}

impl From<diesel::result::Error> for PersistenceFailure {
    fn from(error: diesel::result::Error) -> Self {
        map_diesel_error(error)
    }
}

fn bind_values(
    mut query: BoxedSqlQuery<'static, Pg, SqlQuery>,
    values: Vec<SqlValue>,
) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    for value in values {
        query = match value {
            SqlValue::Text(text) => query.bind::<Text, _>(text),
            SqlValue::BigInt(n) => query.bind::<BigInt, _>(n),
            SqlValue::Integer(n) => query.bind::<Integer, _>(n),
            SqlValue::Bool(flag) => query.bind::<Bool, _>(flag),
            SqlValue::TextArray(items) => query.bind::<Array<Text>, _>(items),
            SqlValue::Null => query.bind::<Nullable<Text>, _>(None::<String>),
        };
    }
    query
}

/// Translate a Diesel error into a persistence failure.
///
/// Constraint violations are nested under a statement failure, the way the
/// driver reports them, with the constraint name attached when PostgreSQL
/// supplies it.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> PersistenceFailure {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => PersistenceFailure::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            PersistenceFailure::connection(info.message().to_owned())
        }
        DieselError::DatabaseError(kind, info) => {
            let violation = match kind {
                DatabaseErrorKind::UniqueViolation => {
                    Some(PersistenceFailure::unique_violation(info.message()))
                }
                DatabaseErrorKind::ForeignKeyViolation => {
                    Some(PersistenceFailure::foreign_key_violation(info.message()))
                }
                DatabaseErrorKind::NotNullViolation | DatabaseErrorKind::CheckViolation => {
                    Some(PersistenceFailure::new(
                        crate::domain::FailureKind::ConstraintViolation(
                            crate::domain::ConstraintKind::Other,
                        ),
                        info.message(),
                    ))
                }
                _ => None,
            };
            match violation {
                Some(violation) => {
                    let violation = match info.constraint_name() {
                        Some(name) => violation.with_constraint(name),
                        None => violation,
                    };
                    PersistenceFailure::query("could not execute statement").with_cause(violation)
                }
                None => PersistenceFailure::query(info.message().to_owned()),
            }
        }
        other => PersistenceFailure::query(other.to_string()),
    }
}
