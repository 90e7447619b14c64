//! Generic persistence helper.
//!
//! Every call runs in its own unit of work: one pooled connection, one
//! transaction, committed when the work succeeds. Any failure rolls the
//! transaction back and is handed, with the entity being written, to the
//! injected exception converter. This is the only place low-level failures
//! become [`BridgeError`]s.

use std::sync::Arc;

use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel_async::scoped_futures::{ScopedBoxFuture, ScopedFutureExt};
use pagination::{PageRequest, PagedResourceList};
use tracing::debug;

use crate::domain::{BridgeEntity, BridgeError, PersistenceFailure};

use super::entity::{self, Entity, Key, is_versioned, stale};
use super::exceptions::{Conversion, PersistenceExceptionConverter};
use super::pg_session::PgSessionFactory;
use super::session::{CountRow, Session, SessionFactory};
use super::statement::{Params, Statement};

/// Façade over session-based CRUD and query execution.
pub struct PersistenceHelper<S = PgSessionFactory> {
    sessions: Arc<S>,
    converter: Arc<dyn PersistenceExceptionConverter>,
}

impl<S> Clone for PersistenceHelper<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<S: SessionFactory> PersistenceHelper<S> {
    /// Build a helper translating failures with `converter`.
    pub fn new(sessions: Arc<S>, converter: Arc<dyn PersistenceExceptionConverter>) -> Self {
        Self {
            sessions,
            converter,
        }
    }

    /// Insert an entity.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn create<E: Entity>(&self, value: E) -> Result<E, BridgeError> {
        let row = match value.to_row() {
            Ok(row) => row,
            Err(failure) => return Err(self.translate(failure, Some(&value)).await),
        };
        self.execute_with_session(Some(&value), move |session| {
            async move {
                session.insert(&row).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await?;
        Ok(value)
    }

    /// Update an entity, incrementing its version.
    ///
    /// # Errors
    ///
    /// A stale version surfaces as whatever the converter makes of an
    /// optimistic-lock failure, normally a concurrent-modification error.
    pub async fn update<E: Entity>(&self, value: E) -> Result<E, BridgeError> {
        let mut updated = value;
        let expected = updated.version();
        if is_versioned::<E>() {
            updated.set_version(expected + 1);
        }
        let row = match updated.to_row() {
            Ok(row) => row,
            Err(failure) => return Err(self.translate(failure, Some(&updated)).await),
        };
        self.execute_with_session(Some(&updated), move |session| {
            async move {
                if session.update(&row, expected).await? == 0 {
                    return Err(stale::<E>());
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await?;
        Ok(updated)
    }

    /// Load an entity by key.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn get_by_id<E: Entity>(&self, key: Key<E>) -> Result<Option<E>, BridgeError> {
        self.execute_with_session(None, move |session| {
            async move { entity::load::<E, _>(session, &key).await }.scope_boxed()
        })
        .await
    }

    /// Delete an entity by key.
    ///
    /// # Errors
    ///
    /// A missing row surfaces as the converter's not-found error.
    pub async fn delete_by_id<E: Entity>(&self, key: Key<E>) -> Result<(), BridgeError> {
        self.execute_with_session(None, move |session| {
            async move {
                if entity::delete::<E, _>(session, &key).await? == 0 {
                    return Err(PersistenceFailure::not_found(E::TYPE_NAME));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    /// Delete the row of an entity, handing it to the converter on
    /// failure so constraint errors can name it.
    ///
    /// # Errors
    ///
    /// A missing row surfaces as the converter's not-found error.
    pub async fn delete<E: Entity>(&self, value: &E) -> Result<(), BridgeError> {
        let key = value.key();
        self.execute_with_session(Some(value), move |session| {
            async move {
                if entity::delete::<E, _>(session, &key).await? == 0 {
                    return Err(PersistenceFailure::not_found(E::TYPE_NAME));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    /// Flag an entity as deleted.
    ///
    /// # Errors
    ///
    /// A missing or already deleted row surfaces as the converter's
    /// not-found error.
    pub async fn soft_delete<E: Entity>(&self, key: Key<E>) -> Result<(), BridgeError> {
        self.execute_with_session(None, move |session| {
            async move {
                if session.soft_delete::<E::Row>(&key).await? == 0 {
                    return Err(PersistenceFailure::not_found(E::TYPE_NAME));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    /// Count the matches of an entity query, then load the requested page.
    ///
    /// The envelope echoes the page's offset and size; callers add their
    /// own filter parameters.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn query_page<E: Entity>(
        &self,
        sql: &str,
        params: Params,
        page: PageRequest,
    ) -> Result<PagedResourceList<E>, BridgeError> {
        let total = self.query_count::<E>(sql, params.clone()).await?;
        let items = self
            .query_get::<E>(sql, params, Some(page.offset_by()), Some(page.page_size()))
            .await?;
        Ok(PagedResourceList::new(items, total).with_page(page))
    }

    /// Run an entity query, optionally paged.
    ///
    /// The query must select the entity's columns.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn query_get<E: Entity>(
        &self,
        sql: &str,
        params: Params,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<E>, BridgeError> {
        let statement = Statement::with_params(paged(sql, offset, limit), params);
        self.execute_with_session(None, move |session| {
            async move { entity::query::<E, _>(session, &statement).await }.scope_boxed()
        })
        .await
    }

    /// Count the rows an entity query would return.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn query_count<E: Entity>(
        &self,
        sql: &str,
        params: Params,
    ) -> Result<u64, BridgeError> {
        let statement = Statement::with_params(
            format!("SELECT COUNT(*) AS count FROM ({sql}) counted"),
            params,
        );
        self.execute_with_session(None, move |session| {
            async move {
                let rows: Vec<CountRow> = session
                    .load(&statement)
                    .await
                    .map_err(|failure| failure.with_entity_type(E::TYPE_NAME))?;
                CountRow::total(&rows)
            }
            .scope_boxed()
        })
        .await
    }

    /// Run a bulk update against an entity's table, returning the number
    /// of rows changed.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn query_update<E: Entity>(
        &self,
        sql: &str,
        params: Params,
    ) -> Result<u64, BridgeError> {
        let statement = Statement::with_params(sql, params);
        self.execute_with_session(None, move |session| {
            async move {
                session
                    .execute(&statement)
                    .await
                    .map_err(|failure| failure.with_entity_type(E::TYPE_NAME))
            }
            .scope_boxed()
        })
        .await
    }

    /// Run a native query and load each row as `T`.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn native_query_get<T>(
        &self,
        sql: &str,
        params: Params,
        offset: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<T>, BridgeError>
    where
        T: QueryableByName<Pg> + Send + 'static,
    {
        let statement = Statement::with_params(paged(sql, offset, limit), params);
        self.execute_with_session(None, move |session| {
            async move { session.load(&statement).await }.scope_boxed()
        })
        .await
    }

    /// Run a native query that selects a single `count` column.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn native_query_count(&self, sql: &str, params: Params) -> Result<u64, BridgeError> {
        let statement = Statement::with_params(sql, params);
        self.execute_with_session(None, move |session| {
            async move {
                let rows: Vec<CountRow> = session.load(&statement).await?;
                CountRow::total(&rows)
            }
            .scope_boxed()
        })
        .await
    }

    /// Run a native data-modifying statement.
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure.
    pub async fn native_query_update(&self, sql: &str, params: Params) -> Result<u64, BridgeError> {
        let statement = Statement::with_params(sql, params);
        self.execute_with_session(None, move |session| {
            async move { session.execute(&statement).await }.scope_boxed()
        })
        .await
    }

    /// Run several operations in one unit of work.
    ///
    /// `subject` is the entity handed to the exception converter when the
    /// work fails. The work owns everything it touches.
    ///
    /// # Examples
    /// ```ignore
    /// use diesel_async::scoped_futures::ScopedFutureExt;
    ///
    /// let (account_row, enrollment_row) = (account.to_row()?, enrollment.to_row()?);
    /// helper
    ///     .execute_with_session(Some(&account), move |session| {
    ///         async move {
    ///             session.insert(&account_row).await?;
    ///             session.insert(&enrollment_row).await
    ///         }
    ///         .scope_boxed()
    ///     })
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the converted error for any failure, after rolling back.
    pub async fn execute_with_session<T, F>(
        &self,
        subject: Option<&dyn BridgeEntity>,
        work: F,
    ) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(
                &'s mut S::Session,
            ) -> ScopedBoxFuture<'static, 's, Result<T, PersistenceFailure>>
            + Send
            + 'static,
    {
        match self.sessions.unit_of_work(work).await {
            Ok(value) => Ok(value),
            Err(failure) => Err(self.translate(failure, subject).await),
        }
    }

    async fn translate(
        &self,
        failure: PersistenceFailure,
        subject: Option<&dyn BridgeEntity>,
    ) -> BridgeError {
        match self.converter.convert(failure, subject).await {
            Conversion::Converted(error) => {
                debug!(error = %error, "persistence failure translated");
                error
            }
            Conversion::Unconverted(failure) => {
                debug!(
                    kind = ?failure.kind(),
                    message = failure.message(),
                    "persistence failure not recognised"
                );
                BridgeError::persistence(failure)
            }
        }
    }
}

fn paged(sql: &str, offset: Option<u64>, limit: Option<u64>) -> String {
    let mut sql = sql.to_owned();
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}

#[cfg(test)]
mod tests;
