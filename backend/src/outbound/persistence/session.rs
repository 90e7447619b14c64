//! The ORM session seam.
//!
//! A [`Session`] is the connection a unit of work runs on. Entity rows go
//! through their typed [`StoredRow`] operations; query-string paths run a
//! [`Statement`] and load [`QueryableByName`] rows. A [`SessionFactory`]
//! opens the transaction every unit of work runs inside.

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel::sql_types::BigInt;
use diesel_async::scoped_futures::ScopedBoxFuture;

use crate::domain::PersistenceFailure;

use super::entity::StoredRow;
use super::statement::Statement;

/// A connection inside an open transaction.
#[async_trait]
pub trait Session: Send {
    /// Insert one row.
    async fn insert<R: StoredRow>(&mut self, row: &R) -> Result<u64, PersistenceFailure>;

    /// Overwrite a row, matching versioned rows on `expected_version` too.
    /// Returns the number of rows changed.
    async fn update<R: StoredRow>(
        &mut self,
        row: &R,
        expected_version: i64,
    ) -> Result<u64, PersistenceFailure>;

    /// Load a row by key.
    async fn find<R: StoredRow>(&mut self, key: &R::Key) -> Result<Option<R>, PersistenceFailure>;

    /// Delete a row by key.
    async fn delete<R: StoredRow>(&mut self, key: &R::Key) -> Result<u64, PersistenceFailure>;

    /// Flag a live row as deleted, bumping its version.
    async fn soft_delete<R: StoredRow>(&mut self, key: &R::Key)
    -> Result<u64, PersistenceFailure>;

    /// Run a query and load every row.
    async fn load<R>(&mut self, statement: &Statement) -> Result<Vec<R>, PersistenceFailure>
    where
        R: QueryableByName<Pg> + Send + 'static;

    /// Run a data-modifying statement and return the affected row count.
    async fn execute(&mut self, statement: &Statement) -> Result<u64, PersistenceFailure>;
}

/// Runs units of work.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Session handed to each unit of work.
    type Session: Session;

    /// Run `work` in one transaction, committing when it succeeds and
    /// rolling back when it fails.
    async fn unit_of_work<T, F>(&self, work: F) -> Result<T, PersistenceFailure>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(
                &'s mut Self::Session,
            ) -> ScopedBoxFuture<'static, 's, Result<T, PersistenceFailure>>
            + Send
            + 'static;
}

/// Single `count` column of a count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

impl CountRow {
    /// Count of the first row, zero when there is none.
    ///
    /// # Errors
    ///
    /// A negative count is malformed.
    pub fn total(rows: &[Self]) -> Result<u64, PersistenceFailure> {
        let count = rows.first().map_or(0, |row| row.count);
        u64::try_from(count).map_err(|_| {
            PersistenceFailure::malformed(format!("count query returned {count}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], 0)]
    #[case(&[CountRow { count: 12 }], 12)]
    fn counts_are_read_from_the_first_row(#[case] rows: &[CountRow], #[case] expected: u64) {
        assert_eq!(CountRow::total(rows), Ok(expected));
    }

    #[rstest]
    fn negative_counts_are_malformed() {
        let err = CountRow::total(&[CountRow { count: -1 }]).expect_err("negative");
        assert_eq!(err.kind(), crate::domain::FailureKind::MalformedData);
    }
}
