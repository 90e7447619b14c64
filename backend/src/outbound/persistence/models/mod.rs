//! Diesel row structs and their [`Entity`](super::Entity) mappings.
//!
//! Each row derives Diesel's `Queryable`, `QueryableByName`, `Selectable`,
//! `Insertable` and `AsChangeset` against its table in
//! [`schema`](super::schema), and `stored_row!` generates its
//! [`StoredRow`](super::StoredRow) operations. Instants are stored as epoch
//! milliseconds and structured attributes as JSON text, both through the
//! attribute converters. Enum columns hold the enum's JSON text.

/// Implement `StoredRow` for a row struct.
///
/// `key` lists the primary-key columns in the order of the key tuple (a
/// single column keys by its bare value). Versioned rows guard updates on
/// the `version` column; `soft_delete` rows also carry a `deleted` flag.
///
/// ```ignore
/// stored_row! {
///     StudyRow => studies,
///     key: (String, String) = [app_id, identifier],
///     versioned: true,
///     soft_delete: true,
/// }
/// ```
macro_rules! stored_row {
    (@bind $key:ident; $column:ident) => {
        let $column = $key;
    };
    (@bind $key:ident; $($column:ident),+) => {
        let ($($column,)+) = $key;
    };
    (@update true, $table:ident, $target:ident, $row:ident, $expected:ident, $conn:ident) => {
        diesel::update($target.filter($table::version.eq($expected)))
            .set($row)
            .execute($conn)
            .await
    };
    (@update false, $table:ident, $target:ident, $row:ident, $expected:ident, $conn:ident) => {{
        let _ = $expected;
        diesel::update($target).set($row).execute($conn).await
    }};
    (@soft_delete true, $table:ident, $key:ident, $conn:ident, [$($column:ident),+]) => {{
        stored_row!(@bind $key; $($column),+);
        let live = $table::table
            $(.filter($table::$column.eq($column)))+
            .filter($table::deleted.eq(false));
        diesel::update(live)
            .set(($table::deleted.eq(true), $table::version.eq($table::version + 1)))
            .execute($conn)
            .await
    }};
    (@soft_delete false, $table:ident, $key:ident, $conn:ident, [$($column:ident),+]) => {{
        let _ = ($key, $conn);
        Err(diesel::result::Error::QueryBuilderError(
            format!("{} rows cannot be soft deleted", stringify!($table)).into(),
        ))
    }};
    (
        $row:ty => $table:ident,
        key: $key:ty = [$($column:ident),+ $(,)?],
        versioned: $versioned:tt,
        soft_delete: $soft_delete:tt $(,)?
    ) => {
        #[async_trait::async_trait]
        impl $crate::outbound::persistence::entity::StoredRow for $row {
            type Key = $key;
            const TABLE: &'static str = stringify!($table);
            const VERSIONED: bool = $versioned;

            async fn insert(
                &self,
                conn: &mut diesel_async::AsyncPgConnection,
            ) -> diesel::QueryResult<usize> {
                diesel::insert_into($table::table)
                    .values(self)
                    .execute(conn)
                    .await
            }

            async fn update(
                &self,
                conn: &mut diesel_async::AsyncPgConnection,
                expected_version: i64,
            ) -> diesel::QueryResult<usize> {
                let row = self;
                let target = $table::table$(.filter($table::$column.eq(&row.$column)))+;
                stored_row!(@update $versioned, $table, target, row, expected_version, conn)
            }

            async fn find(
                conn: &mut diesel_async::AsyncPgConnection,
                key: &Self::Key,
            ) -> diesel::QueryResult<Option<Self>> {
                stored_row!(@bind key; $($column),+);
                $table::table
                    $(.filter($table::$column.eq($column)))+
                    .select(<Self as diesel::SelectableHelper<diesel::pg::Pg>>::as_select())
                    .first(conn)
                    .await
                    .optional()
            }

            async fn delete(
                conn: &mut diesel_async::AsyncPgConnection,
                key: &Self::Key,
            ) -> diesel::QueryResult<usize> {
                stored_row!(@bind key; $($column),+);
                diesel::delete($table::table$(.filter($table::$column.eq($column)))+)
                    .execute(conn)
                    .await
            }

            async fn soft_delete(
                conn: &mut diesel_async::AsyncPgConnection,
                key: &Self::Key,
            ) -> diesel::QueryResult<usize> {
                stored_row!(@soft_delete $soft_delete, $table, key, conn, [$($column),+])
            }
        }
    };
}

mod account;
mod alert;
mod assessment;
mod demographic;
mod organization;
mod schedule;
mod study;
mod survey;
mod template;

pub(crate) use account::referenced_account_ids;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::PersistenceFailure;

use super::converters::{AttributeConverter, DateTimeToLongAttributeConverter};

/// Column form of a required instant.
pub(crate) fn millis(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

/// Column form of an optional instant.
pub(crate) fn opt_millis(instant: Option<&DateTime<Utc>>) -> Option<i64> {
    instant.map(millis)
}

/// Required instant from its stored milliseconds.
pub(crate) fn instant(column: i64) -> Result<DateTime<Utc>, PersistenceFailure> {
    DateTimeToLongAttributeConverter
        .to_attribute(Some(column))?
        .ok_or_else(|| PersistenceFailure::malformed("timestamp column was null"))
}

/// Optional instant from its stored milliseconds.
pub(crate) fn opt_instant(
    column: Option<i64>,
) -> Result<Option<DateTime<Utc>>, PersistenceFailure> {
    DateTimeToLongAttributeConverter.to_attribute(column)
}

/// Column text of an enum value.
pub(crate) fn column_text<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

/// Enum value from its column text.
pub(crate) fn from_column_text<T: DeserializeOwned>(
    column: String,
) -> Result<T, PersistenceFailure> {
    serde_json::from_value(serde_json::Value::String(column)).map_err(|err| {
        PersistenceFailure::malformed(format!(
            "unknown {} value: {err}",
            std::any::type_name::<T>()
        ))
    })
}

/// Optional enum value from its column text.
pub(crate) fn opt_from_column_text<T: DeserializeOwned>(
    column: Option<String>,
) -> Result<Option<T>, PersistenceFailure> {
    column.map(from_column_text).transpose()
}
