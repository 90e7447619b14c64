//! SQL text with named parameters.
//!
//! Queries are written with `:name` placeholders. Before execution a
//! [`Statement`] is rewritten to PostgreSQL's positional `$n` form; a name
//! used several times binds once, and `::type` casts and quoted text are
//! copied through untouched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::domain::PersistenceFailure;

/// A value bound to a named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// `TEXT`.
    Text(String),
    /// `BIGINT`. Instants bind as epoch milliseconds.
    BigInt(i64),
    /// `INTEGER`.
    Integer(i32),
    /// `BOOLEAN`.
    Bool(bool),
    /// `TEXT[]`.
    TextArray(Vec<String>),
    /// SQL `NULL`, typed as text.
    Null,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::BigInt(value.timestamp_millis())
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextArray(value)
    }
}

impl From<&BTreeSet<String>> for SqlValue {
    fn from(value: &BTreeSet<String>) -> Self {
        Self::TextArray(value.iter().cloned().collect())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Named parameter values.
pub type Params = BTreeMap<String, SqlValue>;

/// SQL text plus its named parameters.
///
/// # Examples
/// ```
/// use bridge_backend::outbound::persistence::{SqlValue, Statement};
///
/// let stmt = Statement::new("SELECT * FROM t WHERE a = :a OR b = :a AND c = :c::int")
///     .bind("a", "x")
///     .bind("c", 3_i32);
/// let (sql, values) = stmt.to_positional().expect("all parameters bound");
/// assert_eq!(sql, "SELECT * FROM t WHERE a = $1 OR b = $1 AND c = $2::int");
/// assert_eq!(values, vec![SqlValue::from("x"), SqlValue::Integer(3)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Params,
}

impl Statement {
    /// Statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    /// Statement with a prepared parameter map.
    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind one named parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// SQL text with named placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Rewrite `:name` placeholders to `$n` and collect their values in
    /// bind order.
    ///
    /// # Errors
    ///
    /// Fails with a query failure when a placeholder has no bound value.
    pub fn to_positional(&self) -> Result<(String, Vec<SqlValue>), PersistenceFailure> {
        let mut sql = String::with_capacity(self.sql.len());
        let mut order: Vec<&str> = Vec::new();
        let mut chars = self.sql.char_indices().peekable();
        let mut quote: Option<char> = None;

        while let Some((index, ch)) = chars.next() {
            if let Some(open) = quote {
                sql.push(ch);
                if ch == open {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    sql.push(ch);
                }
                ':' if chars.peek().is_some_and(|(_, next)| *next == ':') => {
                    sql.push_str("::");
                    chars.next();
                    while let Some((_, next)) = chars.next_if(|(_, c)| is_ident_char(*c)) {
                        sql.push(next);
                    }
                }
                ':' if chars
                    .peek()
                    .is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_') =>
                {
                    let start = index + 1;
                    let mut end = start;
                    while let Some((pos, next)) = chars.next_if(|(_, c)| is_ident_char(*c)) {
                        end = pos + next.len_utf8();
                    }
                    let name = &self.sql[start..end];
                    let position = match order.iter().position(|seen| *seen == name) {
                        Some(position) => position,
                        None => {
                            order.push(name);
                            order.len() - 1
                        }
                    };
                    sql.push('$');
                    sql.push_str(&(position + 1).to_string());
                }
                _ => sql.push(ch),
            }
        }

        let values = order
            .into_iter()
            .map(|name| {
                self.params.get(name).cloned().ok_or_else(|| {
                    PersistenceFailure::query(format!("no value bound for parameter :{name}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sql, values))
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn quoted_text_is_not_rewritten() {
        let stmt = Statement::new("SELECT ':nope', \"a:b\" FROM t WHERE x = :x").bind("x", 1_i64);
        let (sql, values) = stmt.to_positional().expect("bound");
        assert_eq!(sql, "SELECT ':nope', \"a:b\" FROM t WHERE x = $1");
        assert_eq!(values, vec![SqlValue::BigInt(1)]);
    }

    #[rstest]
    fn casts_after_placeholders_are_preserved() {
        let stmt = Statement::new(
            "SELECT * FROM accounts WHERE COALESCE(roles, '[]')::jsonb ? :role::text",
        )
        .bind("role", "developer");
        let (sql, _) = stmt.to_positional().expect("bound");
        assert_eq!(
            sql,
            "SELECT * FROM accounts WHERE COALESCE(roles, '[]')::jsonb ? $1::text"
        );
    }

    #[rstest]
    fn missing_parameters_are_reported() {
        let err = Statement::new("SELECT * FROM t WHERE id = :id")
            .to_positional()
            .expect_err("unbound parameter");
        assert_eq!(err.message(), "no value bound for parameter :id");
    }

    #[rstest]
    fn unused_parameters_are_ignored() {
        let (sql, values) = Statement::new("SELECT 1")
            .bind("unused", true)
            .to_positional()
            .expect("no placeholders");
        assert_eq!(sql, "SELECT 1");
        assert!(values.is_empty());
    }

    #[rstest]
    fn optional_values_bind_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(5_i64)), SqlValue::BigInt(5));
    }
}
