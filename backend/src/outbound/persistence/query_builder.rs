//! Incremental query text and named-parameter accumulator.
//!
//! Fragments are joined with single spaces and never validated; callers
//! are responsible for producing well-formed SQL.

use std::collections::BTreeSet;

use super::statement::{Params, SqlValue, Statement};

/// Membership test used by [`QueryBuilder::data_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataGroupOperator {
    /// Every group must be present.
    In,
    /// No group may be present.
    NotIn,
}

impl DataGroupOperator {
    fn sql(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    fn param_prefix(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "notin",
        }
    }
}

/// Accumulates query fragments and their parameters.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use bridge_backend::outbound::persistence::{DataGroupOperator, QueryBuilder};
///
/// let mut builder = QueryBuilder::new();
/// builder.append("SELECT * FROM accounts acct WHERE");
/// builder.append_param("acct.app_id = :appId", "appId", "api");
/// builder.data_groups(&BTreeSet::from(["a".to_owned()]), DataGroupOperator::NotIn);
/// assert_eq!(
///     builder.query(),
///     "SELECT * FROM accounts acct WHERE acct.app_id = :appId AND (:notin1 NOT IN \
///      (SELECT jsonb_array_elements_text(acct.data_groups::jsonb)))"
/// );
/// assert_eq!(builder.parameters().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    fragments: Vec<String>,
    params: Params,
    in_counter: usize,
    not_in_counter: usize,
}

impl QueryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment.
    pub fn append(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Append a fragment with one parameter.
    pub fn append_param(
        &mut self,
        fragment: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<SqlValue>,
    ) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self.append(fragment)
    }

    /// Append a fragment with several parameters.
    pub fn append_params<I, N, V>(&mut self, fragment: impl Into<String>, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<SqlValue>,
    {
        self.params
            .extend(params.into_iter().map(|(n, v)| (n.into(), v.into())));
        self.append(fragment)
    }

    /// Require (`In`) or forbid (`NotIn`) every group in `groups` on the
    /// `acct.data_groups` JSON array.
    ///
    /// Parameter names are the operator's prefix plus a per-operator
    /// counter that continues across calls on this builder, so several
    /// clauses never collide. Empty sets add nothing.
    pub fn data_groups(
        &mut self,
        groups: &BTreeSet<String>,
        operator: DataGroupOperator,
    ) -> &mut Self {
        if groups.is_empty() {
            return self;
        }
        let mut clauses = Vec::with_capacity(groups.len());
        for group in groups {
            let counter = match operator {
                DataGroupOperator::In => &mut self.in_counter,
                DataGroupOperator::NotIn => &mut self.not_in_counter,
            };
            *counter += 1;
            let name = format!("{}{}", operator.param_prefix(), counter);
            clauses.push(format!(
                ":{name} {} (SELECT jsonb_array_elements_text(acct.data_groups::jsonb))",
                operator.sql()
            ));
            self.params.insert(name, SqlValue::from(group));
        }
        self.append(format!("AND ({})", clauses.join(" AND ")))
    }

    /// Assembled query text.
    pub fn query(&self) -> String {
        self.fragments.join(" ")
    }

    /// Named parameters.
    pub fn parameters(&self) -> &Params {
        &self.params
    }

    /// Build a statement from the accumulated text and parameters.
    pub fn to_statement(&self) -> Statement {
        Statement::with_params(self.query(), self.params.clone())
    }
}
