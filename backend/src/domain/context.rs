//! Caller identity and study scope passed explicitly into DAO calls.
//!
//! A [`RequestContext`] describes who is calling and which studies they may
//! see. DAOs that filter by study take it as an argument; nothing reads
//! caller state from thread-locals or globals.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Administrative role held by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// App developer.
    Developer,
    /// Researcher with participant access.
    Researcher,
    /// Coordinates studies for an organization.
    StudyCoordinator,
    /// Designs studies for an organization.
    StudyDesigner,
    /// Administers an organization.
    OrgAdmin,
    /// App administrator.
    Admin,
    /// Cross-app administrator.
    Superadmin,
    /// Background worker.
    Worker,
}

impl Role {
    /// Whether the role sees every study in the app regardless of sponsorship.
    pub fn sees_all_studies(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin | Self::Worker)
    }
}

/// Set of studies visible to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyScope {
    /// Every study in the app.
    All,
    /// Only the listed study ids.
    Restricted(BTreeSet<String>),
}

impl StudyScope {
    /// Whether the study is visible in this scope.
    ///
    /// # Examples
    /// ```
    /// use std::collections::BTreeSet;
    /// use bridge_backend::domain::StudyScope;
    ///
    /// let scope = StudyScope::Restricted(BTreeSet::from(["study-a".to_owned()]));
    /// assert!(scope.allows("study-a"));
    /// assert!(!scope.allows("study-b"));
    /// assert!(StudyScope::All.allows("study-b"));
    /// ```
    pub fn allows(&self, study_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Restricted(ids) => ids.contains(study_id),
        }
    }

    /// Visible study ids, or `None` when unrestricted.
    pub fn study_ids(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::All => None,
            Self::Restricted(ids) => Some(ids),
        }
    }
}

/// Caller identity and visibility for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    caller_app_id: Option<String>,
    caller_user_id: Option<String>,
    caller_org_membership: Option<String>,
    caller_roles: BTreeSet<Role>,
    org_sponsored_studies: BTreeSet<String>,
}

impl RequestContext {
    /// Context for system work that sees everything.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Context for a caller in an app.
    pub fn for_caller(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            caller_app_id: Some(app_id.into()),
            caller_user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Set the caller's organization.
    #[must_use]
    pub fn with_org_membership(mut self, org_id: impl Into<String>) -> Self {
        self.caller_org_membership = Some(org_id.into());
        self
    }

    /// Set the caller's roles.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.caller_roles = roles.into_iter().collect();
        self
    }

    /// Set the studies sponsored by the caller's organization.
    #[must_use]
    pub fn with_org_sponsored_studies<I, S>(mut self, study_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.org_sponsored_studies = study_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Caller's app.
    pub fn caller_app_id(&self) -> Option<&str> {
        self.caller_app_id.as_deref()
    }

    /// Caller's account id.
    pub fn caller_user_id(&self) -> Option<&str> {
        self.caller_user_id.as_deref()
    }

    /// Caller's organization.
    pub fn caller_org_membership(&self) -> Option<&str> {
        self.caller_org_membership.as_deref()
    }

    /// Caller's roles.
    pub fn caller_roles(&self) -> &BTreeSet<Role> {
        &self.caller_roles
    }

    /// Studies the caller may see.
    ///
    /// Callers without sponsored studies, and administrators, see all
    /// studies.
    pub fn study_scope(&self) -> StudyScope {
        if self.org_sponsored_studies.is_empty()
            || self.caller_roles.iter().any(|role| role.sees_all_studies())
        {
            StudyScope::All
        } else {
            StudyScope::Restricted(self.org_sponsored_studies.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unrestricted_context_sees_all_studies() {
        assert_eq!(RequestContext::unrestricted().study_scope(), StudyScope::All);
    }

    #[rstest]
    fn sponsored_studies_narrow_the_scope() {
        let ctx = RequestContext::for_caller("api", "caller")
            .with_roles([Role::StudyCoordinator])
            .with_org_sponsored_studies(["study-a", "study-b"]);
        let scope = ctx.study_scope();
        assert!(scope.allows("study-a"));
        assert!(!scope.allows("study-c"));
    }

    #[rstest]
    #[case(Role::Admin)]
    #[case(Role::Superadmin)]
    #[case(Role::Worker)]
    fn administrators_are_never_restricted(#[case] role: Role) {
        let ctx = RequestContext::for_caller("api", "caller")
            .with_roles([role])
            .with_org_sponsored_studies(["study-a"]);
        assert_eq!(ctx.study_scope(), StudyScope::All);
    }
}
