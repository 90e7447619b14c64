//! PostgreSQL-backed `EnrollmentDao` implementation.
//!
//! Enrollment details replace account ids with [`AccountRef`]s, so each
//! read loads the enrollments first and then every account they mention.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::ports::EnrollmentDao;
use crate::domain::{
    Account, AccountRef, BridgeError, Enrollment, EnrollmentDetail, EnrollmentFilter,
    RequestContext,
};

use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::models::{column_text, referenced_account_ids};
use super::pg_session::PgSessionFactory;
use super::query_builder::{DataGroupOperator, QueryBuilder};
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

/// Data group marking test accounts.
pub const TEST_USER_GROUP: &str = "test_user";

const ACCOUNTS_BY_ID: &str = "SELECT * FROM accounts WHERE id = ANY(:accountIds)";

fn study_enrollments_query(
    app_id: &str,
    study_id: &str,
    filter: EnrollmentFilter,
    include_testers: bool,
) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_params(
        "SELECT en.* FROM enrollments en JOIN accounts acct ON acct.id = en.account_id \
         WHERE en.app_id = :appId AND en.study_id = :studyId",
        [("appId", app_id), ("studyId", study_id)],
    );
    match filter {
        EnrollmentFilter::Enrolled => {
            builder.append("AND en.withdrawn_on IS NULL");
        }
        EnrollmentFilter::Withdrawn => {
            builder.append("AND en.withdrawn_on IS NOT NULL");
        }
        EnrollmentFilter::All => {}
    }
    if !include_testers {
        builder.data_groups(
            &BTreeSet::from([TEST_USER_GROUP.to_owned()]),
            DataGroupOperator::NotIn,
        );
    }
    builder.append("ORDER BY en.enrolled_on, en.account_id");
    builder
}

/// Diesel-backed implementation of the `EnrollmentDao` port.
#[derive(Clone)]
pub struct DieselEnrollmentDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselEnrollmentDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(sessions, Arc::new(BasicPersistenceExceptionConverter)),
        }
    }

    async fn accounts_for(
        &self,
        enrollments: &[Enrollment],
    ) -> Result<BTreeMap<String, Account>, BridgeError> {
        let ids = referenced_account_ids(enrollments);
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let params = Params::from([(
            "accountIds".to_owned(),
            SqlValue::from(ids.into_iter().collect::<Vec<_>>()),
        )]);
        let accounts = self
            .helper
            .query_get::<Account>(ACCOUNTS_BY_ID, params, None, None)
            .await?;
        Ok(accounts
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect())
    }

    async fn details(
        &self,
        enrollments: Vec<Enrollment>,
    ) -> Result<Vec<EnrollmentDetail>, BridgeError> {
        let accounts = self.accounts_for(&enrollments).await?;
        Ok(enrollments
            .into_iter()
            .map(|enrollment| detail(enrollment, &accounts))
            .collect())
    }
}

fn detail(enrollment: Enrollment, accounts: &BTreeMap<String, Account>) -> EnrollmentDetail {
    let reference = |id: &Option<String>| {
        id.as_ref()
            .and_then(|id| accounts.get(id))
            .map(|account| AccountRef::from_account(account, None))
    };
    let mut participant = accounts
        .get(&enrollment.account_id)
        .map(|account| AccountRef::from_account(account, None))
        .unwrap_or_else(|| AccountRef {
            identifier: enrollment.account_id.clone(),
            ..AccountRef::default()
        });
    participant.external_id = enrollment.external_id.clone();
    let enrolled_by = reference(&enrollment.enrolled_by);
    let withdrawn_by = reference(&enrollment.withdrawn_by);
    EnrollmentDetail::new(enrollment, participant, enrolled_by, withdrawn_by)
}

#[async_trait]
impl<S: SessionFactory> EnrollmentDao for DieselEnrollmentDao<S> {
    async fn get_enrollments_for_study(
        &self,
        app_id: &str,
        study_id: &str,
        filter: EnrollmentFilter,
        include_testers: bool,
        page: PageRequest,
    ) -> Result<PagedResourceList<EnrollmentDetail>, BridgeError> {
        let builder = study_enrollments_query(app_id, study_id, filter, include_testers);
        let enrollments = self
            .helper
            .query_page::<Enrollment>(&builder.query(), builder.parameters().clone(), page)
            .await?;
        let total = enrollments.total();
        let details = self.details(enrollments.into_items()).await?;
        Ok(PagedResourceList::new(details, total)
            .with_page(page)
            .with_request_param("enrollmentFilter", column_text(&filter))
            .with_request_param("includeTesters", include_testers))
    }

    async fn get_enrollments_for_user(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        user_id: &str,
    ) -> Result<Vec<EnrollmentDetail>, BridgeError> {
        let scope = ctx.study_scope();
        let mut builder = QueryBuilder::new();
        builder.append_params(
            "SELECT * FROM enrollments WHERE app_id = :appId AND account_id = :userId",
            [("appId", app_id), ("userId", user_id)],
        );
        if let Some(study_ids) = scope.study_ids() {
            builder.append_param(
                "AND study_id = ANY(:callerStudyIds)",
                "callerStudyIds",
                study_ids,
            );
        }
        builder.append("ORDER BY enrolled_on, study_id");
        let enrollments = self
            .helper
            .query_get::<Enrollment>(&builder.query(), builder.parameters().clone(), None, None)
            .await?;
        let visible = enrollments
            .into_iter()
            .filter(|enrollment| scope.allows(&enrollment.study_id))
            .collect();
        self.details(visible).await
    }
}

#[cfg(test)]
mod tests {
    //! Query composition and detail assembly tests.

    use super::*;
    use crate::domain::Role;
    use crate::test_support::{ScriptedSessionFactory, entity_row};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn participant() -> Account {
        Account {
            id: "user-1".into(),
            app_id: "api".into(),
            first_name: Some("Pat".into()),
            ..Account::default()
        }
    }

    #[fixture]
    fn coordinator() -> Account {
        Account {
            id: "coord".into(),
            app_id: "api".into(),
            email: Some("coord@example.org".into()),
            ..Account::default()
        }
    }

    fn dao(sessions: &ScriptedSessionFactory) -> DieselEnrollmentDao<ScriptedSessionFactory> {
        DieselEnrollmentDao::new(Arc::new(sessions.clone()))
    }

    #[rstest]
    #[case(EnrollmentFilter::Enrolled, Some("en.withdrawn_on IS NULL"))]
    #[case(EnrollmentFilter::Withdrawn, Some("en.withdrawn_on IS NOT NULL"))]
    #[case(EnrollmentFilter::All, None)]
    fn enrollment_filters_restrict_withdrawal(
        #[case] filter: EnrollmentFilter,
        #[case] clause: Option<&str>,
    ) {
        let query = study_enrollments_query("api", "study-a", filter, true).query();
        match clause {
            Some(clause) => assert!(query.contains(clause)),
            None => assert!(!query.contains("withdrawn_on")),
        }
    }

    #[rstest]
    fn testers_are_excluded_by_data_group() {
        let builder = study_enrollments_query("api", "study-a", EnrollmentFilter::All, false);
        assert!(builder.query().contains(":notin1 NOT IN"));
        assert_eq!(builder.parameters()["notin1"], SqlValue::from(TEST_USER_GROUP));
    }

    #[rstest]
    #[tokio::test]
    async fn details_resolve_every_actor(participant: Account, coordinator: Account) {
        let mut enrollment = Enrollment::new("api", "study-a", "user-1").with_external_id("ext");
        enrollment.enrolled_by = Some("coord".into());
        enrollment.withdrawn_on = Some(Utc::now());
        enrollment.withdrawn_by = Some("coord".into());
        let sessions = ScriptedSessionFactory::new()
            .with_count(1)
            .with_rows([entity_row(&enrollment)])
            .with_rows([entity_row(&participant), entity_row(&coordinator)]);

        let page = dao(&sessions)
            .get_enrollments_for_study(
                "api",
                "study-a",
                EnrollmentFilter::Withdrawn,
                true,
                PageRequest::default(),
            )
            .await
            .expect("page loads");

        let detail = &page.items()[0];
        assert_eq!(detail.participant.first_name.as_deref(), Some("Pat"));
        assert_eq!(detail.participant.external_id.as_deref(), Some("ext"));
        assert_eq!(
            detail.withdrawn_by.as_ref().and_then(|r| r.email.as_deref()),
            Some("coord@example.org")
        );
        assert_eq!(page.request_params()["enrollmentFilter"], "withdrawn");
    }

    #[rstest]
    #[tokio::test]
    async fn user_enrollments_are_limited_to_the_callers_studies(participant: Account) {
        let sessions = ScriptedSessionFactory::new()
            .with_rows([
                entity_row(&Enrollment::new("api", "study-a", "user-1")),
                entity_row(&Enrollment::new("api", "study-b", "user-1")),
            ])
            .with_rows([entity_row(&participant)]);
        let ctx = RequestContext::for_caller("api", "caller")
            .with_roles([Role::StudyCoordinator])
            .with_org_sponsored_studies(["study-b"]);

        let details = dao(&sessions)
            .get_enrollments_for_user(&ctx, "api", "user-1")
            .await
            .expect("query succeeds");

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].study_id, "study-b");
        assert!(
            sessions.statements()[0]
                .sql()
                .contains("study_id = ANY(:callerStudyIds)")
        );
    }
}
