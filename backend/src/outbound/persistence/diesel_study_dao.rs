//! PostgreSQL-backed `StudyDao` implementation.

use std::sync::Arc;

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;
use pagination::{INCLUDE_DELETED, PageRequest, PagedResourceList};

use crate::domain::ports::StudyDao;
use crate::domain::{
    Account, AccountRef, BridgeError, PersistenceFailure, RequestContext, Study, StudyDetail,
    StudyScope,
};

use super::entity;
use super::exceptions::StudyPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;

fn study_key(app_id: &str, study_id: &str) -> (String, String) {
    (app_id.to_owned(), study_id.to_owned())
}

/// Stand-in handed to the converter when only the key is known.
fn keyed_study(app_id: &str, study_id: &str) -> Study {
    Study {
        app_id: app_id.to_owned(),
        identifier: study_id.to_owned(),
        ..Study::default()
    }
}

fn studies_query(app_id: &str, scope: &StudyScope, include_deleted: bool) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_param("SELECT * FROM studies WHERE app_id = :appId", "appId", app_id);
    if let Some(study_ids) = scope.study_ids() {
        builder.append_param("AND identifier = ANY(:studyIds)", "studyIds", study_ids);
    }
    if !include_deleted {
        builder.append("AND deleted = FALSE");
    }
    builder.append("ORDER BY name, identifier");
    builder
}

/// Diesel-backed implementation of the `StudyDao` port.
#[derive(Clone)]
pub struct DieselStudyDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselStudyDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(StudyPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> StudyDao for DieselStudyDao<S> {
    async fn get_studies(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Study>, BridgeError> {
        let builder = studies_query(app_id, &ctx.study_scope(), include_deleted);
        Ok(self
            .helper
            .query_page::<Study>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn get_study(&self, app_id: &str, study_id: &str) -> Result<Option<Study>, BridgeError> {
        self.helper
            .get_by_id::<Study>(study_key(app_id, study_id))
            .await
    }

    async fn get_study_detail(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<Option<StudyDetail>, BridgeError> {
        let key = study_key(app_id, study_id);
        self.helper
            .execute_with_session(None, move |session| {
                async move {
                    let Some(study) = entity::load::<Study, _>(session, &key).await? else {
                        return Ok(None);
                    };
                    let created_by = match study.created_by.clone() {
                        Some(creator) => entity::load::<Account, _>(session, &creator)
                            .await?
                            .map(|account| AccountRef::from_account(&account, None)),
                        None => None,
                    };
                    Ok::<_, PersistenceFailure>(Some(StudyDetail::new(study, created_by)))
                }
                .scope_boxed()
            })
            .await
    }

    async fn create_study(&self, study: Study) -> Result<Study, BridgeError> {
        self.helper.create(study).await
    }

    async fn update_study(&self, study: Study) -> Result<Study, BridgeError> {
        self.helper.update(study).await
    }

    async fn delete_study(&self, app_id: &str, study_id: &str) -> Result<(), BridgeError> {
        self.helper
            .soft_delete::<Study>(study_key(app_id, study_id))
            .await
    }

    async fn delete_study_permanently(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<(), BridgeError> {
        self.helper.delete(&keyed_study(app_id, study_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
    use rstest::{fixture, rstest};

    #[fixture]
    fn study() -> Study {
        Study {
            app_id: "api".into(),
            identifier: "study-a".into(),
            name: "Sleep".into(),
            created_by: Some("user-1".into()),
            ..Study::default()
        }
    }

    fn dao(sessions: &ScriptedSessionFactory) -> DieselStudyDao<ScriptedSessionFactory> {
        DieselStudyDao::new(Arc::new(sessions.clone()))
    }

    #[rstest]
    fn restricted_callers_only_see_sponsored_studies() {
        let ctx = RequestContext::for_caller("api", "caller")
            .with_roles([Role::Researcher])
            .with_org_sponsored_studies(["study-a"]);
        let builder = studies_query("api", &ctx.study_scope(), false);
        assert_eq!(
            builder.query(),
            "SELECT * FROM studies WHERE app_id = :appId AND identifier = ANY(:studyIds) \
             AND deleted = FALSE ORDER BY name, identifier"
        );
    }

    #[rstest]
    fn unrestricted_callers_see_every_study() {
        let builder = studies_query("api", &StudyScope::All, true);
        assert!(!builder.query().contains("studyIds"));
    }

    #[rstest]
    #[tokio::test]
    async fn details_resolve_the_creator(study: Study) {
        let creator = Account {
            id: "user-1".into(),
            app_id: "api".into(),
            email: Some("creator@example.org".into()),
            ..Account::default()
        };
        let sessions = ScriptedSessionFactory::new()
            .with_rows([entity_row(&study)])
            .with_rows([entity_row(&creator)]);

        let detail = dao(&sessions)
            .get_study_detail("api", "study-a")
            .await
            .expect("query succeeds")
            .expect("study exists");

        let created_by = detail.created_by.expect("creator resolved");
        assert_eq!(created_by.identifier, "user-1");
        assert_eq!(created_by.email.as_deref(), Some("creator@example.org"));
        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Find("accounts", "\"user-1\"".into()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn missing_studies_have_no_detail() {
        let sessions = ScriptedSessionFactory::new();

        let detail = dao(&sessions)
            .get_study_detail("api", "missing")
            .await
            .expect("query succeeds");

        assert!(detail.is_none());
        assert_eq!(
            sessions.events(),
            vec![
                SessionEvent::Open,
                SessionEvent::Begin,
                SessionEvent::Find("studies", r#"("api", "missing")"#.into()),
                SessionEvent::Commit,
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn enrolled_studies_cannot_be_removed() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
            PersistenceFailure::foreign_key_violation(
                "update or delete on table \"studies\" violates foreign key constraint \
                 \"fk_enrollments_study\" on table \"enrollments\"",
            ),
        ));

        let err = dao(&sessions)
            .delete_study_permanently("api", "study-a")
            .await
            .expect_err("referenced study");

        assert_eq!(err.status_code(), 409);
        assert_eq!(
            err.entity_keys()
                .and_then(|keys| keys.get("identifier"))
                .map(String::as_str),
            Some("study-a")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_studies_already_exist(study: Study) {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
            PersistenceFailure::unique_violation(
                "duplicate key value violates unique constraint \"studies_pkey\"",
            ),
        ));

        let err = dao(&sessions)
            .create_study(study)
            .await
            .expect_err("duplicate");

        assert_eq!(err.message(), "Study already exists.");
    }
}
