//! PostgreSQL-backed `DemographicDao` implementation.
//!
//! A demographic user row owns its demographic rows through a cascading
//! foreign key. Saving replaces the whole user, so stale categories never
//! survive a save.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use pagination::{PageRequest, PagedResourceList};
use tracing::debug;

use crate::domain::ports::DemographicDao;
use crate::domain::{BridgeError, Demographic, DemographicUser};

use super::entity;
use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::session::{Session, SessionFactory};
use super::statement::{Params, SqlValue, Statement};

const USER_SCOPE: &str =
    "app_id = :appId AND study_id IS NOT DISTINCT FROM :studyId AND user_id = :userId";
const USERS_FOR_SCOPE: &str = "SELECT * FROM demographics_users \
     WHERE app_id = :appId AND study_id IS NOT DISTINCT FROM :studyId ORDER BY user_id";
const DEMOGRAPHICS_FOR_USERS: &str = "SELECT * FROM demographics \
     WHERE demographic_user_id = ANY(:demographicUserIds) ORDER BY category_name";

#[derive(Debug, QueryableByName)]
struct IdRow {
    #[diesel(sql_type = Text)]
    id: String,
}

fn scope_params(app_id: &str, study_id: Option<String>, user_id: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("studyId".to_owned(), SqlValue::from(study_id)),
        ("userId".to_owned(), SqlValue::from(user_id)),
    ])
}

/// Diesel-backed implementation of the `DemographicDao` port.
#[derive(Clone)]
pub struct DieselDemographicDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselDemographicDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(sessions, Arc::new(BasicPersistenceExceptionConverter)),
        }
    }

    async fn attach_demographics(
        &self,
        users: Vec<DemographicUser>,
    ) -> Result<Vec<DemographicUser>, BridgeError> {
        if users.is_empty() {
            return Ok(users);
        }
        let ids: Vec<String> = users.iter().map(|user| user.id.clone()).collect();
        let params = Params::from([("demographicUserIds".to_owned(), SqlValue::from(ids))]);
        let demographics = self
            .helper
            .query_get::<Demographic>(DEMOGRAPHICS_FOR_USERS, params, None, None)
            .await?;
        let mut by_user: BTreeMap<String, Vec<Demographic>> = BTreeMap::new();
        for demographic in demographics {
            by_user
                .entry(demographic.demographic_user_id.clone())
                .or_default()
                .push(demographic);
        }
        Ok(users
            .into_iter()
            .map(|mut user| {
                for demographic in by_user.remove(&user.id).unwrap_or_default() {
                    user.put(demographic);
                }
                user
            })
            .collect())
    }
}

#[async_trait]
impl<S: SessionFactory> DemographicDao for DieselDemographicDao<S> {
    async fn save_demographic_user(
        &self,
        demographic_user: DemographicUser,
    ) -> Result<DemographicUser, BridgeError> {
        let subject = demographic_user.clone();
        let saved = self
            .helper
            .execute_with_session(Some(&subject), move |session| {
                async move {
                    let mut user = demographic_user;
                    let clear = Statement::with_params(
                        format!("DELETE FROM demographics_users WHERE {USER_SCOPE}"),
                        scope_params(&user.app_id, user.study_id.clone(), &user.user_id),
                    );
                    session.execute(&clear).await?;
                    entity::insert(session, &user).await?;
                    let owner = user.id.clone();
                    for demographic in user.demographics.values_mut() {
                        demographic.demographic_user_id = owner.clone();
                        entity::insert(session, &*demographic).await?;
                    }
                    Ok(user)
                }
                .scope_boxed()
            })
            .await?;
        debug!(
            demographic_user_id = %saved.id,
            categories = saved.demographics.len(),
            "demographic user saved"
        );
        Ok(saved)
    }

    async fn delete_demographic(&self, demographic_id: &str) -> Result<(), BridgeError> {
        self.helper
            .delete_by_id::<Demographic>(demographic_id.to_owned())
            .await
    }

    async fn delete_demographic_user(&self, demographic_user_id: &str) -> Result<(), BridgeError> {
        self.helper
            .delete_by_id::<DemographicUser>(demographic_user_id.to_owned())
            .await
    }

    async fn get_demographic_user_id(
        &self,
        app_id: &str,
        study_id: Option<String>,
        user_id: &str,
    ) -> Result<Option<String>, BridgeError> {
        let rows: Vec<IdRow> = self
            .helper
            .native_query_get(
                &format!("SELECT id FROM demographics_users WHERE {USER_SCOPE}"),
                scope_params(app_id, study_id, user_id),
                None,
                Some(1),
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.id))
    }

    async fn get_demographic(
        &self,
        demographic_id: &str,
    ) -> Result<Option<Demographic>, BridgeError> {
        self.helper
            .get_by_id::<Demographic>(demographic_id.to_owned())
            .await
    }

    async fn get_demographic_user(
        &self,
        app_id: &str,
        study_id: Option<String>,
        user_id: &str,
    ) -> Result<Option<DemographicUser>, BridgeError> {
        let users = self
            .helper
            .query_get::<DemographicUser>(
                &format!("SELECT * FROM demographics_users WHERE {USER_SCOPE}"),
                scope_params(app_id, study_id, user_id),
                None,
                Some(1),
            )
            .await?;
        Ok(self.attach_demographics(users).await?.into_iter().next())
    }

    async fn get_demographic_users(
        &self,
        app_id: &str,
        study_id: Option<String>,
        page: PageRequest,
    ) -> Result<PagedResourceList<DemographicUser>, BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("studyId".to_owned(), SqlValue::from(study_id)),
        ]);
        let users = self
            .helper
            .query_page::<DemographicUser>(USERS_FOR_SCOPE, params, page)
            .await?;
        let total = users.total();
        let users = self.attach_demographics(users.into_items()).await?;
        Ok(PagedResourceList::new(users, total).with_page(page))
    }
}

#[cfg(test)]
mod tests {
    //! Unit-of-work and assembly tests over a scripted session.

    use super::*;
    use crate::domain::DemographicValue;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
    use rstest::{fixture, rstest};

    #[fixture]
    fn user() -> DemographicUser {
        let mut user = DemographicUser {
            id: "du-1".into(),
            app_id: "api".into(),
            study_id: Some("study-a".into()),
            user_id: "user-1".into(),
            ..DemographicUser::default()
        };
        user.put(Demographic {
            id: "d-1".into(),
            category_name: "height".into(),
            values: vec![DemographicValue::new("180")],
            units: Some("cm".into()),
            ..Demographic::default()
        });
        user.put(Demographic {
            id: "d-2".into(),
            category_name: "ethnicity".into(),
            multiple_select: true,
            values: vec![DemographicValue::new("a"), DemographicValue::new("b")],
            ..Demographic::default()
        });
        user
    }

    fn dao(sessions: &ScriptedSessionFactory) -> DieselDemographicDao<ScriptedSessionFactory> {
        DieselDemographicDao::new(Arc::new(sessions.clone()))
    }

    #[rstest]
    #[tokio::test]
    async fn saving_replaces_the_user_in_one_unit_of_work(user: DemographicUser) {
        let sessions = ScriptedSessionFactory::new();

        dao(&sessions)
            .save_demographic_user(user)
            .await
            .expect("save succeeds");

        let statements = sessions.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].sql().starts_with("DELETE FROM demographics_users"));
        let events = sessions.events();
        assert_eq!(
            events[3..],
            [
                SessionEvent::Insert("demographics_users"),
                SessionEvent::Insert("demographics"),
                SessionEvent::Insert("demographics"),
                SessionEvent::Commit,
            ]
        );
        let opens = events
            .iter()
            .filter(|event| **event == SessionEvent::Open)
            .count();
        assert_eq!(opens, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn app_level_users_bind_a_null_study() {
        let sessions = ScriptedSessionFactory::new().with_rows([IdRow { id: "du-9".into() }]);

        let id = dao(&sessions)
            .get_demographic_user_id("api", None, "user-1")
            .await
            .expect("query succeeds");

        assert_eq!(id.as_deref(), Some("du-9"));
        let statement = &sessions.statements()[0];
        assert_eq!(statement.params()["studyId"], SqlValue::Null);
        assert!(statement.sql().ends_with("LIMIT 1"));
    }

    #[rstest]
    #[tokio::test]
    async fn loaded_users_carry_their_demographics(user: DemographicUser) {
        let sessions = ScriptedSessionFactory::new()
            .with_rows([entity_row(&user)])
            .with_rows(user.demographics.values().map(entity_row));

        let loaded = dao(&sessions)
            .get_demographic_user("api", Some("study-a".into()), "user-1")
            .await
            .expect("query succeeds")
            .expect("user exists");

        assert_eq!(loaded, user);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_missing_demographic_is_not_found() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

        let err = dao(&sessions)
            .delete_demographic("missing")
            .await
            .expect_err("nothing deleted");

        assert_eq!(err.status_code(), 404);
    }
}
