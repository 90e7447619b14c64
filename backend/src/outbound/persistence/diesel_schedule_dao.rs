//! PostgreSQL-backed `Schedule2Dao` implementation.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{INCLUDE_DELETED, PageRequest, PagedResourceList};

use crate::domain::ports::Schedule2Dao;
use crate::domain::{BridgeError, Schedule2};

use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

fn schedules_query(
    app_id: &str,
    owner_id: Option<&str>,
    include_deleted: bool,
) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_param("SELECT * FROM schedules WHERE app_id = :appId", "appId", app_id);
    if let Some(owner_id) = owner_id {
        builder.append_param("AND owner_id = :ownerId", "ownerId", owner_id);
    }
    if !include_deleted {
        builder.append("AND deleted = FALSE");
    }
    builder.append("ORDER BY name, guid");
    builder
}

fn schedule_params(app_id: &str, guid: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("guid".to_owned(), SqlValue::from(guid)),
    ])
}

/// Diesel-backed implementation of the `Schedule2Dao` port.
#[derive(Clone)]
pub struct DieselScheduleDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselScheduleDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(BasicPersistenceExceptionConverter),
            ),
        }
    }

    async fn page(
        &self,
        builder: QueryBuilder,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Schedule2>, BridgeError> {
        Ok(self
            .helper
            .query_page::<Schedule2>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn remove(&self, sql: &str, app_id: &str, guid: &str) -> Result<(), BridgeError> {
        let changed = self
            .helper
            .query_update::<Schedule2>(sql, schedule_params(app_id, guid))
            .await?;
        if changed == 0 {
            return Err(BridgeError::not_found("Schedule"));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SessionFactory> Schedule2Dao for DieselScheduleDao<S> {
    async fn get_schedules(
        &self,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Schedule2>, BridgeError> {
        self.page(schedules_query(app_id, None, include_deleted), page, include_deleted)
            .await
    }

    async fn get_schedules_for_organization(
        &self,
        app_id: &str,
        owner_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Schedule2>, BridgeError> {
        self.page(
            schedules_query(app_id, Some(owner_id), include_deleted),
            page,
            include_deleted,
        )
        .await
    }

    async fn get_schedule(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<Schedule2>, BridgeError> {
        Ok(self
            .helper
            .get_by_id::<Schedule2>(guid.to_owned())
            .await?
            .filter(|schedule| schedule.app_id == app_id))
    }

    async fn create_schedule(&self, schedule: Schedule2) -> Result<Schedule2, BridgeError> {
        self.helper.create(schedule).await
    }

    async fn update_schedule(&self, schedule: Schedule2) -> Result<Schedule2, BridgeError> {
        self.helper.update(schedule).await
    }

    async fn delete_schedule(&self, app_id: &str, guid: &str) -> Result<(), BridgeError> {
        self.remove(
            "UPDATE schedules SET deleted = TRUE, version = version + 1 \
             WHERE app_id = :appId AND guid = :guid AND deleted = FALSE",
            app_id,
            guid,
        )
        .await
    }

    async fn delete_schedule_permanently(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<(), BridgeError> {
        self.remove(
            "DELETE FROM schedules WHERE app_id = :appId AND guid = :guid",
            app_id,
            guid,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
    use rstest::rstest;

    fn dao(sessions: &ScriptedSessionFactory) -> DieselScheduleDao<ScriptedSessionFactory> {
        DieselScheduleDao::new(Arc::new(sessions.clone()))
    }

    #[rstest]
    #[case(
        None,
        false,
        "SELECT * FROM schedules WHERE app_id = :appId AND deleted = FALSE ORDER BY name, guid"
    )]
    #[case(None, true, "SELECT * FROM schedules WHERE app_id = :appId ORDER BY name, guid")]
    #[case(
        Some("org-1"),
        false,
        concat!(
            "SELECT * FROM schedules WHERE app_id = :appId AND owner_id = :ownerId ",
            "AND deleted = FALSE ORDER BY name, guid"
        )
    )]
    fn schedule_queries_follow_the_filters(
        #[case] owner_id: Option<&str>,
        #[case] include_deleted: bool,
        #[case] expected: &str,
    ) {
        assert_eq!(
            schedules_query("api", owner_id, include_deleted).query(),
            expected
        );
    }

    #[rstest]
    #[tokio::test]
    async fn pages_echo_include_deleted() {
        let schedule = Schedule2 {
            guid: "s1".into(),
            app_id: "api".into(),
            owner_id: "org-1".into(),
            name: "Weekly".into(),
            duration: "P4W".into(),
            ..Schedule2::default()
        };
        let sessions = ScriptedSessionFactory::new()
            .with_count(1)
            .with_rows([entity_row(&schedule)]);

        let page = dao(&sessions)
            .get_schedules_for_organization("api", "org-1", PageRequest::default(), true)
            .await
            .expect("page loads");

        assert_eq!(page.items(), &[schedule]);
        assert_eq!(page.request_params()[INCLUDE_DELETED], true);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

        let err = dao(&sessions)
            .delete_schedule("api", "s1")
            .await
            .expect_err("already deleted");

        assert_eq!(err.status_code(), 404);
        let statement = &sessions.statements()[0];
        assert!(statement.sql().starts_with("UPDATE schedules SET deleted = TRUE"));
        assert!(statement.sql().ends_with("AND deleted = FALSE"));
    }

    #[rstest]
    #[tokio::test]
    async fn schedules_of_other_apps_are_hidden() {
        let schedule = Schedule2 {
            guid: "s1".into(),
            app_id: "other".into(),
            ..Schedule2::default()
        };
        let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&schedule)]);

        let found = dao(&sessions)
            .get_schedule("api", "s1")
            .await
            .expect("lookup succeeds");

        assert_eq!(found, None);
        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Find("schedules", "\"s1\"".into()))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn permanent_deletes_are_scoped_to_the_app() {
        let sessions = ScriptedSessionFactory::new();

        dao(&sessions)
            .delete_schedule_permanently("api", "s1")
            .await
            .expect("row removed");

        let statement = &sessions.statements()[0];
        assert_eq!(
            statement.sql(),
            "DELETE FROM schedules WHERE app_id = :appId AND guid = :guid"
        );
        assert_eq!(statement.params()["guid"], SqlValue::from("s1"));
    }
}
