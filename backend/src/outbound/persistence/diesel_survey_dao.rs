//! PostgreSQL-backed `SurveyDao` implementation.
//!
//! Every revision of a survey is its own row, keyed by guid and creation
//! instant.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{INCLUDE_DELETED, PageRequest, PagedResourceList};

use crate::domain::ports::SurveyDao;
use crate::domain::{BridgeError, Survey};

use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

const MOST_RECENT: &str = "SELECT * FROM surveys WHERE app_id = :appId AND guid = :guid \
     ORDER BY created_on DESC";

fn survey_key(guid: &str, created_on: DateTime<Utc>) -> (String, i64) {
    (guid.to_owned(), created_on.timestamp_millis())
}

fn revision_params(app_id: &str, guid: &str, created_on: DateTime<Utc>) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("guid".to_owned(), SqlValue::from(guid)),
        ("createdOn".to_owned(), SqlValue::BigInt(created_on.timestamp_millis())),
    ])
}

/// Most recently published revision of each survey in an app.
fn published_query(app_id: &str, include_deleted: bool) -> QueryBuilder {
    let deleted = if include_deleted {
        ""
    } else {
        " AND p.deleted = FALSE"
    };
    let mut builder = QueryBuilder::new();
    builder.append_param(
        "SELECT * FROM surveys s WHERE s.app_id = :appId AND s.published = TRUE",
        "appId",
        app_id,
    );
    if !include_deleted {
        builder.append("AND s.deleted = FALSE");
    }
    builder.append(format!(
        "AND s.created_on = (SELECT MAX(p.created_on) FROM surveys p \
         WHERE p.app_id = s.app_id AND p.guid = s.guid AND p.published = TRUE{deleted})"
    ));
    builder.append("ORDER BY s.name, s.guid");
    builder
}

/// Diesel-backed implementation of the `SurveyDao` port.
#[derive(Clone)]
pub struct DieselSurveyDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselSurveyDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(BasicPersistenceExceptionConverter),
            ),
        }
    }

    async fn change_revision(
        &self,
        sql: &str,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        let changed = self
            .helper
            .query_update::<Survey>(sql, revision_params(app_id, guid, created_on))
            .await?;
        if changed == 0 {
            return Err(BridgeError::not_found("Survey"));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SessionFactory> SurveyDao for DieselSurveyDao<S> {
    async fn get_survey(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Option<Survey>, BridgeError> {
        Ok(self
            .helper
            .get_by_id::<Survey>(survey_key(guid, created_on))
            .await?
            .filter(|survey| survey.app_id == app_id))
    }

    async fn get_survey_most_recent_version(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<Survey>, BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("guid".to_owned(), SqlValue::from(guid)),
        ]);
        let surveys = self
            .helper
            .query_get::<Survey>(MOST_RECENT, params, None, Some(1))
            .await?;
        Ok(surveys.into_iter().next())
    }

    async fn get_published_surveys(
        &self,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Survey>, BridgeError> {
        let builder = published_query(app_id, include_deleted);
        Ok(self
            .helper
            .query_page::<Survey>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn create_survey(&self, survey: Survey) -> Result<Survey, BridgeError> {
        self.helper.create(survey).await
    }

    async fn update_survey(&self, survey: Survey) -> Result<Survey, BridgeError> {
        self.helper.update(survey).await
    }

    async fn delete_survey(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        self.change_revision(
            "UPDATE surveys SET deleted = TRUE, version = version + 1 \
             WHERE app_id = :appId AND guid = :guid AND created_on = :createdOn \
             AND deleted = FALSE",
            app_id,
            guid,
            created_on,
        )
        .await
    }

    async fn delete_survey_permanently(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        self.change_revision(
            "DELETE FROM surveys \
             WHERE app_id = :appId AND guid = :guid AND created_on = :createdOn",
            app_id,
            guid,
            created_on,
        )
        .await
    }
}
