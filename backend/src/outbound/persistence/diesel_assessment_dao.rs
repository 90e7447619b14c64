//! PostgreSQL-backed assessment, assessment resource and assessment
//! configuration DAOs.
//!
//! Assessments are revisioned by identifier; each revision owns one
//! configuration row that is created with it and removed by cascade.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;
use pagination::{INCLUDE_DELETED, PageRequest, PagedResourceList};
use tracing::debug;

use crate::domain::ports::{
    AssessmentConfigDao, AssessmentDao, AssessmentResourceDao, ResourceQuery,
};
use crate::domain::{
    Assessment, AssessmentConfig, AssessmentResource, BridgeError,
};

use super::entity::{self, Entity};
use super::exceptions::BasicPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::models::column_text;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

fn basic_helper<S: SessionFactory>(sessions: Arc<S>) -> PersistenceHelper<S> {
    PersistenceHelper::new(sessions, Arc::new(BasicPersistenceExceptionConverter))
}

fn app_params(app_id: &str, guid: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("guid".to_owned(), SqlValue::from(guid)),
    ])
}

/// Delete the row with `guid` in `table`, provided it belongs to the app.
async fn delete_in_app<E: Entity, S: SessionFactory>(
    helper: &PersistenceHelper<S>,
    table: &str,
    app_id: &str,
    guid: &str,
) -> Result<(), BridgeError> {
    let removed = helper
        .query_update::<E>(
            &format!("DELETE FROM {table} WHERE app_id = :appId AND guid = :guid"),
            app_params(app_id, guid),
        )
        .await?;
    if removed == 0 {
        return Err(BridgeError::not_found(E::TYPE_NAME));
    }
    Ok(())
}

/// Latest revision of each identifier in an app.
fn assessments_query(
    app_id: &str,
    tags: &BTreeSet<String>,
    include_deleted: bool,
) -> QueryBuilder {
    let deleted = if include_deleted {
        ""
    } else {
        " AND latest.deleted = FALSE"
    };
    let mut builder = QueryBuilder::new();
    builder.append_param(
        "SELECT * FROM assessments a WHERE a.app_id = :appId",
        "appId",
        app_id,
    );
    if !include_deleted {
        builder.append("AND a.deleted = FALSE");
    }
    builder.append(format!(
        "AND a.revision = (SELECT MAX(latest.revision) FROM assessments latest \
         WHERE latest.app_id = a.app_id AND latest.identifier = a.identifier{deleted})"
    ));
    if !tags.is_empty() {
        builder.append_param(
            "AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(a.tags::jsonb) AS t(tag) \
             WHERE t.tag = ANY(:tags))",
            "tags",
            tags,
        );
    }
    builder.append("ORDER BY a.identifier");
    builder
}

fn revisions_query(app_id: &str, identifier: &str, include_deleted: bool) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_params(
        "SELECT * FROM assessments WHERE app_id = :appId AND identifier = :identifier",
        [("appId", app_id), ("identifier", identifier)],
    );
    if !include_deleted {
        builder.append("AND deleted = FALSE");
    }
    builder.append("ORDER BY revision DESC");
    builder
}

/// Resources of an identifier whose revision range overlaps the
/// requested one.
fn resources_query(app_id: &str, assessment_id: &str, query: &ResourceQuery) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_params(
        "SELECT * FROM assessment_resources \
         WHERE app_id = :appId AND assessment_id = :assessmentId",
        [("appId", app_id), ("assessmentId", assessment_id)],
    );
    if !query.categories.is_empty() {
        let categories: Vec<String> = query.categories.iter().map(column_text).collect();
        builder.append_param("AND category = ANY(:categories)", "categories", categories);
    }
    if let Some(min) = query.min_revision {
        builder.append_param(
            "AND (max_revision IS NULL OR max_revision >= :minRevision)",
            "minRevision",
            min,
        );
    }
    if let Some(max) = query.max_revision {
        builder.append_param(
            "AND (min_revision IS NULL OR min_revision <= :maxRevision)",
            "maxRevision",
            max,
        );
    }
    if !query.include_deleted {
        builder.append("AND deleted = FALSE");
    }
    builder.append("ORDER BY title, guid");
    builder
}

/// Diesel-backed implementation of the `AssessmentDao` port.
#[derive(Clone)]
pub struct DieselAssessmentDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselAssessmentDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: basic_helper(sessions),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> AssessmentDao for DieselAssessmentDao<S> {
    async fn get_assessments(
        &self,
        app_id: &str,
        page: PageRequest,
        tags: &BTreeSet<String>,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Assessment>, BridgeError> {
        let builder = assessments_query(app_id, tags, include_deleted);
        Ok(self
            .helper
            .query_page::<Assessment>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param("tags", tags)
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn get_assessment_revisions(
        &self,
        app_id: &str,
        identifier: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Assessment>, BridgeError> {
        let builder = revisions_query(app_id, identifier, include_deleted);
        Ok(self
            .helper
            .query_page::<Assessment>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn get_assessment(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<Assessment>, BridgeError> {
        Ok(self
            .helper
            .get_by_id::<Assessment>(guid.to_owned())
            .await?
            .filter(|assessment| assessment.app_id == app_id))
    }

    async fn get_assessment_by_identifier(
        &self,
        app_id: &str,
        identifier: &str,
        revision: i64,
    ) -> Result<Option<Assessment>, BridgeError> {
        let params = Params::from([
            ("appId".to_owned(), SqlValue::from(app_id)),
            ("identifier".to_owned(), SqlValue::from(identifier)),
            ("revision".to_owned(), SqlValue::from(revision)),
        ]);
        let found = self
            .helper
            .query_get::<Assessment>(
                "SELECT * FROM assessments WHERE app_id = :appId \
                 AND identifier = :identifier AND revision = :revision",
                params,
                None,
                Some(1),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn create_assessment(
        &self,
        assessment: Assessment,
        config: AssessmentConfig,
    ) -> Result<Assessment, BridgeError> {
        let subject = assessment.clone();
        let created = self
            .helper
            .execute_with_session(Some(&subject), move |session| {
                async move {
                    let mut config = config;
                    config.guid = assessment.guid.clone();
                    entity::insert(session, &assessment).await?;
                    entity::insert(session, &config).await?;
                    Ok(assessment)
                }
                .scope_boxed()
            })
            .await?;
        debug!(
            guid = %created.guid,
            identifier = %created.identifier,
            revision = created.revision,
            "assessment created"
        );
        Ok(created)
    }

    async fn update_assessment(&self, assessment: Assessment) -> Result<Assessment, BridgeError> {
        self.helper.update(assessment).await
    }

    async fn delete_assessment(&self, app_id: &str, guid: &str) -> Result<(), BridgeError> {
        delete_in_app::<Assessment, S>(&self.helper, "assessments", app_id, guid).await
    }
}

/// Diesel-backed implementation of the `AssessmentResourceDao` port.
#[derive(Clone)]
pub struct DieselAssessmentResourceDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselAssessmentResourceDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: basic_helper(sessions),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> AssessmentResourceDao for DieselAssessmentResourceDao<S> {
    async fn get_resources(
        &self,
        app_id: &str,
        assessment_id: &str,
        query: &ResourceQuery,
    ) -> Result<PagedResourceList<AssessmentResource>, BridgeError> {
        let builder = resources_query(app_id, assessment_id, query);
        let mut page = self
            .helper
            .query_page::<AssessmentResource>(
                &builder.query(),
                builder.parameters().clone(),
                query.page,
            )
            .await?
            .with_request_param("categories", &query.categories)
            .with_request_param(INCLUDE_DELETED, query.include_deleted);
        if let Some(min) = query.min_revision {
            page = page.with_request_param("minRevision", min);
        }
        if let Some(max) = query.max_revision {
            page = page.with_request_param("maxRevision", max);
        }
        Ok(page)
    }

    async fn get_resource(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<AssessmentResource>, BridgeError> {
        Ok(self
            .helper
            .get_by_id::<AssessmentResource>(guid.to_owned())
            .await?
            .filter(|resource| resource.app_id == app_id))
    }

    async fn save_resource(
        &self,
        resource: AssessmentResource,
    ) -> Result<AssessmentResource, BridgeError> {
        let subject = resource.clone();
        self.helper
            .execute_with_session(Some(&subject), move |session| {
                async move {
                    let mut resource = resource;
                    let existing =
                        entity::load::<AssessmentResource, _>(session, &resource.key()).await?;
                    if existing.is_some_and(|stored| stored.app_id == resource.app_id) {
                        entity::update(session, &mut resource).await?;
                    } else {
                        entity::insert(session, &resource).await?;
                    }
                    Ok(resource)
                }
                .scope_boxed()
            })
            .await
    }

    async fn delete_resource_permanently(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<(), BridgeError> {
        delete_in_app::<AssessmentResource, S>(&self.helper, "assessment_resources", app_id, guid)
            .await
    }
}

/// Diesel-backed implementation of the `AssessmentConfigDao` port.
#[derive(Clone)]
pub struct DieselAssessmentConfigDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselAssessmentConfigDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: basic_helper(sessions),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> AssessmentConfigDao for DieselAssessmentConfigDao<S> {
    async fn get_assessment_config(
        &self,
        guid: &str,
    ) -> Result<Option<AssessmentConfig>, BridgeError> {
        self.helper.get_by_id::<AssessmentConfig>(guid.to_owned()).await
    }

    async fn customize(&self, config: AssessmentConfig) -> Result<AssessmentConfig, BridgeError> {
        self.helper.update(config).await
    }

    async fn delete_assessment_config(&self, guid: &str) -> Result<(), BridgeError> {
        self.helper
            .delete_by_id::<AssessmentConfig>(guid.to_owned())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceCategory;
    use crate::outbound::persistence::statement::SqlValue;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
    use chrono::{DateTime, Utc};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn resource() -> AssessmentResource {
        AssessmentResource {
            guid: "r1".into(),
            app_id: "api".into(),
            assessment_id: "walk".into(),
            title: "Licence".into(),
            category: ResourceCategory::License,
            url: "https://example.org/licence".into(),
            format: None,
            date: None,
            description: None,
            contributors: vec!["lab".into()],
            creators: Vec::new(),
            publishers: Vec::new(),
            language: Some("en".into()),
            min_revision: Some(1),
            max_revision: None,
            created_at_revision: 1,
            created_on: DateTime::<Utc>::default(),
            modified_on: DateTime::<Utc>::default(),
            deleted: false,
            version: 2,
        }
    }

    #[rstest]
    fn tag_filters_match_any_tag() {
        let tags = BTreeSet::from(["cognition".to_owned(), "motor".to_owned()]);
        let builder = assessments_query("api", &tags, false);
        let query = builder.query();
        assert!(query.contains("t.tag = ANY(:tags)"));
        assert!(query.contains("latest.deleted = FALSE"));
        assert_eq!(builder.parameters()["tags"], SqlValue::from(&tags));
    }

    #[rstest]
    fn including_deleted_considers_every_revision() {
        let query = assessments_query("api", &BTreeSet::new(), true).query();
        assert!(!query.contains("deleted"));
        assert!(!query.contains("jsonb_array_elements_text"));
    }

    #[rstest]
    fn revision_bounds_select_overlapping_resources() {
        let query = ResourceQuery {
            categories: BTreeSet::from([ResourceCategory::Publication]),
            min_revision: Some(2),
            max_revision: Some(5),
            ..ResourceQuery::default()
        };
        let builder = resources_query("api", "walk", &query);
        let sql = builder.query();
        assert!(sql.contains("(max_revision IS NULL OR max_revision >= :minRevision)"));
        assert!(sql.contains("(min_revision IS NULL OR min_revision <= :maxRevision)"));
        assert_eq!(
            builder.parameters()["categories"],
            SqlValue::from(vec!["publication".to_owned()])
        );
        assert_eq!(builder.parameters()["minRevision"], SqlValue::BigInt(2));
    }

    #[rstest]
    #[tokio::test]
    async fn assessments_are_created_with_their_config() {
        let sessions = ScriptedSessionFactory::new();
        let assessment = Assessment {
            guid: "g1".into(),
            app_id: "api".into(),
            identifier: "walk".into(),
            revision: 1,
            ..Assessment::default()
        };
        let config = AssessmentConfig {
            config: json!({ "steps": [] }),
            ..AssessmentConfig::default()
        };

        DieselAssessmentDao::new(Arc::new(sessions.clone()))
            .create_assessment(assessment, config)
            .await
            .expect("create succeeds");

        assert_eq!(
            sessions.events(),
            vec![
                SessionEvent::Open,
                SessionEvent::Begin,
                SessionEvent::Insert("assessments"),
                SessionEvent::Insert("assessment_configs"),
                SessionEvent::Commit,
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn saving_an_existing_resource_updates_it(resource: AssessmentResource) {
        let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&resource)]);

        let saved = DieselAssessmentResourceDao::new(Arc::new(sessions.clone()))
            .save_resource(resource)
            .await
            .expect("save succeeds");

        assert_eq!(saved.version, 3);
        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Update("assessment_resources", 2))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn saving_a_new_resource_inserts_it(resource: AssessmentResource) {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Rows(Vec::new()));

        let saved = DieselAssessmentResourceDao::new(Arc::new(sessions.clone()))
            .save_resource(resource)
            .await
            .expect("save succeeds");

        assert_eq!(saved.version, 2);
        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Insert("assessment_resources"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn stale_customizations_conflict() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));
        let config = AssessmentConfig {
            guid: "g1".into(),
            version: 4,
            ..AssessmentConfig::default()
        };

        let err = DieselAssessmentConfigDao::new(Arc::new(sessions.clone()))
            .customize(config)
            .await
            .expect_err("stale version");

        assert_eq!(err.status_code(), 409);
    }

    #[rstest]
    #[tokio::test]
    async fn resources_of_other_apps_are_not_updated(resource: AssessmentResource) {
        let mut foreign = resource.clone();
        foreign.app_id = "other-app".into();
        let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&foreign)]);

        DieselAssessmentResourceDao::new(Arc::new(sessions.clone()))
            .save_resource(resource)
            .await
            .expect("save succeeds");

        assert!(
            sessions
                .events()
                .contains(&SessionEvent::Insert("assessment_resources"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn assessments_of_other_apps_are_hidden() {
        let stored = Assessment {
            guid: "g1".into(),
            app_id: "other-app".into(),
            ..Assessment::default()
        };
        let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&stored)]);

        let found = DieselAssessmentDao::new(Arc::new(sessions.clone()))
            .get_assessment("api", "g1")
            .await
            .expect("lookup succeeds");

        assert_eq!(found, None);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_an_assessment_outside_the_app_is_not_found() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(0));

        let err = DieselAssessmentDao::new(Arc::new(sessions.clone()))
            .delete_assessment("api", "g1")
            .await
            .expect_err("no row");

        assert_eq!(err, BridgeError::not_found("Assessment"));
        let statement = &sessions.statements()[0];
        assert_eq!(
            statement.sql(),
            "DELETE FROM assessments WHERE app_id = :appId AND guid = :guid"
        );
        assert_eq!(statement.params()["guid"], SqlValue::from("g1"));
    }
}
