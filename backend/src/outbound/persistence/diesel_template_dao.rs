//! PostgreSQL-backed `TemplateDao` and `TemplateRevisionDao`.
//!
//! Revisions reference their template without cascading, so permanently
//! deleting a template removes its revisions first in the same unit of
//! work.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use pagination::{INCLUDE_DELETED, PageRequest, PagedResourceList};
use tracing::debug;

use crate::domain::ports::{TemplateDao, TemplateRevisionDao};
use crate::domain::{BridgeError, PersistenceFailure, Template, TemplateRevision, TemplateType};

use super::exceptions::{
    TemplatePersistenceExceptionConverter, TemplateRevisionPersistenceExceptionConverter,
};
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::query_builder::QueryBuilder;
use super::session::{Session, SessionFactory};
use super::statement::{Params, SqlValue, Statement};

const DELETE_REVISIONS: &str =
    "DELETE FROM template_revisions WHERE template_guid = :templateGuid";
const DELETE_TEMPLATE: &str = "DELETE FROM templates WHERE app_id = :appId AND guid = :guid";
const SOFT_DELETE_TEMPLATE: &str = "UPDATE templates SET deleted = TRUE, version = version + 1 \
     WHERE app_id = :appId AND guid = :guid AND deleted = FALSE";
const REVISIONS: &str = "SELECT * FROM template_revisions WHERE template_guid = :templateGuid \
     ORDER BY created_on DESC";

fn template_params(app_id: &str, guid: &str) -> Params {
    Params::from([
        ("appId".to_owned(), SqlValue::from(app_id)),
        ("guid".to_owned(), SqlValue::from(guid)),
    ])
}

fn templates_query(
    app_id: &str,
    template_type: TemplateType,
    include_deleted: bool,
) -> QueryBuilder {
    let mut builder = QueryBuilder::new();
    builder.append_params(
        "SELECT * FROM templates WHERE app_id = :appId AND template_type = :templateType",
        [("appId", app_id), ("templateType", template_type.as_str())],
    );
    if !include_deleted {
        builder.append("AND deleted = FALSE");
    }
    builder.append("ORDER BY created_on DESC, guid");
    builder
}

/// Diesel-backed implementation of the `TemplateDao` port.
#[derive(Clone)]
pub struct DieselTemplateDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselTemplateDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(TemplatePersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> TemplateDao for DieselTemplateDao<S> {
    async fn get_templates(
        &self,
        app_id: &str,
        template_type: TemplateType,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Template>, BridgeError> {
        let builder = templates_query(app_id, template_type, include_deleted);
        Ok(self
            .helper
            .query_page::<Template>(&builder.query(), builder.parameters().clone(), page)
            .await?
            .with_request_param("templateType", template_type)
            .with_request_param(INCLUDE_DELETED, include_deleted))
    }

    async fn get_template(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<Template>, BridgeError> {
        Ok(self
            .helper
            .get_by_id::<Template>(guid.to_owned())
            .await?
            .filter(|template| template.app_id == app_id))
    }

    async fn create_template(&self, template: Template) -> Result<Template, BridgeError> {
        self.helper.create(template).await
    }

    async fn update_template(&self, template: Template) -> Result<Template, BridgeError> {
        self.helper.update(template).await
    }

    async fn delete_template(&self, app_id: &str, guid: &str) -> Result<(), BridgeError> {
        let changed = self
            .helper
            .query_update::<Template>(SOFT_DELETE_TEMPLATE, template_params(app_id, guid))
            .await?;
        if changed == 0 {
            return Err(BridgeError::not_found("Template"));
        }
        Ok(())
    }

    async fn delete_template_permanently(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<(), BridgeError> {
        let clear = Statement::new(DELETE_REVISIONS).bind("templateGuid", guid);
        let remove = Statement::with_params(DELETE_TEMPLATE, template_params(app_id, guid));
        let revisions = self
            .helper
            .execute_with_session(None, move |session| {
                async move {
                    let revisions = session.execute(&clear).await?;
                    if session.execute(&remove).await? == 0 {
                        return Err(PersistenceFailure::not_found("Template"));
                    }
                    Ok(revisions)
                }
                .scope_boxed()
            })
            .await?;
        debug!(template_guid = guid, revisions, "template deleted permanently");
        Ok(())
    }
}

/// Diesel-backed implementation of the `TemplateRevisionDao` port.
#[derive(Clone)]
pub struct DieselTemplateRevisionDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselTemplateRevisionDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(TemplateRevisionPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> TemplateRevisionDao for DieselTemplateRevisionDao<S> {
    async fn get_template_revisions(
        &self,
        template_guid: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<TemplateRevision>, BridgeError> {
        let params = Params::from([("templateGuid".to_owned(), SqlValue::from(template_guid))]);
        self.helper
            .query_page::<TemplateRevision>(REVISIONS, params, page)
            .await
    }

    async fn get_template_revision(
        &self,
        template_guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Option<TemplateRevision>, BridgeError> {
        self.helper
            .get_by_id::<TemplateRevision>((
                template_guid.to_owned(),
                created_on.timestamp_millis(),
            ))
            .await
    }

    async fn create_template_revision(
        &self,
        revision: TemplateRevision,
    ) -> Result<TemplateRevision, BridgeError> {
        self.helper.create(revision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scripted, ScriptedSessionFactory, SessionEvent, entity_row};
    use rstest::rstest;

    #[rstest]
    fn templates_are_listed_newest_first_by_type() {
        let builder = templates_query("api", TemplateType::SmsVerifyPhone, false);
        assert_eq!(
            builder.query(),
            "SELECT * FROM templates WHERE app_id = :appId AND template_type = :templateType \
             AND deleted = FALSE ORDER BY created_on DESC, guid"
        );
        assert_eq!(
            builder.parameters()["templateType"],
            SqlValue::from("sms_verify_phone")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn permanent_deletes_remove_revisions_first() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Affected(3));

        DieselTemplateDao::new(Arc::new(sessions.clone()))
            .delete_template_permanently("api", "t1")
            .await
            .expect("delete succeeds");

        let statements = sessions.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql(), DELETE_REVISIONS);
        assert_eq!(statements[1].sql(), DELETE_TEMPLATE);
        assert_eq!(statements[1].params()["appId"], SqlValue::from("api"));
        assert_eq!(sessions.events().last(), Some(&SessionEvent::Commit));
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_missing_template_keeps_its_revisions() {
        let sessions = ScriptedSessionFactory::new()
            .with_response(Scripted::Affected(2))
            .with_response(Scripted::Affected(0));

        let err = DieselTemplateDao::new(Arc::new(sessions.clone()))
            .delete_template_permanently("api", "t9")
            .await
            .expect_err("no template");

        assert_eq!(err.status_code(), 404);
        assert_eq!(sessions.events().last(), Some(&SessionEvent::Rollback));
    }

    #[rstest]
    #[tokio::test]
    async fn revisions_of_missing_templates_are_not_found() {
        let sessions = ScriptedSessionFactory::new().with_response(Scripted::Fail(
            PersistenceFailure::foreign_key_violation(
                "insert or update on table \"template_revisions\" violates foreign key \
                 constraint \"fk_template_revisions_template\"",
            ),
        ));
        let revision = TemplateRevision {
            template_guid: "t9".into(),
            created_by: "user-1".into(),
            ..TemplateRevision::default()
        };

        let err = DieselTemplateRevisionDao::new(Arc::new(sessions.clone()))
            .create_template_revision(revision)
            .await
            .expect_err("missing template");

        assert_eq!(err, BridgeError::not_found("Template"));
    }

    #[rstest]
    #[tokio::test]
    async fn templates_of_other_apps_are_hidden() {
        let created_on = DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid instant");
        let template = Template {
            guid: "t1".into(),
            app_id: "other".into(),
            template_type: TemplateType::EmailSignIn,
            name: "Sign in".into(),
            description: None,
            published_created_on: None,
            deleted: false,
            created_on,
            modified_on: created_on,
            version: 1,
        };
        let sessions = ScriptedSessionFactory::new().with_rows([entity_row(&template)]);

        let found = DieselTemplateDao::new(Arc::new(sessions.clone()))
            .get_template("api", "t1")
            .await
            .expect("lookup succeeds");

        assert_eq!(found, None);
    }

    #[rstest]
    #[tokio::test]
    async fn revisions_are_found_by_template_and_creation_millis() {
        let sessions = ScriptedSessionFactory::new();
        let created_on = DateTime::from_timestamp_millis(1_700_000_000_456).expect("valid instant");

        DieselTemplateRevisionDao::new(Arc::new(sessions.clone()))
            .get_template_revision("t1", created_on)
            .await
            .expect("lookup succeeds");

        assert!(sessions.events().contains(&SessionEvent::Find(
            "template_revisions",
            r#"("t1", 1700000000456)"#.into(),
        )));
    }
}
