//! Ports for templates and template revisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, Template, TemplateRevision, TemplateType};

/// Template store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateDao: Send + Sync {
    /// Page through an app's templates of one type, newest first.
    async fn get_templates(
        &self,
        app_id: &str,
        template_type: TemplateType,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Template>, BridgeError>;

    /// Load a template.
    async fn get_template(&self, app_id: &str, guid: &str)
    -> Result<Option<Template>, BridgeError>;

    /// Insert a template.
    async fn create_template(&self, template: Template) -> Result<Template, BridgeError>;

    /// Versioned update.
    async fn update_template(&self, template: Template) -> Result<Template, BridgeError>;

    /// Flag a template as deleted.
    async fn delete_template(&self, app_id: &str, guid: &str) -> Result<(), BridgeError>;

    /// Remove a template and its revisions in one unit of work.
    async fn delete_template_permanently(&self, app_id: &str, guid: &str)
    -> Result<(), BridgeError>;
}

/// Template revision store. Revisions are immutable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRevisionDao: Send + Sync {
    /// Page through a template's revisions, newest first.
    async fn get_template_revisions(
        &self,
        template_guid: &str,
        page: PageRequest,
    ) -> Result<PagedResourceList<TemplateRevision>, BridgeError>;

    /// Load one revision.
    async fn get_template_revision(
        &self,
        template_guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Option<TemplateRevision>, BridgeError>;

    /// Insert a revision.
    async fn create_template_revision(
        &self,
        revision: TemplateRevision,
    ) -> Result<TemplateRevision, BridgeError>;
}
