//! Ports for assessments, their resources and their configurations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{
    Assessment, AssessmentConfig, AssessmentResource, BridgeError, ResourceCategory,
};

/// Assessment store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssessmentDao: Send + Sync {
    /// Page through the latest revision of each assessment identifier.
    ///
    /// A non-empty `tags` set keeps assessments carrying any of the tags.
    async fn get_assessments(
        &self,
        app_id: &str,
        page: PageRequest,
        tags: &BTreeSet<String>,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Assessment>, BridgeError>;

    /// Page through every revision of one identifier, newest first.
    async fn get_assessment_revisions(
        &self,
        app_id: &str,
        identifier: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Assessment>, BridgeError>;

    /// Load a revision by guid.
    async fn get_assessment(&self, app_id: &str, guid: &str)
    -> Result<Option<Assessment>, BridgeError>;

    /// Load a revision by identifier and revision number.
    async fn get_assessment_by_identifier(
        &self,
        app_id: &str,
        identifier: &str,
        revision: i64,
    ) -> Result<Option<Assessment>, BridgeError>;

    /// Insert an assessment revision and its configuration together.
    async fn create_assessment(
        &self,
        assessment: Assessment,
        config: AssessmentConfig,
    ) -> Result<Assessment, BridgeError>;

    /// Versioned update.
    async fn update_assessment(&self, assessment: Assessment) -> Result<Assessment, BridgeError>;

    /// Remove a revision and its configuration.
    async fn delete_assessment(&self, app_id: &str, guid: &str) -> Result<(), BridgeError>;
}

/// Filters for a resource listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    /// Offset and page size.
    pub page: PageRequest,
    /// Categories to include; empty means all.
    pub categories: BTreeSet<ResourceCategory>,
    /// Keep resources applying at or after this revision.
    pub min_revision: Option<i64>,
    /// Keep resources applying at or before this revision.
    pub max_revision: Option<i64>,
    /// Include soft-deleted resources.
    pub include_deleted: bool,
}

/// Assessment resource store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssessmentResourceDao: Send + Sync {
    /// Page through the resources of an assessment identifier.
    async fn get_resources(
        &self,
        app_id: &str,
        assessment_id: &str,
        query: &ResourceQuery,
    ) -> Result<PagedResourceList<AssessmentResource>, BridgeError>;

    /// Load a resource.
    async fn get_resource(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<AssessmentResource>, BridgeError>;

    /// Insert a new resource or apply a versioned update to an existing one.
    async fn save_resource(
        &self,
        resource: AssessmentResource,
    ) -> Result<AssessmentResource, BridgeError>;

    /// Remove a resource row.
    async fn delete_resource_permanently(&self, app_id: &str, guid: &str)
    -> Result<(), BridgeError>;
}

/// Assessment configuration store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssessmentConfigDao: Send + Sync {
    /// Load the configuration of an assessment revision.
    async fn get_assessment_config(
        &self,
        guid: &str,
    ) -> Result<Option<AssessmentConfig>, BridgeError>;

    /// Versioned update of a configuration.
    async fn customize(&self, config: AssessmentConfig) -> Result<AssessmentConfig, BridgeError>;

    /// Remove a configuration.
    async fn delete_assessment_config(&self, guid: &str) -> Result<(), BridgeError>;
}
