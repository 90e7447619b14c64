//! Port for study persistence.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, RequestContext, Study, StudyDetail};

/// Study store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudyDao: Send + Sync {
    /// Page through the studies of an app visible to the caller.
    async fn get_studies(
        &self,
        ctx: &RequestContext,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Study>, BridgeError>;

    /// Load a study, deleted or not.
    async fn get_study(&self, app_id: &str, study_id: &str) -> Result<Option<Study>, BridgeError>;

    /// Load a study with its creator resolved.
    async fn get_study_detail(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<Option<StudyDetail>, BridgeError>;

    /// Insert a study.
    async fn create_study(&self, study: Study) -> Result<Study, BridgeError>;

    /// Versioned update.
    async fn update_study(&self, study: Study) -> Result<Study, BridgeError>;

    /// Flag a study as deleted.
    async fn delete_study(&self, app_id: &str, study_id: &str) -> Result<(), BridgeError>;

    /// Remove a study row.
    async fn delete_study_permanently(&self, app_id: &str, study_id: &str)
    -> Result<(), BridgeError>;
}
