//! Port for survey persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, Survey};

/// Survey store. Surveys are addressed by `(guid, created_on)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SurveyDao: Send + Sync {
    /// Load one revision.
    async fn get_survey(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<Option<Survey>, BridgeError>;

    /// Most recent revision of a survey.
    async fn get_survey_most_recent_version(
        &self,
        app_id: &str,
        guid: &str,
    ) -> Result<Option<Survey>, BridgeError>;

    /// Page through the most recently published revision of each survey.
    async fn get_published_surveys(
        &self,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Survey>, BridgeError>;

    /// Insert a revision.
    async fn create_survey(&self, survey: Survey) -> Result<Survey, BridgeError>;

    /// Versioned update.
    async fn update_survey(&self, survey: Survey) -> Result<Survey, BridgeError>;

    /// Flag a revision as deleted.
    async fn delete_survey(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<(), BridgeError>;

    /// Remove a revision row.
    async fn delete_survey_permanently(
        &self,
        app_id: &str,
        guid: &str,
        created_on: DateTime<Utc>,
    ) -> Result<(), BridgeError>;
}
