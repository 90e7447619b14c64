//! Port for study alerts.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{Alert, AlertCategoriesAndCounts, AlertCategory, AlertFilter, BridgeError};

/// Alert store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertDao: Send + Sync {
    /// Insert an alert.
    async fn create_alert(&self, alert: Alert) -> Result<Alert, BridgeError>;

    /// Delete the listed alerts of a study.
    async fn delete_alerts(
        &self,
        app_id: &str,
        study_id: &str,
        alert_ids: &[String],
    ) -> Result<(), BridgeError>;

    /// Page through a study's alerts, newest first.
    async fn get_alerts(
        &self,
        app_id: &str,
        study_id: &str,
        page: PageRequest,
        filter: &AlertFilter,
    ) -> Result<PagedResourceList<Alert>, BridgeError>;

    /// The alert of one category raised for a participant, if any.
    async fn get_alert(
        &self,
        app_id: &str,
        study_id: &str,
        user_id: &str,
        category: AlertCategory,
    ) -> Result<Option<Alert>, BridgeError>;

    /// Load an alert by id.
    async fn get_alert_by_id(&self, alert_id: &str) -> Result<Option<Alert>, BridgeError>;

    /// Count a study's alerts per category.
    async fn get_alert_categories_and_counts(
        &self,
        app_id: &str,
        study_id: &str,
    ) -> Result<AlertCategoriesAndCounts, BridgeError>;

    /// Set the read flag on the listed alerts.
    async fn set_alerts_read_state(
        &self,
        app_id: &str,
        study_id: &str,
        alert_ids: &[String],
        read: bool,
    ) -> Result<(), BridgeError>;

    /// Delete every alert of a study.
    async fn delete_alerts_for_study(&self, app_id: &str, study_id: &str)
    -> Result<(), BridgeError>;

    /// Delete every alert about a user in an app.
    async fn delete_alerts_for_user_in_app(
        &self,
        app_id: &str,
        user_id: &str,
    ) -> Result<(), BridgeError>;

    /// Delete every alert about a user in one study.
    async fn delete_alerts_for_user_in_study(
        &self,
        app_id: &str,
        study_id: &str,
        user_id: &str,
    ) -> Result<(), BridgeError>;
}
