//! Port for schedule persistence.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, Schedule2};

/// Schedule store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Schedule2Dao: Send + Sync {
    /// Page through an app's schedules.
    async fn get_schedules(
        &self,
        app_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Schedule2>, BridgeError>;

    /// Page through the schedules owned by one organization.
    async fn get_schedules_for_organization(
        &self,
        app_id: &str,
        owner_id: &str,
        page: PageRequest,
        include_deleted: bool,
    ) -> Result<PagedResourceList<Schedule2>, BridgeError>;

    /// Load a schedule, deleted or not.
    async fn get_schedule(&self, app_id: &str, guid: &str)
    -> Result<Option<Schedule2>, BridgeError>;

    /// Insert a schedule.
    async fn create_schedule(&self, schedule: Schedule2) -> Result<Schedule2, BridgeError>;

    /// Versioned update.
    async fn update_schedule(&self, schedule: Schedule2) -> Result<Schedule2, BridgeError>;

    /// Flag a schedule as deleted.
    async fn delete_schedule(&self, app_id: &str, guid: &str) -> Result<(), BridgeError>;

    /// Remove a schedule row.
    async fn delete_schedule_permanently(&self, app_id: &str, guid: &str)
    -> Result<(), BridgeError>;
}
