//! Port for demographic persistence.

use async_trait::async_trait;
use pagination::{PageRequest, PagedResourceList};

use crate::domain::{BridgeError, Demographic, DemographicUser};

/// Demographic store.
///
/// `study_id` of `None` addresses app-level demographics.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DemographicDao: Send + Sync {
    /// Save a demographic user, replacing every stored demographic for the
    /// same app, study and user.
    async fn save_demographic_user(
        &self,
        demographic_user: DemographicUser,
    ) -> Result<DemographicUser, BridgeError>;

    /// Delete one demographic. Fails with not-found when it does not exist.
    async fn delete_demographic(&self, demographic_id: &str) -> Result<(), BridgeError>;

    /// Delete a demographic user and all their demographics.
    async fn delete_demographic_user(&self, demographic_user_id: &str) -> Result<(), BridgeError>;

    /// Id of the demographic user for an app, study and user.
    async fn get_demographic_user_id(
        &self,
        app_id: &str,
        study_id: Option<String>,
        user_id: &str,
    ) -> Result<Option<String>, BridgeError>;

    /// Load one demographic.
    async fn get_demographic(&self, demographic_id: &str)
    -> Result<Option<Demographic>, BridgeError>;

    /// Load a demographic user with their demographics.
    async fn get_demographic_user(
        &self,
        app_id: &str,
        study_id: Option<String>,
        user_id: &str,
    ) -> Result<Option<DemographicUser>, BridgeError>;

    /// Page through the demographic users of an app or study.
    async fn get_demographic_users(
        &self,
        app_id: &str,
        study_id: Option<String>,
        page: PageRequest,
    ) -> Result<PagedResourceList<DemographicUser>, BridgeError>;
}
