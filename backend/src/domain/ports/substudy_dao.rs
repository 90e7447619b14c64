//! Port for substudy persistence.

use async_trait::async_trait;

use crate::domain::{BridgeError, Substudy};

/// Substudy store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubstudyDao: Send + Sync {
    /// Every substudy of an app.
    async fn get_substudies(
        &self,
        app_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<Substudy>, BridgeError>;

    /// Load a substudy.
    async fn get_substudy(&self, app_id: &str, id: &str) -> Result<Option<Substudy>, BridgeError>;

    /// Insert a substudy.
    async fn create_substudy(&self, substudy: Substudy) -> Result<Substudy, BridgeError>;

    /// Versioned update.
    async fn update_substudy(&self, substudy: Substudy) -> Result<Substudy, BridgeError>;

    /// Flag a substudy as deleted.
    async fn delete_substudy(&self, app_id: &str, id: &str) -> Result<(), BridgeError>;

    /// Remove a substudy row.
    async fn delete_substudy_permanently(&self, app_id: &str, id: &str) -> Result<(), BridgeError>;
}
