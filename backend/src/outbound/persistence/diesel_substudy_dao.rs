//! PostgreSQL-backed `SubstudyDao` implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::SubstudyDao;
use crate::domain::{BridgeError, Substudy};

use super::exceptions::SubstudyPersistenceExceptionConverter;
use super::helper::PersistenceHelper;
use super::pg_session::PgSessionFactory;
use super::session::SessionFactory;
use super::statement::{Params, SqlValue};

const SUBSTUDIES: &str = "SELECT * FROM substudies WHERE app_id = :appId";

fn substudy_key(app_id: &str, id: &str) -> (String, String) {
    (app_id.to_owned(), id.to_owned())
}

/// Diesel-backed implementation of the `SubstudyDao` port.
#[derive(Clone)]
pub struct DieselSubstudyDao<S = PgSessionFactory> {
    helper: PersistenceHelper<S>,
}

impl<S: SessionFactory> DieselSubstudyDao<S> {
    /// Create a DAO over the given sessions.
    pub fn new(sessions: Arc<S>) -> Self {
        Self {
            helper: PersistenceHelper::new(
                sessions,
                Arc::new(SubstudyPersistenceExceptionConverter),
            ),
        }
    }
}

#[async_trait]
impl<S: SessionFactory> SubstudyDao for DieselSubstudyDao<S> {
    async fn get_substudies(
        &self,
        app_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<Substudy>, BridgeError> {
        let sql = if include_deleted {
            format!("{SUBSTUDIES} ORDER BY id")
        } else {
            format!("{SUBSTUDIES} AND deleted = FALSE ORDER BY id")
        };
        let params = Params::from([("appId".to_owned(), SqlValue::from(app_id))]);
        self.helper.query_get::<Substudy>(&sql, params, None, None).await
    }

    async fn get_substudy(&self, app_id: &str, id: &str) -> Result<Option<Substudy>, BridgeError> {
        self.helper
            .get_by_id::<Substudy>(substudy_key(app_id, id))
            .await
    }

    async fn create_substudy(&self, substudy: Substudy) -> Result<Substudy, BridgeError> {
        self.helper.create(substudy).await
    }

    async fn update_substudy(&self, substudy: Substudy) -> Result<Substudy, BridgeError> {
        self.helper.update(substudy).await
    }

    async fn delete_substudy(&self, app_id: &str, id: &str) -> Result<(), BridgeError> {
        self.helper
            .soft_delete::<Substudy>(substudy_key(app_id, id))
            .await
    }

    async fn delete_substudy_permanently(
        &self,
        app_id: &str,
        id: &str,
    ) -> Result<(), BridgeError> {
        let substudy = Substudy {
            app_id: app_id.to_owned(),
            id: id.to_owned(),
            ..Substudy::default()
        };
        self.helper.delete(&substudy).await
    }
}
