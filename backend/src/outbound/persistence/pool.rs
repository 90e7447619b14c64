//! bb8 pool of `diesel-async` PostgreSQL connections.
//!
//! Sessions check connections out with [`DbPool::get_owned`] so a session
//! can hold its connection across awaits without borrowing the pool.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

use crate::config::PersistenceSettings;
use crate::domain::PersistenceFailure;

/// Errors raised while building the pool or checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available within the checkout timeout.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// The pool could not be built.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Checkout failure.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Build failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

impl From<PoolError> for PersistenceFailure {
    fn from(err: PoolError) -> Self {
        PersistenceFailure::connection(err.to_string())
    }
}

/// Pool sizing and checkout timeout.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bridge_backend::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://bridge@localhost/bridge")
///     .with_max_size(20)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_size(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Defaults: ten connections, two idle, thirty-second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Build from loaded settings, keeping defaults for unset values.
    pub fn from_settings(settings: &PersistenceSettings) -> Self {
        let mut config = Self::new(settings.database_url());
        if let Some(max_size) = settings.pool_max_size {
            config = config.with_max_size(max_size);
        }
        if settings.pool_min_idle.is_some() {
            config = config.with_min_idle(settings.pool_min_idle);
        }
        if let Some(seconds) = settings.pool_timeout_secs {
            config = config.with_connection_timeout(Duration::from_secs(seconds));
        }
        config
    }

    /// Maximum number of connections.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Minimum idle connections kept open.
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Maximum number of connections.
    pub fn max_size(&self) -> u32 {
        self.max_size
    }
}

/// Shared connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the initial connections cannot be
    /// opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Check out a connection that does not borrow the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when no connection is available in
    /// time.
    pub async fn get_owned(
        &self,
    ) -> Result<PooledConnection<'static, AsyncPgConnection>, PoolError> {
        self.inner
            .get_owned()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_apply_when_settings_leave_values_unset() {
        let settings = PersistenceSettings {
            database_url: "postgres://localhost/bridge".into(),
            pool_max_size: None,
            pool_min_idle: None,
            pool_timeout_secs: None,
        };
        let config = PoolConfig::from_settings(&settings);

        assert_eq!(config.database_url(), "postgres://localhost/bridge");
        assert_eq!(config.max_size, 10);
        assert_eq!(config.min_idle, Some(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[rstest]
    fn settings_override_defaults() {
        let settings = PersistenceSettings {
            database_url: "postgres://localhost/bridge".into(),
            pool_max_size: Some(4),
            pool_min_idle: Some(1),
            pool_timeout_secs: Some(3),
        };
        let config = PoolConfig::from_settings(&settings);

        assert_eq!(config.max_size, 4);
        assert_eq!(config.min_idle, Some(1));
        assert_eq!(config.connection_timeout, Duration::from_secs(3));
    }

    #[rstest]
    fn checkout_errors_become_connection_failures() {
        let failure = PersistenceFailure::from(PoolError::checkout("timed out"));
        assert_eq!(failure.kind(), crate::domain::FailureKind::Connection);
        assert!(failure.message().contains("timed out"));
    }
}
