//! Database settings loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;

/// Database URL used when none is configured.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/bridge";

/// Connection and pool settings, read from `BRIDGE_DB_*` environment
/// variables, configuration files or command-line flags.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BRIDGE_DB")]
pub struct PersistenceSettings {
    /// PostgreSQL connection URL.
    #[ortho_config(default = DEFAULT_DATABASE_URL.to_owned())]
    pub database_url: String,
    /// Maximum pooled connections.
    pub pool_max_size: Option<u32>,
    /// Minimum idle connections.
    pub pool_min_idle: Option<u32>,
    /// Checkout timeout in seconds.
    pub pool_timeout_secs: Option<u64>,
}

impl PersistenceSettings {
    /// Configured database URL, [`DEFAULT_DATABASE_URL`] unless overridden.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for database settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> PersistenceSettings {
        PersistenceSettings::load_from_iter([OsString::from("bridge")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("BRIDGE_DB_DATABASE_URL", None::<String>),
            ("BRIDGE_DB_POOL_MAX_SIZE", None::<String>),
            ("BRIDGE_DB_POOL_MIN_IDLE", None::<String>),
            ("BRIDGE_DB_POOL_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), DEFAULT_DATABASE_URL);
        assert!(settings.pool_max_size.is_none());
        assert!(settings.pool_min_idle.is_none());
        assert!(settings.pool_timeout_secs.is_none());
    }

    #[rstest]
    fn a_url_alone_is_enough_to_load() {
        let _guard = lock_env([
            (
                "BRIDGE_DB_DATABASE_URL",
                Some("postgres://bridge@replica/bridge".to_owned()),
            ),
            ("BRIDGE_DB_POOL_MAX_SIZE", None::<String>),
            ("BRIDGE_DB_POOL_MIN_IDLE", None::<String>),
            ("BRIDGE_DB_POOL_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), "postgres://bridge@replica/bridge");
        assert!(settings.pool_max_size.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "BRIDGE_DB_DATABASE_URL",
                Some("postgres://bridge@db/bridge".to_owned()),
            ),
            ("BRIDGE_DB_POOL_MAX_SIZE", Some("25".to_owned())),
            ("BRIDGE_DB_POOL_MIN_IDLE", Some("3".to_owned())),
            ("BRIDGE_DB_POOL_TIMEOUT_SECS", Some("7".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), "postgres://bridge@db/bridge");
        assert_eq!(settings.pool_max_size, Some(25));
        assert_eq!(settings.pool_min_idle, Some(3));
        assert_eq!(settings.pool_timeout_secs, Some(7));
    }
}
