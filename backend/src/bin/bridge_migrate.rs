//! Apply the embedded Bridge schema migrations.
//!
//! Connection settings come from `BRIDGE_DB_*` variables or configuration
//! files; `--database-url` overrides them. `--list` reports pending
//! migrations without running them.

use std::ffi::OsString;

use bridge_backend::config::PersistenceSettings;
use clap::Parser;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use ortho_config::OrthoConfig;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "bridge-migrate", about = "Apply Bridge schema migrations")]
struct Cli {
    /// Only list pending migrations.
    #[arg(long)]
    list: bool,
    /// PostgreSQL URL overriding the configured one.
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Debug, Error)]
enum MigrateError {
    #[error("failed to load database settings: {0}")]
    Settings(String),
    #[error("failed to connect to the database: {0}")]
    Connect(#[from] diesel::ConnectionError),
    #[error("migration failed: {0}")]
    Migration(String),
}

fn main() -> Result<(), MigrateError> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let database_url = match cli.database_url {
        Some(url) => url,
        None => PersistenceSettings::load_from_iter([OsString::from("bridge-migrate")])
            .map_err(|err| MigrateError::Settings(err.to_string()))?
            .database_url,
    };

    let mut conn = PgConnection::establish(&database_url)?;
    if cli.list {
        let pending = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|err| MigrateError::Migration(err.to_string()))?;
        for migration in &pending {
            info!(migration = %migration.name(), "pending");
        }
        info!(count = pending.len(), "pending migrations listed");
        return Ok(());
    }

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrateError::Migration(err.to_string()))?;
    for version in &applied {
        info!(version = %version, "applied");
    }
    info!(count = applied.len(), "migrations complete");
    Ok(())
}
