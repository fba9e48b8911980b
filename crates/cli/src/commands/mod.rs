//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use std::sync::Arc;

use thiserror::Error;

use brana_server::config::{ConfigError, ServerConfig, StoreConfig};
use brana_server::db::{self, PgStore, RepositoryError};
use brana_server::services::{AuthError, ServiceError};
use brana_server::services::auth::LogDelivery;
use brana_server::state::AppState;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The command needs `PostgreSQL` but the in-memory store is configured.
    #[error("This command needs a database; unset BRANA_IN_MEMORY")]
    InMemoryStore,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    /// No account with this email.
    #[error("No account with email: {0}")]
    UserNotFound(String),
}

/// Load the server configuration and connect to its database.
///
/// Reset links, if any, are only logged.
pub(crate) async fn connect() -> Result<AppState, CliError> {
    let config = ServerConfig::from_env()?;

    let StoreConfig::Postgres(url) = &config.store else {
        return Err(CliError::InMemoryStore);
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(url).await?;

    Ok(AppState::new(
        config,
        Arc::new(PgStore::new(pool)),
        Arc::new(LogDelivery),
    ))
}
