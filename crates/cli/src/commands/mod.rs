//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

use aurelia_storefront::db::Store;

/// Errors shared by commands that need the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Database URL from the environment (`.env` is loaded if present).
pub fn database_url() -> Result<SecretString, ConnectError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
        .ok_or(ConnectError::MissingDatabaseUrl)
}

/// Connect a `PostgreSQL`-backed store.
pub async fn connect() -> Result<Store, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(Store::connect(&url).await?)
}
