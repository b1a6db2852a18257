//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` (`tower-sessions-sqlx-store`) when the store
//! is backed by a database, and in process memory otherwise.

use axum::Router;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;
use crate::db::Store;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "aurelia_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Build a session layer over any session store.
#[must_use]
pub fn create_session_layer<T: SessionStore>(
    store: T,
    config: &StorefrontConfig,
) -> SessionManagerLayer<T> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Wrap `router` in a session layer matching the storage backend.
///
/// The `PostgreSQL` session table must exist (`aurelia-cli migrate`).
pub fn with_sessions(router: Router, store: &Store, config: &StorefrontConfig) -> Router {
    match store.pg_pool() {
        Some(pool) => router.layer(create_session_layer(PostgresStore::new(pool.clone()), config)),
        None => router.layer(create_session_layer(MemoryStore::default(), config)),
    }
}
