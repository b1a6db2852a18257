//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! aurelia-cli admin create -e admin@example.com -n "Admin Name" -p 'long password'
//! aurelia-cli admin promote -e customer@example.com
//! ```

use thiserror::Error;

use aurelia_core::{Email, EmailError, UserRole};
use aurelia_storefront::db::{RepositoryError, UserStore};
use aurelia_storefront::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user. Returns the new user's ID.
///
/// # Errors
///
/// Returns `AdminError::Auth` if the name, email or password is invalid or
/// the email is already registered.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let store = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&store)
        .create_admin(name, email, password)
        .await?;
    let total = store.count_users().await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {} ({} users in total)",
        user.id,
        user.email,
        total
    );
    Ok(user.id.as_i32())
}

/// Grant the admin role to an existing user.
///
/// The change applies from the user's next login.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses the email.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let store = connect().await?;

    let user = store
        .set_user_role(&email, UserRole::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!("{} ({}) is now an admin", user.name, user.email);
    tracing::warn!("The new role takes effect at the user's next login.");
    Ok(())
}
