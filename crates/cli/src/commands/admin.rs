//! Admin account management commands.
//!
//! # Environment Variables
//!
//! Same as the server: `BRANA_DATABASE_URL` and `BRANA_TOKEN_SECRET`.

use brana_core::{Email, Role};
use brana_server::db::UserStore;

use super::{CliError, connect};

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error for invalid input, a taken email/username, or database
/// failures.
pub async fn create(email: &str, password: &str, username: Option<&str>) -> Result<(), CliError> {
    let state = connect().await?;

    tracing::info!("Creating admin account: {}", email);
    let user = state
        .auth()
        .create_account(email, password, username, None, Role::Admin)
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `CliError::UserNotFound` if no account has this email.
pub async fn promote(email: &str) -> Result<(), CliError> {
    let state = connect().await?;
    let store = state.store();

    let parsed = Email::parse(email).map_err(|_| CliError::UserNotFound(email.to_owned()))?;
    let user = store
        .get_user_by_email(&parsed)
        .await?
        .ok_or_else(|| CliError::UserNotFound(email.to_owned()))?;

    if user.role == Role::Admin {
        tracing::info!("{} is already an admin", user.email);
        return Ok(());
    }

    store
        .set_role(user.id, Role::Admin)
        .await?
        .ok_or_else(|| CliError::UserNotFound(email.to_owned()))?;

    tracing::info!("Promoted {} (ID {}) to admin", user.email, user.id);
    Ok(())
}
