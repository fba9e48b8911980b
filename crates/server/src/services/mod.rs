//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens, password reset, profiles
//! - `catalog` - Artworks, likes, comments, listing and buying
//! - `cart` - Per-user carts
//! - `orders` - Checkout and order lifecycle
//! - `admin` - User management, moderation and reports
//!
//! Services borrow the store for the duration of one request and enforce
//! every authorization and state rule themselves; handlers only translate.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use thiserror::Error;

pub use admin::AdminService;
pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use catalog::CatalogService;
pub use orders::OrderService;

use crate::db::RepositoryError;
use crate::models::CurrentUser;

/// Errors from the marketplace services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The caller may not perform this action.
    #[error("{0}")]
    Forbidden(String),

    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The record's current state does not allow this action.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fail with `Forbidden` unless the caller is an admin.
pub(crate) fn ensure_admin(actor: &CurrentUser) -> Result<(), ServiceError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("admin access required".to_owned()))
    }
}

/// Trim a required text field, failing if nothing is left.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_owned())
}
