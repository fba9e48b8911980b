//! Record storage for the marketplace.
//!
//! # Tables (schema `brana`)
//!
//! - `user` - Accounts, roles and profile fields
//! - `password_reset_token` - Hashed single-use reset tokens
//! - `artwork` - Artworks and their sale state
//! - `artwork_like` - One row per (artwork, user) like
//! - `artwork_comment` - Comments, oldest first
//! - `cart_item` - One row per (user, artwork) cart line
//! - `order` / `order_item` - Orders and their line snapshots
//!
//! Storage is reached through the [`Store`] trait so services run unchanged
//! against `PostgreSQL` ([`PgStore`]) or the process-local [`MemoryStore`].
//!
//! # Deletion cascades
//!
//! - Deleting a user removes their artworks, cart, likes, comments and reset
//!   tokens. Their orders are kept with `user_id` cleared, and artworks they
//!   bought keep `sold` with the buyer cleared.
//! - Deleting an artwork removes its likes, comments and cart lines. Order
//!   lines are snapshots and are kept.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p brana-cli -- migrate
//! ```

pub mod artworks;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use brana_core::{ArtworkId, Email, OrderId, OrderStatus, Price, Role, UserId, Username};

use crate::models::{
    Artwork, ArtworkChanges, Cart, NewArtwork, NewOrder, NewUser, Order, OrderFilter,
    ProfileChanges, User,
};

pub use memory::MemoryStore;

/// Conflict message for a duplicate email.
pub const EMAIL_TAKEN: &str = "email already exists";
/// Conflict message for a duplicate username.
pub const USERNAME_TAKEN: &str = "username already exists";
/// Conflict message for a duplicate order number.
pub const ORDER_NUMBER_TAKEN: &str = "order number already exists";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Which artworks to list. Results are newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkFilter {
    All,
    /// Created by this artist (regardless of current owner).
    ByArtist(UserId),
    /// Bought by this user.
    PurchasedBy(UserId),
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account.
    ///
    /// Fails with `Conflict(EMAIL_TAKEN)` or `Conflict(USERNAME_TAKEN)`.
    async fn create_user(&self, new: &NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError>;

    /// Get a user along with their password hash, for login.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Apply a partial profile update. `None` if the user does not exist.
    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError>;

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, RepositoryError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn count_users(&self) -> Result<u64, RepositoryError>;

    /// Delete a user and cascade. Returns `false` if there was no such user.
    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Store a new reset token hash, replacing the user's unused ones.
    async fn create_reset_token(
        &self,
        user: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Consume a reset token and set the new password hash in one step.
    ///
    /// Returns the user whose password changed, or `None` if the token is
    /// unknown, already used or expired at `now`.
    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError>;
}

/// Artwork, like and comment storage.
///
/// Mutations return the updated artwork, or `None` when the artwork does not
/// exist or a stated precondition no longer holds.
#[async_trait]
pub trait ArtworkStore: Send + Sync {
    async fn create_artwork(&self, new: &NewArtwork) -> Result<Artwork, RepositoryError>;

    async fn get_artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError>;

    async fn list_artworks(&self, filter: ArtworkFilter) -> Result<Vec<Artwork>, RepositoryError>;

    async fn update_artwork(
        &self,
        id: ArtworkId,
        changes: &ArtworkChanges,
    ) -> Result<Option<Artwork>, RepositoryError>;

    /// Delete an artwork and cascade. Returns `false` if there was no such artwork.
    async fn delete_artwork(&self, id: ArtworkId) -> Result<bool, RepositoryError>;

    /// Add the user's like if absent, remove it if present.
    async fn toggle_like(
        &self,
        id: ArtworkId,
        user: UserId,
    ) -> Result<Option<Artwork>, RepositoryError>;

    async fn add_comment(
        &self,
        id: ArtworkId,
        user: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError>;

    /// Offer for sale at `price`, only if not sold.
    async fn list_for_sale(
        &self,
        id: ArtworkId,
        price: Price,
    ) -> Result<Option<Artwork>, RepositoryError>;

    /// Transfer to `buyer`, only if currently for sale and `buyer` is not the
    /// artist. Of two concurrent calls at most one succeeds.
    async fn mark_sold(
        &self,
        id: ArtworkId,
        buyer: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError>;

    async fn count_artworks(&self) -> Result<u64, RepositoryError>;
}

/// Cart storage.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart, lines in the order they were added.
    async fn get_cart(&self, user: UserId) -> Result<Cart, RepositoryError>;

    /// Add `quantity` to the line for `artwork`, creating it if needed. The
    /// summed line is clamped to `MAX_LINE_QUANTITY`.
    async fn add_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Set a line's quantity. Returns `false` if there is no such line.
    async fn set_cart_quantity(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<bool, RepositoryError>;

    /// Remove a line. Returns `false` if there was no such line.
    async fn remove_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
    ) -> Result<bool, RepositoryError>;

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order with its lines.
    ///
    /// Fails with `Conflict(ORDER_NUMBER_TAKEN)` on a duplicate order number.
    async fn create_order(&self, new: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError>;

    /// Set the status, only if the current status is in `only_from` (when given).
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        only_from: Option<&[OrderStatus]>,
    ) -> Result<Option<Order>, RepositoryError>;

    async fn mark_order_paid(
        &self,
        id: OrderId,
        transaction_ref: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    async fn set_tracking_number(
        &self,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Number of orders and the sum of their totals.
    async fn order_summary(&self) -> Result<(u64, Decimal), RepositoryError>;
}

/// Everything the services need from storage.
#[async_trait]
pub trait Store: UserStore + ArtworkStore + CartStore + OrderStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation to `Conflict(message)`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Convert a row count to `u64`.
pub(crate) fn count(n: i64) -> Result<u64, RepositoryError> {
    u64::try_from(n).map_err(|_| RepositoryError::DataCorruption(format!("negative count: {n}")))
}
