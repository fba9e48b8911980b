//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /auth/register            - Create an account
//! POST   /auth/login               - Exchange credentials for a token
//! GET    /auth/profile             - Caller's profile
//! POST   /auth/forgot-password     - Send a reset link
//! POST   /auth/reset-password      - Set a new password with a reset token
//!
//! # Users
//! PUT    /users/profile            - Update caller's profile
//! GET    /users/{id}               - Profile (full for self/admin)
//! GET    /users/{id}/artworks      - An artist's works
//!
//! # Artworks
//! GET    /artworks                 - Catalog
//! POST   /artworks                 - Create
//! GET    /artworks/purchased       - Caller's purchases
//! GET    /artworks/{id}            - Detail
//! PUT    /artworks/{id}            - Edit (artist)
//! DELETE /artworks/{id}            - Delete (artist or admin)
//! PUT    /artworks/{id}/like       - Toggle like
//! POST   /artworks/{id}/comment    - Add comment
//! PUT    /artworks/{id}/sell       - List for sale (artist)
//! POST   /artworks/{id}/buy        - Buy outright
//!
//! # Cart
//! GET    /cart                     - Caller's cart
//! POST   /cart                     - Add line
//! DELETE /cart                     - Clear
//! PUT    /cart/{artwork_id}        - Set quantity
//! DELETE /cart/{artwork_id}        - Remove line
//! POST   /cart/sync                - Merge a guest cart
//!
//! # Orders
//! POST   /orders                   - Checkout
//! GET    /orders                   - Caller's orders
//! GET    /orders/{id}              - Detail (owner or admin)
//! PUT    /orders/{id}/cancel       - Cancel
//! PUT    /orders/{id}/pay          - Record payment
//!
//! # Admin
//! GET    /admin/users
//! PUT    /admin/users/{id}/role
//! DELETE /admin/users/{id}
//! GET    /admin/artworks
//! DELETE /admin/artworks/{id}
//! GET    /admin/orders
//! PUT    /admin/orders/{id}/status
//! PUT    /admin/orders/{id}/tracking
//! GET    /admin/stats
//! GET    /admin/sales-report
//! ```

pub mod admin;
pub mod artworks;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/profile", get(auth::profile))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(users::update_profile))
        .route("/{id}", get(users::show))
        .route("/{id}/artworks", get(users::artworks))
}

pub fn artwork_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(artworks::index).post(artworks::create))
        .route("/purchased", get(artworks::purchased))
        .route(
            "/{id}",
            get(artworks::show)
                .put(artworks::update)
                .delete(artworks::destroy),
        )
        .route("/{id}/like", put(artworks::like))
        .route("/{id}/comment", post(artworks::comment))
        .route("/{id}/sell", put(artworks::sell))
        .route("/{id}/buy", post(artworks::buy))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/sync", post(cart::sync))
        .route("/{artwork_id}", put(cart::update).delete(cart::remove))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", put(orders::cancel))
        .route("/{id}/pay", put(orders::pay))
}

pub fn admin_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/users", get(admin::users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/role", put(admin::update_role))
        .route("/artworks", get(admin::artworks))
        .route("/artworks/{id}", delete(admin::delete_artwork))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", put(admin::update_status))
        .route("/orders/{id}/tracking", put(admin::tracking))
        .route("/stats", get(admin::stats))
        .route("/sales-report", get(admin::sales_report))
}

/// Every API route except auth, which is rate limited separately.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/artworks", artwork_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}
