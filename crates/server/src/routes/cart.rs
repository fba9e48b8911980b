//! Cart route handlers. Every route needs an authenticated caller.

use axum::{Json, extract::State};
use tracing::instrument;

use brana_core::ArtworkId;
use brana_core::api::{
    AddToCartRequest, CartResponse, SyncCartRequest, SyncCartResponse, UpdateCartRequest,
};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// GET /cart
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().get(&user).await?;
    Ok(Json(cart.to_response()))
}

/// Add an artwork, or increase the quantity of an existing line.
///
/// POST /cart
#[instrument(skip(state, user, req), fields(user_id = %user.id, artwork_id = %req.artwork_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<AddToCartRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state
        .carts()
        .add(&user, req.artwork_id, req.quantity)
        .await?;
    Ok(Json(cart.to_response()))
}

/// Set a line's quantity. Zero or less removes the line.
///
/// PUT /cart/{artwork_id}
#[instrument(skip(state, user, req), fields(user_id = %user.id, artwork_id = %artwork_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(artwork_id): ApiPath<ArtworkId>,
    ApiJson(req): ApiJson<UpdateCartRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state
        .carts()
        .update(&user, artwork_id, req.quantity)
        .await?;
    Ok(Json(cart.to_response()))
}

/// DELETE /cart/{artwork_id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(artwork_id): ApiPath<ArtworkId>,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().remove(&user, artwork_id).await?;
    Ok(Json(cart.to_response()))
}

/// DELETE /cart
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().clear(&user).await?;
    Ok(Json(cart.to_response()))
}

/// Merge a guest cart into the caller's cart.
///
/// POST /cart/sync
#[instrument(skip(state, user, req), fields(user_id = %user.id, items = req.items.len()))]
pub async fn sync(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<SyncCartRequest>,
) -> Result<Json<SyncCartResponse>> {
    let (cart, skipped) = state.carts().sync(&user, &req.items).await?;

    if !skipped.is_empty() {
        tracing::info!(skipped = skipped.len(), "Skipped unavailable cart lines");
    }

    Ok(Json(SyncCartResponse {
        cart: cart.to_response(),
        skipped,
    }))
}
