//! Artwork route handlers: catalog, likes, comments, listing and buying.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use brana_core::ArtworkId;
use brana_core::api::{
    ArtworkResponse, CommentRequest, CreateArtworkRequest, MessageResponse, SellRequest,
    UpdateArtworkRequest,
};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::Artwork;
use crate::state::AppState;

fn many(artworks: &[Artwork]) -> Json<Vec<ArtworkResponse>> {
    Json(artworks.iter().map(Artwork::to_response).collect())
}

/// All artworks, newest first.
///
/// GET /artworks
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ArtworkResponse>>> {
    let artworks = state.catalog().list().await?;
    Ok(many(&artworks))
}

/// POST /artworks
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateArtworkRequest>,
) -> Result<(StatusCode, Json<ArtworkResponse>)> {
    let artwork = state.catalog().create(&user, &req).await?;
    Ok((StatusCode::CREATED, Json(artwork.to_response())))
}

/// Artworks the caller has bought.
///
/// GET /artworks/purchased
pub async fn purchased(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ArtworkResponse>>> {
    let artworks = state.catalog().list_purchased(&user).await?;
    Ok(many(&artworks))
}

/// GET /artworks/{id}
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Json<ArtworkResponse>> {
    let artwork = state.catalog().get(id).await?;
    Ok(Json(artwork.to_response()))
}

/// PUT /artworks/{id}
#[instrument(skip(state, user, req), fields(user_id = %user.id, artwork_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
    ApiJson(req): ApiJson<UpdateArtworkRequest>,
) -> Result<Json<ArtworkResponse>> {
    let artwork = state.catalog().update(&user, id, &req).await?;
    Ok(Json(artwork.to_response()))
}

/// DELETE /artworks/{id}
#[instrument(skip(state, user), fields(user_id = %user.id, artwork_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Json<MessageResponse>> {
    state.catalog().delete(&user, id).await?;
    Ok(Json(MessageResponse::new("Artwork deleted")))
}

/// Toggle the caller's like.
///
/// PUT /artworks/{id}/like
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Json<ArtworkResponse>> {
    let artwork = state.catalog().like(&user, id).await?;
    Ok(Json(artwork.to_response()))
}

/// POST /artworks/{id}/comment
#[instrument(skip(state, user, req), fields(user_id = %user.id, artwork_id = %id))]
pub async fn comment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> Result<(StatusCode, Json<ArtworkResponse>)> {
    let artwork = state.catalog().comment(&user, id, &req.text).await?;
    Ok((StatusCode::CREATED, Json(artwork.to_response())))
}

/// Put an artwork up for sale.
///
/// PUT /artworks/{id}/sell
#[instrument(skip(state, user, req), fields(user_id = %user.id, artwork_id = %id))]
pub async fn sell(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
    ApiJson(req): ApiJson<SellRequest>,
) -> Result<Json<ArtworkResponse>> {
    let artwork = state.catalog().list_for_sale(&user, id, req.price).await?;
    Ok(Json(artwork.to_response()))
}

/// Buy an artwork outright.
///
/// POST /artworks/{id}/buy
#[instrument(skip(state, user), fields(user_id = %user.id, artwork_id = %id))]
pub async fn buy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Json<ArtworkResponse>> {
    let artwork = state.catalog().buy(&user, id).await?;
    tracing::info!(buyer_id = %user.id, "Artwork sold");
    Ok(Json(artwork.to_response()))
}
