//! Profile route handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use brana_core::UserId;
use brana_core::api::{ArtworkResponse, PublicProfile, UpdateProfileRequest, UserProfile};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::Artwork;
use crate::state::AppState;

/// Update the caller's profile.
///
/// PUT /users/profile
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let updated = state.auth().update_profile(&user, &req).await?;
    Ok(Json(updated.profile()))
}

/// A profile as seen by the caller.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Full(UserProfile),
    Public(PublicProfile),
}

/// A user's profile.
///
/// The account owner and admins get the full profile, everyone else the
/// public part.
///
/// GET /users/{id}
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<ProfileView>> {
    let user = state.auth().public_profile(id).await?;

    let full = viewer.is_some_and(|v| v.id == user.id || v.is_admin());
    Ok(Json(if full {
        ProfileView::Full(user.profile())
    } else {
        ProfileView::Public(user.public_profile())
    }))
}

/// Artworks created by a user.
///
/// GET /users/{id}/artworks
pub async fn artworks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Vec<ArtworkResponse>>> {
    // 404 for unknown users rather than an empty list
    state.auth().public_profile(id).await?;

    let artworks = state.catalog().list_by_artist(id).await?;
    Ok(Json(artworks.iter().map(Artwork::to_response).collect()))
}
