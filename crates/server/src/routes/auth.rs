//! Authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use brana_core::api::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    ResetPasswordRequest, UserProfile,
};

use crate::error::{Result, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Create an account.
///
/// POST /auth/register
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let user = state
        .auth()
        .register(
            &req.email,
            &req.password,
            req.username.as_deref(),
            req.display_name.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Exchange credentials for a bearer token.
///
/// POST /auth/login
#[instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (token, user) = state.auth().login(&req.email, &req.password).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: user.profile(),
    }))
}

/// The caller's own profile.
///
/// GET /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>> {
    let user = state.auth().profile(&user).await?;
    Ok(Json(user.profile()))
}

/// Send a password reset link. Always answers the same way.
///
/// POST /auth/forgot-password
#[instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state.auth().request_reset(&req.email).await?;

    Ok(Json(MessageResponse::new(
        "If an account exists for that email, a reset link has been sent",
    )))
}

/// Set a new password with a reset token.
///
/// POST /auth/reset-password
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth()
        .reset_password(&req.token, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset")))
}
