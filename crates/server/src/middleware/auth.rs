//! Bearer token middleware and extractors.
//!
//! [`bearer_auth_middleware`] verifies the `Authorization: Bearer` token when
//! one is present and records the outcome in request extensions. It never
//! rejects a request; the extractors below decide whether a route needs an
//! authenticated caller.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::Span;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthUser};
use crate::state::AppState;

/// Why a request carries no verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenProblem {
    Invalid,
    Expired,
}

/// Verify the bearer token, if any, and store the result for extractors.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.auth().authenticate(token) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
            }
            Err(AuthError::TokenExpired) => {
                request.extensions_mut().insert(TokenProblem::Expired);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                request.extensions_mut().insert(TokenProblem::Invalid);
            }
        }
    }

    next.run(request).await
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor that requires an authenticated caller.
///
/// Rejects with 401 if the token is missing, invalid, expired, or refers to
/// an account that no longer exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(identity) = parts.extensions.get::<AuthUser>() else {
            let message = match parts.extensions.get::<TokenProblem>() {
                Some(TokenProblem::Expired) => "Token expired",
                Some(TokenProblem::Invalid) => "Invalid token",
                None => "Authentication required",
            };
            return Err(AppError::Unauthorized(message.to_owned()));
        };

        let user = state.auth().resolve(identity).await.map_err(|e| match e {
            AuthError::UserNotFound => AppError::Unauthorized("Invalid token".to_owned()),
            other => AppError::Auth(other),
        })?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current caller.
///
/// Unlike `RequireAuth`, a missing or unusable token yields `None`.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.extensions.get::<AuthUser>().is_none() {
            return Ok(Self(None));
        }

        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(user)) => Ok(Self(Some(user))),
            Err(AppError::Unauthorized(_)) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}

/// Extractor that requires an authenticated admin.
///
/// Rejects with 401 when unauthenticated and 403 for non-admins.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}
