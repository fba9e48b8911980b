//! Order route handlers for buyers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use brana_core::OrderId;
use brana_core::api::{CreateOrderRequest, MarkPaidRequest, OrderResponse};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

/// Check out the caller's cart.
///
/// POST /orders
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let order = state.orders().create(&user, &req).await?;
    Ok((StatusCode::CREATED, Json(order.to_response())))
}

/// The caller's orders, newest first.
///
/// GET /orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state.orders().list_for_user(&user).await?;
    Ok(Json(orders.iter().map(Order::to_response).collect()))
}

/// GET /orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().get(&user, id).await?;
    Ok(Json(order.to_response()))
}

/// PUT /orders/{id}/cancel
#[instrument(skip(state, user), fields(user_id = %user.id, order_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().cancel(&user, id).await?;
    Ok(Json(order.to_response()))
}

/// Record a payment.
///
/// PUT /orders/{id}/pay
#[instrument(skip(state, user, req), fields(user_id = %user.id, order_id = %id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<MarkPaidRequest>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .mark_paid(&user, id, &req.transaction_ref)
        .await?;
    Ok(Json(order.to_response()))
}
