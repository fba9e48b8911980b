//! Admin route handlers.
//!
//! Every handler takes `RequireAdmin`, so non-admins are turned away with 403
//! before a service is called. The services check the role again.

use axum::{Json, extract::State};
use tracing::instrument;

use brana_core::api::{
    ArtworkResponse, DashboardStats, MessageResponse, OrderResponse, SalesReport,
    SalesReportQuery, TrackingRequest, UpdateRoleRequest, UpdateStatusRequest, UserProfile,
};
use brana_core::{ArtworkId, OrderId, UserId};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{Artwork, Order, User};
use crate::state::AppState;

// =============================================================================
// Users
// =============================================================================

/// GET /admin/users
pub async fn users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<UserProfile>>> {
    let users = state.admin().list_users(&admin).await?;
    Ok(Json(users.iter().map(User::profile).collect()))
}

/// PUT /admin/users/{id}/role
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id, user_id = %id, role = %req.role))]
pub async fn update_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> Result<Json<UserProfile>> {
    let user = state.admin().update_user_role(&admin, id, &req.role).await?;
    Ok(Json(user.profile()))
}

/// DELETE /admin/users/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id, user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>> {
    state.admin().delete_user(&admin, id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

// =============================================================================
// Artworks
// =============================================================================

/// GET /admin/artworks
pub async fn artworks(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<ArtworkResponse>>> {
    let artworks = state.admin().list_all_artworks(&admin).await?;
    Ok(Json(artworks.iter().map(Artwork::to_response).collect()))
}

/// DELETE /admin/artworks/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id, artwork_id = %id))]
pub async fn delete_artwork(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ArtworkId>,
) -> Result<Json<MessageResponse>> {
    state.admin().delete_artwork(&admin, id).await?;
    Ok(Json(MessageResponse::new("Artwork deleted")))
}

// =============================================================================
// Orders
// =============================================================================

/// GET /admin/orders
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state.orders().list_all(&admin).await?;
    Ok(Json(orders.iter().map(Order::to_response).collect()))
}

/// PUT /admin/orders/{id}/status
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id, order_id = %id, status = %req.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .update_status(&admin, id, &req.status)
        .await?;
    Ok(Json(order.to_response()))
}

/// PUT /admin/orders/{id}/tracking
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id, order_id = %id))]
pub async fn tracking(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<TrackingRequest>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .add_tracking(&admin, id, &req.tracking_number)
        .await?;
    Ok(Json(order.to_response()))
}

// =============================================================================
// Reports
// =============================================================================

/// GET /admin/stats
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    Ok(Json(state.admin().dashboard_stats(&admin).await?))
}

/// Orders in an optional date range, with counts and revenue.
///
/// GET /admin/sales-report?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD
pub async fn sales_report(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<SalesReportQuery>,
) -> Result<Json<SalesReport>> {
    let summary = state.admin().sales_report(&admin, query).await?;
    Ok(Json(summary.to_response()))
}
