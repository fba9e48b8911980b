//! Admin service.
//!
//! Every operation requires an admin caller.

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use brana_core::api::{DashboardStats, SalesReport, SalesReportQuery};
use brana_core::{ArtworkId, OrderStatus, Role, UserId};

use super::{ServiceError, ensure_admin};
use crate::db::{ArtworkFilter, ArtworkStore, OrderStore, Store, UserStore};
use crate::models::{Artwork, CurrentUser, Order, OrderFilter, User};

/// Orders in a date range with their aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    pub orders: Vec<Order>,
    pub pending_orders: u64,
    /// Orders that reached `delivered`.
    pub completed_orders: u64,
    pub total_revenue: Decimal,
}

impl SalesSummary {
    fn from_orders(orders: Vec<Order>) -> Self {
        let count = |status: OrderStatus| {
            orders.iter().filter(|o| o.status == status).count() as u64
        };
        Self {
            pending_orders: count(OrderStatus::Pending),
            completed_orders: count(OrderStatus::Delivered),
            total_revenue: orders.iter().map(|o| o.totals.total).sum(),
            orders,
        }
    }

    #[must_use]
    pub fn to_response(&self) -> SalesReport {
        SalesReport {
            orders: self.orders.iter().map(Order::to_response).collect(),
            total_orders: self.orders.len() as u64,
            pending_orders: self.pending_orders,
            completed_orders: self.completed_orders,
            total_revenue: self.total_revenue,
        }
    }
}

/// Admin service.
pub struct AdminService<'a> {
    store: &'a dyn Store,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn list_users(&self, actor: &CurrentUser) -> Result<Vec<User>, ServiceError> {
        ensure_admin(actor)?;
        Ok(self.store.list_users().await?)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` unless `role` is `user` or `admin`,
    /// `ServiceError::Conflict` if an admin tries to demote themselves, and
    /// `ServiceError::NotFound` for an unknown user.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn update_user_role(
        &self,
        actor: &CurrentUser,
        id: UserId,
        role: &str,
    ) -> Result<User, ServiceError> {
        ensure_admin(actor)?;
        let role = role
            .trim()
            .parse::<Role>()
            .map_err(|_| ServiceError::Validation("role must be 'user' or 'admin'".to_owned()))?;
        if id == actor.id && role != Role::Admin {
            return Err(ServiceError::Conflict(
                "you cannot remove your own admin role".to_owned(),
            ));
        }

        let user = self
            .store
            .set_role(id, role)
            .await?
            .ok_or_else(|| user_not_found(id))?;
        tracing::info!(user_id = %id, role = %role, "User role changed");
        Ok(user)
    }

    /// Delete a user and everything they own, keeping their orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if an admin tries to delete
    /// themselves and `ServiceError::NotFound` for an unknown user.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn delete_user(&self, actor: &CurrentUser, id: UserId) -> Result<(), ServiceError> {
        ensure_admin(actor)?;
        if id == actor.id {
            return Err(ServiceError::Conflict(
                "you cannot delete your own account".to_owned(),
            ));
        }

        if !self.store.delete_user(id).await? {
            return Err(user_not_found(id));
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    // =========================================================================
    // Artworks
    // =========================================================================

    /// Every artwork, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn list_all_artworks(
        &self,
        actor: &CurrentUser,
    ) -> Result<Vec<Artwork>, ServiceError> {
        ensure_admin(actor)?;
        Ok(self.store.list_artworks(ArtworkFilter::All).await?)
    }

    /// Remove an artwork regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown artwork.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn delete_artwork(
        &self,
        actor: &CurrentUser,
        id: ArtworkId,
    ) -> Result<(), ServiceError> {
        ensure_admin(actor)?;
        if !self.store.delete_artwork(id).await? {
            return Err(ServiceError::NotFound(format!("artwork {id} not found")));
        }
        tracing::info!(artwork_id = %id, "Artwork removed by admin");
        Ok(())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Marketplace totals, computed on demand.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn dashboard_stats(&self, actor: &CurrentUser) -> Result<DashboardStats, ServiceError> {
        ensure_admin(actor)?;
        let total_users = self.store.count_users().await?;
        let total_artworks = self.store.count_artworks().await?;
        let (total_orders, total_revenue) = self.store.order_summary().await?;

        Ok(DashboardStats {
            total_users,
            total_artworks,
            total_orders,
            total_revenue,
        })
    }

    /// Orders placed between `start_date` and `end_date`, both inclusive
    /// (UTC days). Either bound may be omitted.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the start is after the end.
    #[instrument(skip(self), fields(admin_id = %actor.id))]
    pub async fn sales_report(
        &self,
        actor: &CurrentUser,
        query: SalesReportQuery,
    ) -> Result<SalesSummary, ServiceError> {
        ensure_admin(actor)?;
        if let (Some(start), Some(end)) = (query.start_date, query.end_date)
            && start > end
        {
            return Err(ServiceError::Validation(
                "start date must not be after end date".to_owned(),
            ));
        }

        let filter = OrderFilter {
            user: None,
            created_from: query.start_date.map(start_of_day),
            created_before: query
                .end_date
                .and_then(|end| end.checked_add_days(Days::new(1)))
                .map(start_of_day),
        };
        let orders = self.store.list_orders(filter).await?;

        Ok(SalesSummary::from_orders(orders))
    }
}

fn start_of_day(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn user_not_found(id: UserId) -> ServiceError {
    ServiceError::NotFound(format!("user {id} not found"))
}
