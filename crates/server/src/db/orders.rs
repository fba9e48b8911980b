//! Order storage for `PostgreSQL`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use brana_core::api::ShippingAddress;
use brana_core::{ArtworkId, OrderId, OrderStatus, OrderTotals, UserId};

use super::carts::to_db_quantity;
use super::{ORDER_NUMBER_TAKEN, OrderStore, PgStore, RepositoryError, conflict_on_unique, count};
use crate::models::{NewOrder, Order, OrderFilter, OrderLine};

// =============================================================================
// Internal Row Types
// =============================================================================

const ORDER_COLUMNS: &str = "id, order_number, user_id, subtotal, shipping_cost, tax, total, \
     ship_full_name, ship_phone, ship_address, ship_city, ship_state, ship_zip_code, \
     ship_country, payment_method, payment_status, transaction_ref, status, tracking_number, \
     created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: Option<i32>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    ship_full_name: String,
    ship_phone: String,
    ship_address: String,
    ship_city: String,
    ship_state: String,
    ship_zip_code: String,
    ship_country: String,
    payment_method: String,
    payment_status: String,
    transaction_ref: Option<String>,
    status: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let corrupt = |e: brana_core::ParseStatusError| RepositoryError::DataCorruption(e.to_string());

        Ok(Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            user_id: self.user_id.map(UserId::new),
            items,
            totals: OrderTotals {
                subtotal: self.subtotal,
                shipping_cost: self.shipping_cost,
                tax: self.tax,
                total: self.total,
            },
            shipping_address: ShippingAddress {
                full_name: self.ship_full_name,
                phone: self.ship_phone,
                address: self.ship_address,
                city: self.ship_city,
                state: self.ship_state,
                zip_code: self.ship_zip_code,
                country: self.ship_country,
            },
            payment_method: self.payment_method.parse().map_err(corrupt)?,
            payment_status: self.payment_status.parse().map_err(corrupt)?,
            transaction_ref: self.transaction_ref,
            status: self.status.parse().map_err(corrupt)?,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    artwork_id: i32,
    title: String,
    quantity: i32,
    unit_price: Decimal,
    subtotal: Decimal,
}

impl TryFrom<OrderItemRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid order quantity: {}", row.quantity))
        })?;

        Ok(Self {
            artwork_id: ArtworkId::new(row.artwork_id),
            title: row.title,
            quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
        })
    }
}

// =============================================================================
// Loading
// =============================================================================

impl PgStore {
    /// Attach order lines to order rows, preserving row order.
    async fn hydrate_orders(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, artwork_id, title, quantity, unit_price, subtotal \
             FROM brana.order_item WHERE order_id = ANY($1) ORDER BY order_id, position",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut items_by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for item in items {
            let order_id = item.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(item.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn fetch_order(&self, row: Option<OrderRow>) -> Result<Option<Order>, RepositoryError> {
        match row {
            Some(row) => Ok(self.hydrate_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let address = &new.shipping_address;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO brana.order (order_number, user_id, subtotal, shipping_cost, tax, total, \
                 ship_full_name, ship_phone, ship_address, ship_city, ship_state, ship_zip_code, \
                 ship_country, payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING id",
        )
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(new.totals.subtotal)
        .bind(new.totals.shipping_cost)
        .bind(new.totals.tax)
        .bind(new.totals.total)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.address)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(&address.country)
        .bind(new.payment_method.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, ORDER_NUMBER_TAKEN))?;

        for (position, line) in (0_i32..).zip(&new.items) {
            sqlx::query(
                "INSERT INTO brana.order_item \
                     (order_id, position, artwork_id, title, quantity, unit_price, subtotal) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id)
            .bind(position)
            .bind(line.artwork_id)
            .bind(&line.title)
            .bind(to_db_quantity(line.quantity)?)
            .bind(line.unit_price)
            .bind(line.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_order(OrderId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM brana.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        self.fetch_order(row).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM brana.order WHERE TRUE"
        ));
        if let Some(user) = filter.user {
            qb.push(" AND user_id = ").push_bind(user);
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND created_at < ").push_bind(before);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool())
            .await?;

        self.hydrate_orders(rows).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        only_from: Option<&[OrderStatus]>,
    ) -> Result<Option<Order>, RepositoryError> {
        let allowed: Option<Vec<&str>> =
            only_from.map(|statuses| statuses.iter().map(OrderStatus::as_str).collect());

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE brana.order SET status = $2, updated_at = now() \
             WHERE id = $1 AND ($3::text[] IS NULL OR status = ANY($3)) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(allowed)
        .fetch_optional(self.pool())
        .await?;

        self.fetch_order(row).await
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        transaction_ref: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE brana.order \
             SET payment_status = 'paid', transaction_ref = $2, updated_at = now() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(transaction_ref)
        .fetch_optional(self.pool())
        .await?;

        self.fetch_order(row).await
    }

    async fn set_tracking_number(
        &self,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE brana.order SET tracking_number = $2, updated_at = now() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(tracking_number)
        .fetch_optional(self.pool())
        .await?;

        self.fetch_order(row).await
    }

    async fn order_summary(&self) -> Result<(u64, Decimal), RepositoryError> {
        let (n, revenue): (i64, Decimal) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(total), 0) FROM brana.order")
                .fetch_one(self.pool())
                .await?;

        Ok((count(n)?, revenue))
    }
}
