//! Order domain types.
//!
//! Order lines are snapshots taken at checkout: later changes to the artwork
//! (price, title, deletion) do not affect an existing order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use brana_core::api::{OrderLineResponse, OrderResponse, ShippingAddress};
use brana_core::{ArtworkId, OrderId, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus, UserId};

/// A line of an order, captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub artwork_id: ArtworkId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    /// `None` once the ordering account is deleted.
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }

    #[must_use]
    pub fn to_response(&self) -> OrderResponse {
        OrderResponse {
            id: self.id,
            order_number: self.order_number.clone(),
            user_id: self.user_id,
            items: self
                .items
                .iter()
                .map(|line| OrderLineResponse {
                    artwork_id: line.artwork_id,
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    subtotal: line.subtotal,
                })
                .collect(),
            subtotal: self.totals.subtotal,
            shipping_cost: self.totals.shipping_cost,
            tax: self.totals.tax,
            total: self.totals.total,
            shipping_address: self.shipping_address.clone(),
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            transaction_ref: self.transaction_ref.clone(),
            status: self.status,
            tracking_number: self.tracking_number.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Data for a new order. Status starts `pending`, payment `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Which orders to list. Results are newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user: Option<UserId>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
}

impl OrderFilter {
    #[must_use]
    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    /// Whether an order falls inside this filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.user.is_none_or(|user| order.user_id == Some(user))
            && self.created_from.is_none_or(|from| order.created_at >= from)
            && self
                .created_before
                .is_none_or(|before| order.created_at < before)
    }
}
