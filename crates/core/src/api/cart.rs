//! `/cart/*` bodies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::artworks::ArtworkResponse;
use crate::ArtworkId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineResponse {
    pub artwork: ArtworkResponse,
    pub quantity: u32,
    /// `price * quantity`, absent when the artwork has no price.
    pub line_total: Option<Decimal>,
}

/// The caller's cart with totals derived from the current lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub total_items: u32,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub artwork_id: ArtworkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSyncItem {
    pub artwork_id: ArtworkId,
    pub quantity: i64,
}

/// A guest cart to merge into the server cart after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCartRequest {
    pub items: Vec<CartSyncItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCartResponse {
    pub cart: CartResponse,
    /// Lines that could not be merged because the artwork is unavailable.
    pub skipped: Vec<ArtworkId>,
}
