//! Cart domain types.

use rust_decimal::Decimal;

use brana_core::api::{CartLineResponse, CartResponse};
use brana_core::pricing::{line_subtotal, saturating_sum};

use super::Artwork;

/// One artwork in a cart, artwork populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub artwork: Artwork,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// `price * quantity`, or `None` for an unpriced artwork.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.artwork
            .price()
            .map(|price| line_subtotal(price, self.quantity))
    }
}

/// A user's cart. Each artwork appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals; unpriced lines contribute nothing.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        saturating_sum(self.lines.iter().filter_map(CartLine::line_total))
    }

    #[must_use]
    pub fn to_response(&self) -> CartResponse {
        CartResponse {
            items: self
                .lines
                .iter()
                .map(|line| CartLineResponse {
                    artwork: line.artwork.to_response(),
                    quantity: line.quantity,
                    line_total: line.line_total(),
                })
                .collect(),
            total_items: self.total_items(),
            total_price: self.total_price(),
        }
    }
}
