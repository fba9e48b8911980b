//! Order total arithmetic.
//!
//! Totals are computed exactly once, when an order is created, and stored on
//! the order. Nothing recomputes them afterwards.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest amount a stored money field holds (`NUMERIC(12, 2)`):
/// 9 999 999 999.99 birr.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest quantity a single cart or order line may reach.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Order totals that cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("order total exceeds the largest storable amount")]
    TooLarge,
}

/// Flat shipping cost and tax rate applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    /// Flat shipping cost per order.
    pub shipping_cost: Decimal,
    /// Tax rate applied to the subtotal (0.15 = 15%).
    pub tax_rate: Decimal,
}

impl Default for OrderPricing {
    fn default() -> Self {
        Self {
            shipping_cost: Decimal::new(50, 0),
            tax_rate: Decimal::new(15, 2),
        }
    }
}

/// Computed money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderPricing {
    /// Compute totals for `(unit_price, quantity)` lines.
    ///
    /// `total == subtotal + shipping_cost + tax` always holds; tax is rounded
    /// half away from zero to two decimals.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::TooLarge` if the total would exceed
    /// [`MAX_AMOUNT`].
    pub fn totals<I>(&self, lines: I) -> Result<OrderTotals, PricingError>
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let mut subtotal = Decimal::ZERO;
        for (unit_price, quantity) in lines {
            subtotal = unit_price
                .checked_mul(Decimal::from(quantity))
                .and_then(|line| subtotal.checked_add(round_money(line)))
                .ok_or(PricingError::TooLarge)?;
        }
        let tax = round_money(
            subtotal
                .checked_mul(self.tax_rate)
                .ok_or(PricingError::TooLarge)?,
        );
        let shipping_cost = round_money(self.shipping_cost);
        let total = subtotal
            .checked_add(shipping_cost)
            .and_then(|t| t.checked_add(tax))
            .filter(|t| *t <= MAX_AMOUNT)
            .ok_or(PricingError::TooLarge)?;

        Ok(OrderTotals {
            subtotal,
            shipping_cost,
            tax,
            total,
        })
    }
}

/// Price of one order or cart line, saturating at `Decimal::MAX`.
#[must_use]
pub fn line_subtotal(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map_or(Decimal::MAX, round_money)
}

/// Sum of money amounts, saturating at `Decimal::MAX`.
#[must_use]
pub fn saturating_sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount).unwrap_or(Decimal::MAX)
    })
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
