//! Type-safe price representation using decimal arithmetic.
//!
//! Artwork prices are always positive amounts in Ethiopian birr. Order
//! arithmetic (subtotals, tax) works on plain [`Decimal`] values; a `Price`
//! is what an artwork can be listed for.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is zero or negative.
    #[error("price must be a positive number")]
    NotPositive,
    /// The amount does not fit a stored money column.
    #[error("price cannot exceed {}", crate::pricing::MAX_AMOUNT)]
    TooLarge,
    /// The amount has more than two decimal places.
    #[error("price cannot have more than {max} decimal places")]
    TooPrecise {
        /// Maximum allowed scale.
        max: u32,
    },
}

/// A positive listing price.
///
/// ```
/// use brana_core::Price;
/// use rust_decimal::Decimal;
///
/// assert!(Price::new(Decimal::new(100, 0)).is_ok());
/// assert!(Price::new(Decimal::ZERO).is_err());
/// assert!(Price::new(Decimal::new(-5, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of decimal places (santim).
    pub const MAX_SCALE: u32 = 2;

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` if `amount <= 0`,
    /// `PriceError::TooLarge` above [`MAX_AMOUNT`](crate::pricing::MAX_AMOUNT)
    /// and `PriceError::TooPrecise` if it has more than two decimal places.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount > crate::pricing::MAX_AMOUNT {
            return Err(PriceError::TooLarge);
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }
        Ok(Self(amount))
    }

    /// The amount in birr.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The currency every price is denominated in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        CurrencyCode::ETB
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency(), self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Ethiopian birr.
    #[default]
    ETB,
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ETB => write!(f, "ETB"),
        }
    }
}
