//! Status enums for users and orders.
//!
//! All of these are stored as `TEXT` columns and travel as snake_case JSON
//! strings, so each one has a matching `as_str`/`FromStr` pair.

use serde::{Deserialize, Serialize};

/// Error returned when a status string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire/database spelling of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular artist/buyer account.
    #[default]
    User,
    /// Marketplace administrator.
    Admin,
}

string_enum!(Role, "role", { User => "user", Admin => "admin" });

/// Order fulfillment status.
///
/// Orders move `pending -> processing -> shipped -> delivered`; `cancelled`
/// is reachable only from `pending` or `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Statuses from which an order may still be cancelled.
    pub const CANCELLABLE: &'static [Self] = &[Self::Pending, Self::Processing];

    /// Whether an order in this status may be cancelled.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        Self::CANCELLABLE.contains(&self)
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

string_enum!(PaymentStatus, "payment status", { Pending => "pending", Paid => "paid" });

/// How the buyer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    MobileBanking,
    CashOnDelivery,
}

string_enum!(PaymentMethod, "payment method", {
    Card => "card",
    MobileBanking => "mobile_banking",
    CashOnDelivery => "cash_on_delivery",
});

impl PaymentMethod {
    /// Whether payment is captured by a follow-up `markPaid` call.
    ///
    /// Cash on delivery stays `pending` through fulfillment.
    #[must_use]
    pub const fn expects_capture(self) -> bool {
        !matches!(self, Self::CashOnDelivery)
    }
}
