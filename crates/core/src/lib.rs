//! BRANA Arts Core - Shared types library.
//!
//! This crate provides common types used across all BRANA Arts components:
//! - `server` - REST API for the marketplace
//! - `client` - Typed API client and client-side cache
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows the server and
//! the client to share one definition of every request and response.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`pricing`] - Order total arithmetic (subtotal, shipping, tax)
//! - [`api`] - Request/response bodies for every REST endpoint

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod pricing;
pub mod types;

pub use pricing::{OrderPricing, OrderTotals, PricingError};
pub use types::*;
