//! BRANA Arts client library.
//!
//! - [`ApiClient`] - typed access to every REST endpoint
//! - [`SessionCache`] - the signed-in user, their token and a local cart mirror
//! - [`CartController`] - optimistic cart updates through [`CartCommand`]s
//!
//! Guests keep a [`LocalCart`] only; once signed in, every cart command is
//! applied locally first, sent to the server, then reconciled with the
//! server's answer or rolled back.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod client;
pub mod error;
pub mod session;

pub use cart::{CartCommand, CartController, LocalCart, LocalLine};
pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use session::SessionCache;
