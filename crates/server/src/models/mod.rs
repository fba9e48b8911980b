//! Domain models for the marketplace.
//!
//! These are what the store traits return and what services reason about.
//! Conversions into the `brana_core::api` response types live beside each
//! model.

pub mod artwork;
pub mod cart;
pub mod order;
pub mod user;

pub use artwork::{Artwork, ArtworkChanges, Comment, Listing, NewArtwork};
pub use cart::{Cart, CartLine};
pub use order::{NewOrder, Order, OrderFilter, OrderLine};
pub use user::{CurrentUser, NewUser, ProfileChanges, User};
