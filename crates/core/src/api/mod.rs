//! Request and response bodies for the REST API.
//!
//! Every endpoint has an explicit body type here; the server deserializes
//! requests into them and the client deserializes responses from them. All
//! fields travel as camelCase JSON.
//!
//! Request types carry raw strings and numbers rather than validated newtypes
//! so that a malformed value is reported by the service layer as a
//! validation error with a readable message, instead of a generic JSON
//! rejection.

pub mod admin;
pub mod artworks;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod users;

use serde::{Deserialize, Serialize};

pub use admin::*;
pub use artworks::*;
pub use auth::*;
pub use cart::*;
pub use orders::*;
pub use users::*;

/// Body of every error response, and of acknowledgements with no payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Create a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
