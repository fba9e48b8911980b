//! Client error type.

use thiserror::Error;

/// Errors from talking to the API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A success response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The base URL is not usable.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The operation needs a signed-in session.
    #[error("Not signed in")]
    NotAuthenticated,
}

impl ClientError {
    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API rejected the request with this status.
    #[must_use]
    pub fn is_status(&self, code: u16) -> bool {
        self.status() == Some(code)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
