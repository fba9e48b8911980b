//! Password reset tokens and their delivery.
//!
//! A reset token is 32 random bytes, hex-encoded, handed to the user once.
//! Only its SHA-256 digest is stored, so a leaked table cannot be replayed.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};

use brana_core::Email;

/// How long a reset token stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Generate a fresh reset token and its storage digest.
#[must_use]
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = hash_reset_token(&token);
    (token, digest)
}

/// Digest under which a reset token is stored.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Sends a reset link to the account's email address.
#[async_trait]
pub trait ResetDelivery: Send + Sync {
    /// Deliver `link` to `email`.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure; the reset request itself still
    /// succeeds from the caller's point of view.
    async fn deliver(&self, email: &Email, link: &str) -> Result<(), String>;
}

/// Writes reset links to the log.
///
/// For development and single-operator deployments without outbound email.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl ResetDelivery for LogDelivery {
    async fn deliver(&self, email: &Email, link: &str) -> Result<(), String> {
        tracing::info!(email = %email, link = %link, "Password reset link issued");
        Ok(())
    }
}

/// Keeps delivered links in memory so tooling and tests can read them back.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<(Email, String)>>,
}

impl MemoryOutbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent link sent to `email`.
    #[must_use]
    pub fn last_link_for(&self, email: &Email) -> Option<String> {
        self.sent
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, link)| link.clone())
    }

    /// Number of links sent so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().map_or(0, |sent| sent.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResetDelivery for MemoryOutbox {
    async fn deliver(&self, email: &Email, link: &str) -> Result<(), String> {
        self.sent
            .lock()
            .map_err(|e| e.to_string())?
            .push((email.clone(), link.to_owned()));
        Ok(())
    }
}

/// Extract the `token` query parameter from a reset link.
#[must_use]
pub fn token_from_link(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let (a, digest_a) = generate_reset_token();
        let (b, _) = generate_reset_token();

        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(hash_reset_token(&a), digest_a);
        assert_ne!(a, digest_a);
    }

    #[tokio::test]
    async fn test_outbox_keeps_latest_link() {
        let outbox = MemoryOutbox::new();
        let email = Email::parse("a@brana.art").unwrap();

        outbox
            .deliver(&email, "http://localhost:3000/reset-password?token=one")
            .await
            .unwrap();
        outbox
            .deliver(&email, "http://localhost:3000/reset-password?token=two")
            .await
            .unwrap();

        let link = outbox.last_link_for(&email).unwrap();
        assert_eq!(token_from_link(&link).as_deref(), Some("two"));
        assert_eq!(outbox.len(), 2);
    }
}
