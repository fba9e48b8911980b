//! Signed bearer tokens.
//!
//! Tokens use the compact JWS layout (`header.claims.signature`, each part
//! base64url without padding) with HMAC-SHA256, so standard JWT tooling can
//! decode them. Only `HS256` is accepted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use brana_core::{Email, UserId};

const ALGORITHM: &str = "HS256";

/// Errors that can occur when issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not three base64url parts of valid JSON.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Header names an algorithm other than `HS256`.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature does not match.
    #[error("signature mismatch")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// Signing key rejected by HMAC.
    #[error("invalid signing key")]
    Key,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token payload.
///
/// At least one of `sub` and `email` is present in any verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issues and verifies bearer tokens with one secret.
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token for `user` valid from `now` for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the secret cannot key HMAC, or
    /// `TokenError::Malformed` if the claims cannot be encoded.
    pub fn issue(
        &self,
        user: UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: "JWT".to_owned(),
        };
        let claims = Claims {
            sub: Some(user),
            email: Some(email.as_str().to_owned()),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&signing_input)?);

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token's signature and expiry at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first check that fails, in order: structure, algorithm,
    /// signature, expiry, identity.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three parts".to_owned()));
        };

        let parsed: Header = decode_json(header)?;
        if parsed.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(parsed.alg));
        }

        let expected = URL_SAFE_NO_PAD.encode(self.sign(&format!("{header}.{claims}"))?);
        if !constant_time_compare(&expected, signature) {
            return Err(TokenError::BadSignature);
        }

        let claims: Claims = decode_json(claims)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_none() && claims.email.is_none() {
            return Err(TokenError::Malformed(
                "claims carry neither subject nor email".to_owned(),
            ));
        }

        Ok(claims)
    }

    fn sign(&self, input: &str) -> Result<Vec<u8>, TokenError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)?;
        mac.update(input.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Malformed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(SecretString::from(secret.to_owned()), Duration::hours(168))
    }

    fn email() -> Email {
        Email::parse("abebe@brana.art").unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7");
        let now = Utc::now();
        let token = signer.issue(UserId::new(42), &email(), now).unwrap();

        let claims = signer.verify(&token, now).unwrap();
        assert_eq!(claims.sub, Some(UserId::new(42)));
        assert_eq!(claims.email.as_deref(), Some("abebe@brana.art"));
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7");
        let issued = Utc::now() - Duration::hours(169);
        let token = signer.issue(UserId::new(1), &email(), issued).unwrap();

        assert!(matches!(
            signer.verify(&token, Utc::now()),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let token = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7")
            .issue(UserId::new(1), &email(), now)
            .unwrap();

        assert!(matches!(
            signer("a9B8c7D6e5F4g3H2i1J0k9L8m7N6o5P4").verify(&token, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7");
        let now = Utc::now();
        let token = signer.issue(UserId::new(1), &email(), now).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = Claims {
            sub: Some(UserId::new(2)),
            email: Some("admin@brana.art".to_owned()),
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let forged = format!("{}.{}.{}", parts[0], encode_json(&forged).unwrap(), parts[2]);

        assert!(matches!(
            signer.verify(&forged, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_anonymous_claims_rejected() {
        let signer = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7");
        let now = Utc::now();
        let header = encode_json(&Header {
            alg: ALGORITHM.to_owned(),
            typ: "JWT".to_owned(),
        })
        .unwrap();
        let claims = encode_json(&Claims {
            sub: None,
            email: None,
            iat: now.timestamp(),
            exp: now.timestamp() + 60,
        })
        .unwrap();
        let input = format!("{header}.{claims}");
        let signature = URL_SAFE_NO_PAD.encode(signer.sign(&input).unwrap());

        assert!(matches!(
            signer.verify(&format!("{input}.{signature}"), now),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer("k3J9#pQ2$vX8!mN4@rT6&wY1*zB5^cD7");
        let now = Utc::now();

        assert!(matches!(
            signer.verify("not-a-token", now),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            signer.verify("a.b.c.d", now),
            Err(TokenError::Malformed(_))
        ));

        let none_header = encode_json(&Header {
            alg: "none".to_owned(),
            typ: "JWT".to_owned(),
        })
        .unwrap();
        assert!(matches!(
            signer.verify(&format!("{none_header}.e30."), now),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
    }
}
