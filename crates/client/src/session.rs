//! Client-side session state.

use serde::{Deserialize, Serialize};

use brana_core::api::{AuthResponse, CartResponse, UserProfile};

use crate::cart::LocalCart;

/// Who is signed in, their token, and the local mirror of their cart.
///
/// Serializable so the host can persist it between runs. The cache is
/// replaced on sign-in, cleared on sign-out, and its cart is replaced by the
/// server's cart after every successful cart mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCache {
    token: Option<String>,
    user: Option<UserProfile>,
    cart: LocalCart,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the identity. The local cart is kept so it can be synced.
    pub fn sign_in(&mut self, auth: AuthResponse) {
        self.token = Some(auth.token);
        self.user = Some(auth.user);
    }

    /// Forget everything, including the cart.
    pub fn sign_out(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Update the cached profile after a profile edit.
    pub fn set_user(&mut self, user: UserProfile) {
        self.user = Some(user);
    }

    #[must_use]
    pub const fn cart(&self) -> &LocalCart {
        &self.cart
    }

    pub(crate) fn cart_mut(&mut self) -> &mut LocalCart {
        &mut self.cart
    }

    /// Take the server's cart as the truth.
    pub fn replace_cart(&mut self, cart: &CartResponse) {
        self.cart = LocalCart::from_response(cart);
    }

    /// # Errors
    ///
    /// Returns the serializer's error; not expected for this type.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a saved session.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use brana_core::ArtworkId;
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::CartCommand;

    #[test]
    fn test_sign_out_clears_cart() {
        let mut session = SessionCache::new();
        CartCommand::add(ArtworkId::new(1), "Meskel", Some(Decimal::from(100)), 1)
            .apply(session.cart_mut());
        assert!(!session.cart().is_empty());

        session.sign_out();
        assert!(session.cart().is_empty());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_persists_as_json() {
        let mut session = SessionCache::new();
        CartCommand::add(ArtworkId::new(3), "Lalibela", None, 2).apply(session.cart_mut());

        let json = session.to_json().unwrap();
        assert_eq!(SessionCache::from_json(&json).unwrap(), session);
    }
}
