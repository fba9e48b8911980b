//! Local cart mirror and optimistic cart commands.
//!
//! A [`CartCommand`] changes the [`LocalCart`] immediately and remembers how
//! to undo itself. [`CartController`] runs commands: guests stop at the
//! local change, signed-in users also hit the API, and the local cart is
//! either replaced by the server's answer or rolled back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use brana_core::ArtworkId;
use brana_core::api::{CartResponse, CartSyncItem, SyncCartRequest};
use brana_core::pricing::{MAX_LINE_QUANTITY, line_subtotal, saturating_sum};

use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::session::SessionCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalLine {
    pub artwork_id: ArtworkId,
    pub title: String,
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
}

/// The cart as the client currently believes it to be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCart {
    lines: Vec<LocalLine>,
}

impl LocalCart {
    #[must_use]
    pub fn from_response(cart: &CartResponse) -> Self {
        Self {
            lines: cart
                .items
                .iter()
                .map(|item| LocalLine {
                    artwork_id: item.artwork.id,
                    title: item.artwork.title.clone(),
                    unit_price: item.artwork.price,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[LocalLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn quantity_of(&self, artwork_id: ArtworkId) -> u32 {
        self.line(artwork_id).map_or(0, |l| l.quantity)
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of priced lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        saturating_sum(
            self.lines
                .iter()
                .filter_map(|l| l.unit_price.map(|p| line_subtotal(p, l.quantity))),
        )
    }

    /// The lines as a guest-cart sync request.
    #[must_use]
    pub fn to_sync_request(&self) -> SyncCartRequest {
        SyncCartRequest {
            items: self
                .lines
                .iter()
                .map(|l| CartSyncItem {
                    artwork_id: l.artwork_id,
                    quantity: i64::from(l.quantity),
                })
                .collect(),
        }
    }

    fn line(&self, artwork_id: ArtworkId) -> Option<&LocalLine> {
        self.lines.iter().find(|l| l.artwork_id == artwork_id)
    }

    fn set_quantity(&mut self, artwork_id: ArtworkId, quantity: u32) {
        if quantity == 0 {
            self.remove(artwork_id);
        } else if let Some(line) = self.lines.iter_mut().find(|l| l.artwork_id == artwork_id) {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
    }

    fn remove(&mut self, artwork_id: ArtworkId) {
        self.lines.retain(|l| l.artwork_id != artwork_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CartAction {
    Add {
        artwork_id: ArtworkId,
        title: String,
        unit_price: Option<Decimal>,
        quantity: u32,
    },
    SetQuantity {
        artwork_id: ArtworkId,
        quantity: u32,
    },
    Remove {
        artwork_id: ArtworkId,
    },
    Clear,
}

/// One reversible change to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartCommand {
    action: CartAction,
    before: Option<Vec<LocalLine>>,
}

impl CartCommand {
    const fn new(action: CartAction) -> Self {
        Self {
            action,
            before: None,
        }
    }

    /// Add `quantity` of an artwork, merging with an existing line.
    #[must_use]
    pub fn add(
        artwork_id: ArtworkId,
        title: impl Into<String>,
        unit_price: Option<Decimal>,
        quantity: u32,
    ) -> Self {
        Self::new(CartAction::Add {
            artwork_id,
            title: title.into(),
            unit_price,
            quantity,
        })
    }

    /// Set a line's quantity; zero removes it.
    #[must_use]
    pub const fn set_quantity(artwork_id: ArtworkId, quantity: u32) -> Self {
        Self::new(CartAction::SetQuantity {
            artwork_id,
            quantity,
        })
    }

    #[must_use]
    pub const fn remove(artwork_id: ArtworkId) -> Self {
        Self::new(CartAction::Remove { artwork_id })
    }

    #[must_use]
    pub const fn clear() -> Self {
        Self::new(CartAction::Clear)
    }

    /// Apply the change locally, remembering the previous lines.
    pub fn apply(&mut self, cart: &mut LocalCart) {
        self.before = Some(cart.lines.clone());

        match &self.action {
            CartAction::Add {
                artwork_id,
                title,
                unit_price,
                quantity,
            } => {
                let current = cart.quantity_of(*artwork_id);
                if current == 0 {
                    cart.lines.push(LocalLine {
                        artwork_id: *artwork_id,
                        title: title.clone(),
                        unit_price: *unit_price,
                        quantity: (*quantity).clamp(1, MAX_LINE_QUANTITY),
                    });
                } else {
                    cart.set_quantity(*artwork_id, current.saturating_add(*quantity));
                }
            }
            CartAction::SetQuantity {
                artwork_id,
                quantity,
            } => cart.set_quantity(*artwork_id, *quantity),
            CartAction::Remove { artwork_id } => cart.remove(*artwork_id),
            CartAction::Clear => cart.lines.clear(),
        }
    }

    /// Undo [`apply`](Self::apply). Does nothing if it was never applied.
    pub fn rollback(&mut self, cart: &mut LocalCart) {
        if let Some(lines) = self.before.take() {
            cart.lines = lines;
        }
    }

    async fn send(&self, client: &ApiClient, token: &str) -> Result<CartResponse> {
        match &self.action {
            CartAction::Add {
                artwork_id,
                quantity,
                ..
            } => {
                client
                    .add_to_cart(token, *artwork_id, Some(i64::from(*quantity)))
                    .await
            }
            CartAction::SetQuantity {
                artwork_id,
                quantity,
            } => {
                client
                    .update_cart_item(token, *artwork_id, i64::from(*quantity))
                    .await
            }
            CartAction::Remove { artwork_id } => client.remove_cart_item(token, *artwork_id).await,
            CartAction::Clear => client.clear_cart(token).await,
        }
    }
}

/// Runs cart commands against a session.
pub struct CartController {
    client: ApiClient,
    session: SessionCache,
}

impl CartController {
    #[must_use]
    pub const fn new(client: ApiClient, session: SessionCache) -> Self {
        Self { client, session }
    }

    #[must_use]
    pub const fn session(&self) -> &SessionCache {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> SessionCache {
        self.session
    }

    /// Apply `command` locally and, when signed in, on the server.
    ///
    /// # Errors
    ///
    /// Returns the API error after rolling the local cart back.
    pub async fn execute(&mut self, mut command: CartCommand) -> Result<()> {
        command.apply(self.session.cart_mut());

        let Some(token) = self.session.token().map(str::to_owned) else {
            return Ok(());
        };

        match command.send(&self.client, &token).await {
            Ok(cart) => {
                self.session.replace_cart(&cart);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Cart update rejected, rolling back");
                command.rollback(self.session.cart_mut());
                Err(e)
            }
        }
    }

    /// Sign in, then merge the guest cart into the server cart.
    ///
    /// Returns the artworks that could not be merged.
    ///
    /// # Errors
    ///
    /// Returns the API error from login or sync. A failed sync keeps the
    /// session signed in with the guest cart intact.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Vec<ArtworkId>> {
        let auth = self.client.login(email, password).await?;
        let token = auth.token.clone();
        self.session.sign_in(auth);

        if self.session.cart().is_empty() {
            self.refresh().await?;
            return Ok(Vec::new());
        }

        let request = self.session.cart().to_sync_request();
        let response = self.client.sync_cart(&token, &request).await?;
        if !response.skipped.is_empty() {
            debug!(skipped = response.skipped.len(), "Guest cart lines skipped");
        }
        self.session.replace_cart(&response.cart);
        Ok(response.skipped)
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
    }

    /// Reload the cart from the server.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` for guests, or the API error.
    pub async fn refresh(&mut self) -> Result<()> {
        let token = self
            .session
            .token()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)?;
        let cart = self.client.cart(&token).await?;
        self.session.replace_cart(&cart);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: i32) -> ArtworkId {
        ArtworkId::new(n)
    }

    fn cart_with(lines: &[(i32, u32)]) -> LocalCart {
        let mut cart = LocalCart::default();
        for (n, qty) in lines {
            CartCommand::add(id(*n), format!("Artwork {n}"), Some(Decimal::from(100)), *qty)
                .apply(&mut cart);
        }
        cart
    }

    #[test]
    fn test_add_merges_lines() {
        let cart = cart_with(&[(1, 1), (1, 2), (2, 1)]);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.quantity_of(id(1)), 3);
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Decimal::from(400));
    }

    #[test]
    fn test_quantity_is_capped() {
        let cart = cart_with(&[(1, 90), (1, 50)]);
        assert_eq!(cart.quantity_of(id(1)), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_total_price_saturates_on_huge_prices() {
        let mut cart = LocalCart::default();
        CartCommand::add(id(1), "Forged", Some(Decimal::MAX), 2).apply(&mut cart);
        CartCommand::add(id(2), "Real", Some(Decimal::from(100)), 1).apply(&mut cart);

        assert_eq!(cart.total_price(), Decimal::MAX);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = cart_with(&[(1, 2)]);
        CartCommand::set_quantity(id(1), 0).apply(&mut cart);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rollback_restores_previous_lines() {
        let mut cart = cart_with(&[(1, 2), (2, 1)]);
        let before = cart.clone();

        for mut command in [
            CartCommand::add(id(3), "New", None, 1),
            CartCommand::set_quantity(id(1), 5),
            CartCommand::remove(id(2)),
            CartCommand::clear(),
        ] {
            command.apply(&mut cart);
            assert_ne!(cart, before);
            command.rollback(&mut cart);
            assert_eq!(cart, before);
        }
    }

    #[test]
    fn test_rollback_without_apply_is_noop() {
        let mut cart = cart_with(&[(1, 1)]);
        let before = cart.clone();
        CartCommand::clear().rollback(&mut cart);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_unpriced_lines_excluded_from_total() {
        let mut cart = cart_with(&[(1, 1)]);
        CartCommand::add(id(2), "Unlisted", None, 3).apply(&mut cart);
        assert_eq!(cart.total_price(), Decimal::from(100));
        assert_eq!(cart.total_items(), 4);
    }

    #[test]
    fn test_sync_request_mirrors_lines() {
        let cart = cart_with(&[(1, 2), (4, 1)]);
        let request = cart.to_sync_request();
        assert_eq!(
            request.items,
            vec![
                CartSyncItem {
                    artwork_id: id(1),
                    quantity: 2
                },
                CartSyncItem {
                    artwork_id: id(4),
                    quantity: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_guest_commands_stay_local() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut controller = CartController::new(client, SessionCache::new());

        controller
            .execute(CartCommand::add(id(1), "Guest", Some(Decimal::from(10)), 1))
            .await
            .unwrap();

        assert_eq!(controller.session().cart().quantity_of(id(1)), 1);
        assert!(matches!(
            controller.refresh().await,
            Err(ClientError::NotAuthenticated)
        ));
    }
}
