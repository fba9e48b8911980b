//! Cart service.
//!
//! One cart per user. Every mutation returns the cart as it stands
//! afterwards, so totals are always derived from the current lines.

use tracing::instrument;

use brana_core::api::CartSyncItem;
use brana_core::pricing::MAX_LINE_QUANTITY;
use brana_core::ArtworkId;

use super::ServiceError;
use crate::db::{ArtworkStore, CartStore, Store};
use crate::models::{Cart, CurrentUser};

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The caller's cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn get(&self, actor: &CurrentUser) -> Result<Cart, ServiceError> {
        Ok(self.store.get_cart(actor.id).await?)
    }

    /// Add an artwork, summing with any existing line. Quantity defaults to 1
    /// and the summed line is clamped to `MAX_LINE_QUANTITY`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a quantity outside
    /// `1..=MAX_LINE_QUANTITY`, `ServiceError::NotFound` for an unknown
    /// artwork and `ServiceError::Conflict` if it is not for sale.
    #[instrument(skip(self), fields(user_id = %actor.id))]
    pub async fn add(
        &self,
        actor: &CurrentUser,
        artwork_id: ArtworkId,
        quantity: Option<i64>,
    ) -> Result<Cart, ServiceError> {
        let quantity = quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(ServiceError::Validation(
                "quantity must be at least 1".to_owned(),
            ));
        }
        let quantity = line_quantity(quantity)?;

        let artwork = self
            .store
            .get_artwork(artwork_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("artwork {artwork_id} not found")))?;
        if !artwork.listing.is_for_sale() {
            return Err(ServiceError::Conflict(
                "artwork is not available for purchase".to_owned(),
            ));
        }

        self.store
            .add_cart_item(actor.id, artwork_id, quantity)
            .await?;
        self.get(actor).await
    }

    /// Replace a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the cart has no such line and
    /// `ServiceError::Validation` for a quantity above `MAX_LINE_QUANTITY`.
    #[instrument(skip(self), fields(user_id = %actor.id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        artwork_id: ArtworkId,
        quantity: i64,
    ) -> Result<Cart, ServiceError> {
        if quantity <= 0 {
            return self.remove(actor, artwork_id).await;
        }
        let quantity = line_quantity(quantity)?;

        if !self
            .store
            .set_cart_quantity(actor.id, artwork_id, quantity)
            .await?
        {
            return Err(ServiceError::NotFound(format!(
                "artwork {artwork_id} is not in the cart"
            )));
        }
        self.get(actor).await
    }

    /// Remove a line. Removing an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn remove(
        &self,
        actor: &CurrentUser,
        artwork_id: ArtworkId,
    ) -> Result<Cart, ServiceError> {
        self.store.remove_cart_item(actor.id, artwork_id).await?;
        self.get(actor).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn clear(&self, actor: &CurrentUser) -> Result<Cart, ServiceError> {
        self.store.clear_cart(actor.id).await?;
        Ok(Cart::default())
    }

    /// Merge a guest cart into the caller's cart.
    ///
    /// Lines with a bad quantity or an artwork that is missing or not for
    /// sale are skipped and their artwork ids returned. Merged lines are
    /// clamped to `MAX_LINE_QUANTITY`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    #[instrument(skip(self, items), fields(user_id = %actor.id, lines = items.len()))]
    pub async fn sync(
        &self,
        actor: &CurrentUser,
        items: &[CartSyncItem],
    ) -> Result<(Cart, Vec<ArtworkId>), ServiceError> {
        let mut skipped = Vec::new();

        for item in items {
            let Ok(quantity) = line_quantity(item.quantity) else {
                skipped.push(item.artwork_id);
                continue;
            };
            if quantity == 0 {
                skipped.push(item.artwork_id);
                continue;
            }

            let available = self
                .store
                .get_artwork(item.artwork_id)
                .await?
                .is_some_and(|artwork| artwork.listing.is_for_sale());
            if !available {
                skipped.push(item.artwork_id);
                continue;
            }

            self.store
                .add_cart_item(actor.id, item.artwork_id, quantity)
                .await?;
        }

        if !skipped.is_empty() {
            tracing::debug!(skipped = skipped.len(), "Skipped unavailable cart lines");
        }
        Ok((self.get(actor).await?, skipped))
    }
}

fn line_quantity(quantity: i64) -> Result<u32, ServiceError> {
    if quantity > i64::from(MAX_LINE_QUANTITY) {
        return Err(ServiceError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    u32::try_from(quantity)
        .map_err(|_| ServiceError::Validation("quantity must not be negative".to_owned()))
}
