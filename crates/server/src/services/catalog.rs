//! Artwork catalog service.
//!
//! Artwork CRUD, likes, comments and the direct (non-cart) sale path.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use brana_core::api::{CreateArtworkRequest, UpdateArtworkRequest};
use brana_core::{ArtworkId, Price, PriceError, UserId};

use super::{ServiceError, required_text};
use crate::db::{ArtworkFilter, ArtworkStore, Store};
use crate::models::{Artwork, ArtworkChanges, CurrentUser, Listing, NewArtwork};

const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_COMMENT_LENGTH: usize = 1000;

/// Artwork catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Create an artwork owned by the caller.
    ///
    /// A positive price lists it for sale immediately; no price, or a price
    /// of zero or less, leaves it unlisted.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a text field is blank or too
    /// long, or the price has sub-santim precision or is too large to store.
    #[instrument(skip(self, request), fields(user_id = %actor.id))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        request: &CreateArtworkRequest,
    ) -> Result<Artwork, ServiceError> {
        let title = bounded_text("title", &request.title, MAX_TITLE_LENGTH)?;
        let description =
            bounded_text("description", &request.description, MAX_DESCRIPTION_LENGTH)?;
        let image_ref = required_text("image", &request.image_ref)?;

        let listing = match request.price {
            Some(amount) if amount > Decimal::ZERO => Listing::ForSale {
                price: parse_price(amount)?,
            },
            _ => Listing::Unlisted,
        };

        let artwork = self
            .store
            .create_artwork(&NewArtwork {
                artist: actor.id,
                title,
                description,
                image_ref,
                listing,
            })
            .await?;

        tracing::info!(artwork_id = %artwork.id, "Artwork created");
        Ok(artwork)
    }

    /// All artworks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list(&self) -> Result<Vec<Artwork>, ServiceError> {
        Ok(self.store.list_artworks(ArtworkFilter::All).await?)
    }

    /// Artworks created by `artist`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_by_artist(&self, artist: UserId) -> Result<Vec<Artwork>, ServiceError> {
        Ok(self
            .store
            .list_artworks(ArtworkFilter::ByArtist(artist))
            .await?)
    }

    /// Artworks the caller has bought.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_purchased(&self, actor: &CurrentUser) -> Result<Vec<Artwork>, ServiceError> {
        Ok(self
            .store
            .list_artworks(ArtworkFilter::PurchasedBy(actor.id))
            .await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if there is no such artwork.
    pub async fn get(&self, id: ArtworkId) -> Result<Artwork, ServiceError> {
        self.store.get_artwork(id).await?.ok_or_else(|| not_found(id))
    }

    /// Edit an artwork's text fields. Artist only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Forbidden` if the
    /// caller is not the artist, or `ServiceError::Validation` for a blank
    /// supplied field.
    #[instrument(skip(self, request), fields(user_id = %actor.id, artwork_id = %id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: ArtworkId,
        request: &UpdateArtworkRequest,
    ) -> Result<Artwork, ServiceError> {
        let artwork = self.get(id).await?;
        if !artwork.is_artist(actor.id) {
            return Err(ServiceError::Forbidden(
                "only the artist can edit this artwork".to_owned(),
            ));
        }

        let changes = ArtworkChanges {
            title: request
                .title
                .as_deref()
                .map(|t| bounded_text("title", t, MAX_TITLE_LENGTH))
                .transpose()?,
            description: request
                .description
                .as_deref()
                .map(|d| bounded_text("description", d, MAX_DESCRIPTION_LENGTH))
                .transpose()?,
            image_ref: request
                .image_ref
                .as_deref()
                .map(|i| required_text("image", i))
                .transpose()?,
        };
        if changes == ArtworkChanges::default() {
            return Ok(artwork);
        }

        self.store
            .update_artwork(id, &changes)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Delete an artwork. Artist or admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    #[instrument(skip(self), fields(user_id = %actor.id, artwork_id = %id))]
    pub async fn delete(&self, actor: &CurrentUser, id: ArtworkId) -> Result<(), ServiceError> {
        let artwork = self.get(id).await?;
        if !artwork.is_artist(actor.id) && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "only the artist or an admin can delete this artwork".to_owned(),
            ));
        }

        if !self.store.delete_artwork(id).await? {
            return Err(not_found(id));
        }
        tracing::info!("Artwork deleted");
        Ok(())
    }

    /// Toggle the caller's like.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if there is no such artwork.
    pub async fn like(&self, actor: &CurrentUser, id: ArtworkId) -> Result<Artwork, ServiceError> {
        self.store
            .toggle_like(id, actor.id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Append a comment.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for blank or overlong text and
    /// `ServiceError::NotFound` if there is no such artwork.
    pub async fn comment(
        &self,
        actor: &CurrentUser,
        id: ArtworkId,
        text: &str,
    ) -> Result<Artwork, ServiceError> {
        let text = bounded_text("comment", text, MAX_COMMENT_LENGTH)?;

        self.store
            .add_comment(id, actor.id, &text, Utc::now())
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Offer an artwork for sale at `price`. Artist only.
    ///
    /// # Errors
    ///
    /// In order: `ServiceError::NotFound`, `ServiceError::Forbidden` if the
    /// caller is not the artist, `ServiceError::Validation` for a price that
    /// is not positive or too large to store, `ServiceError::Conflict` if
    /// already sold.
    #[instrument(skip(self), fields(user_id = %actor.id, artwork_id = %id))]
    pub async fn list_for_sale(
        &self,
        actor: &CurrentUser,
        id: ArtworkId,
        price: Decimal,
    ) -> Result<Artwork, ServiceError> {
        let artwork = self.get(id).await?;
        if !artwork.is_artist(actor.id) {
            return Err(ServiceError::Forbidden(
                "only the artist can sell this artwork".to_owned(),
            ));
        }
        let price = parse_price(price)?;
        if artwork.listing.is_sold() {
            return Err(already_sold());
        }

        let artwork = self
            .store
            .list_for_sale(id, price)
            .await?
            .ok_or_else(already_sold)?;

        tracing::info!(price = %price, "Artwork listed for sale");
        Ok(artwork)
    }

    /// Buy an artwork outright, outside the cart.
    ///
    /// # Errors
    ///
    /// In order: `ServiceError::NotFound`, `ServiceError::Conflict` if the
    /// artwork is not for sale (or already sold), `ServiceError::Forbidden`
    /// if the buyer is the artist. A concurrent buyer who loses the race
    /// receives `ServiceError::Conflict`.
    #[instrument(skip(self), fields(user_id = %actor.id, artwork_id = %id))]
    pub async fn buy(&self, actor: &CurrentUser, id: ArtworkId) -> Result<Artwork, ServiceError> {
        let artwork = self.get(id).await?;
        if artwork.listing.is_sold() {
            return Err(already_sold());
        }
        if !artwork.listing.is_for_sale() {
            return Err(ServiceError::Conflict(
                "artwork is not for sale".to_owned(),
            ));
        }
        if artwork.is_artist(actor.id) {
            return Err(ServiceError::Forbidden(
                "you cannot buy your own artwork".to_owned(),
            ));
        }

        let artwork = self
            .store
            .mark_sold(id, actor.id, Utc::now())
            .await?
            .ok_or_else(already_sold)?;

        tracing::info!("Artwork sold");
        Ok(artwork)
    }
}

fn parse_price(amount: Decimal) -> Result<Price, ServiceError> {
    Price::new(amount).map_err(|e| match e {
        PriceError::NotPositive => {
            ServiceError::Validation("price must be greater than zero".to_owned())
        }
        PriceError::TooLarge | PriceError::TooPrecise { .. } => {
            ServiceError::Validation(e.to_string())
        }
    })
}

fn bounded_text(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let value = required_text(field, value)?;
    if value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

fn not_found(id: ArtworkId) -> ServiceError {
    ServiceError::NotFound(format!("artwork {id} not found"))
}

fn already_sold() -> ServiceError {
    ServiceError::Conflict("artwork is already sold".to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brana_core::{Email, Role};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewUser;

    async fn account(store: &MemoryStore, email: &str, role: Role) -> CurrentUser {
        let user = store
            .create_user(&NewUser {
                email: Email::parse(email).unwrap(),
                username: None,
                display_name: None,
                password_hash: "hash".to_owned(),
                role,
            })
            .await
            .unwrap();
        CurrentUser::from(&user)
    }

    fn request(price: Option<i64>) -> CreateArtworkRequest {
        CreateArtworkRequest {
            title: "Sunset".to_owned(),
            description: "Over the Simien mountains".to_owned(),
            image_ref: "img1".to_owned(),
            price: price.map(|p| Decimal::new(p, 0)),
        }
    }

    #[tokio::test]
    async fn test_create_sets_listing_from_price() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);

        let priced = catalog.create(&artist, &request(Some(100))).await.unwrap();
        assert!(priced.listing.is_for_sale());
        assert_eq!(priced.price(), Some(Decimal::new(100, 0)));

        let unpriced = catalog.create(&artist, &request(None)).await.unwrap();
        assert_eq!(unpriced.listing, Listing::Unlisted);

        let zero = catalog.create(&artist, &request(Some(0))).await.unwrap();
        assert_eq!(zero.listing, Listing::Unlisted);
    }

    #[tokio::test]
    async fn test_create_requires_text_fields() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);

        let mut blank = request(None);
        blank.title = "   ".to_owned();
        assert!(matches!(
            catalog.create(&artist, &blank).await,
            Err(ServiceError::Validation(_))
        ));

        let mut blank = request(None);
        blank.image_ref = String::new();
        assert!(matches!(
            catalog.create(&artist, &blank).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_prices_are_rejected() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);

        let mut huge = request(None);
        huge.price = Some(Decimal::MAX);
        assert!(matches!(
            catalog.create(&artist, &huge).await,
            Err(ServiceError::Validation(_))
        ));

        let artwork = catalog.create(&artist, &request(None)).await.unwrap();
        assert!(matches!(
            catalog
                .list_for_sale(&artist, artwork.id, Decimal::new(1_000_000_000_000, 2))
                .await,
            Err(ServiceError::Validation(_))
        ));

        let largest = catalog
            .list_for_sale(&artist, artwork.id, brana_core::pricing::MAX_AMOUNT)
            .await
            .unwrap();
        assert_eq!(largest.price(), Some(brana_core::pricing::MAX_AMOUNT));
    }

    #[tokio::test]
    async fn test_like_twice_restores_state() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let fan = account(&store, "fan@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);
        let artwork = catalog.create(&artist, &request(None)).await.unwrap();

        let liked = catalog.like(&fan, artwork.id).await.unwrap();
        assert_eq!(liked.likes(), 1);
        assert_eq!(liked.liked_by, vec![fan.id]);

        let unliked = catalog.like(&fan, artwork.id).await.unwrap();
        assert_eq!(unliked.likes(), artwork.likes());
        assert_eq!(unliked.liked_by, artwork.liked_by);

        assert!(matches!(
            catalog.like(&fan, ArtworkId::new(999)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);
        let artwork = catalog.create(&artist, &request(None)).await.unwrap();

        assert!(matches!(
            catalog.comment(&artist, artwork.id, "  ").await,
            Err(ServiceError::Validation(_))
        ));

        let commented = catalog
            .comment(&artist, artwork.id, "Finished last week")
            .await
            .unwrap();
        assert_eq!(commented.comments.len(), 1);
        assert_eq!(commented.comments[0].author.id, artist.id);
    }

    #[tokio::test]
    async fn test_list_for_sale_rules() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let other = account(&store, "other@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);
        let artwork = catalog.create(&artist, &request(None)).await.unwrap();

        assert!(matches!(
            catalog
                .list_for_sale(&other, artwork.id, Decimal::new(10, 0))
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            catalog.list_for_sale(&artist, artwork.id, Decimal::ZERO).await,
            Err(ServiceError::Validation(_))
        ));

        let listed = catalog
            .list_for_sale(&artist, artwork.id, Decimal::new(75, 0))
            .await
            .unwrap();
        assert!(listed.listing.is_for_sale());

        catalog.buy(&other, artwork.id).await.unwrap();
        assert!(matches!(
            catalog
                .list_for_sale(&artist, artwork.id, Decimal::new(80, 0))
                .await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_buy_rules() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let buyer = account(&store, "buyer@brana.art", Role::User).await;
        let late = account(&store, "late@brana.art", Role::User).await;
        let catalog = CatalogService::new(&store);

        let unlisted = catalog.create(&artist, &request(None)).await.unwrap();
        assert!(matches!(
            catalog.buy(&buyer, unlisted.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let listed = catalog.create(&artist, &request(Some(100))).await.unwrap();
        assert!(matches!(
            catalog.buy(&artist, listed.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let sold = catalog.buy(&buyer, listed.id).await.unwrap();
        assert!(sold.listing.is_sold());
        assert!(!sold.listing.is_for_sale());
        assert_eq!(sold.owner(), Some(buyer.id));
        assert_eq!(sold.artist.id, artist.id);

        assert!(matches!(
            catalog.buy(&late, listed.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let purchased = catalog.list_purchased(&buyer).await.unwrap();
        assert_eq!(purchased.len(), 1);
        assert_eq!(purchased[0].id, listed.id);
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let store = MemoryStore::new();
        let artist = account(&store, "artist@brana.art", Role::User).await;
        let other = account(&store, "other@brana.art", Role::User).await;
        let admin = account(&store, "admin@brana.art", Role::Admin).await;
        let catalog = CatalogService::new(&store);
        let artwork = catalog.create(&artist, &request(None)).await.unwrap();

        let edit = UpdateArtworkRequest {
            title: Some("Dawn".to_owned()),
            ..UpdateArtworkRequest::default()
        };
        assert!(matches!(
            catalog.update(&other, artwork.id, &edit).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = catalog.update(&artist, artwork.id, &edit).await.unwrap();
        assert_eq!(updated.title, "Dawn");
        assert_eq!(updated.description, artwork.description);

        assert!(matches!(
            catalog.delete(&other, artwork.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        catalog.delete(&admin, artwork.id).await.unwrap();
        assert!(matches!(
            catalog.get(artwork.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
