//! Artwork domain types.
//!
//! The sale lifecycle is a sum type so the invalid combinations of the flat
//! record (sold but still for sale, for sale without a price) cannot be
//! represented.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use brana_core::api::{ArtworkResponse, CommentResponse, UserSummary};
use brana_core::{ArtworkId, Price, UserId};

/// Where an artwork is in its sale lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Not offered for sale.
    Unlisted,
    /// Offered at a price.
    ForSale { price: Price },
    /// Bought; terminal. `buyer` is `None` once the buyer's account is gone.
    Sold {
        price: Price,
        buyer: Option<UserId>,
        sold_at: DateTime<Utc>,
    },
}

impl Listing {
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Unlisted => None,
            Self::ForSale { price } | Self::Sold { price, .. } => Some(*price),
        }
    }

    #[must_use]
    pub const fn is_for_sale(&self) -> bool {
        matches!(self, Self::ForSale { .. })
    }

    #[must_use]
    pub const fn is_sold(&self) -> bool {
        matches!(self, Self::Sold { .. })
    }
}

/// A comment on an artwork, author populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// An artwork with its artist, likes and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub id: ArtworkId,
    pub title: String,
    pub description: String,
    pub image_ref: String,
    pub artist: UserSummary,
    pub listing: Listing,
    /// Users who liked this artwork, oldest first. Never contains duplicates.
    pub liked_by: Vec<UserId>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artwork {
    /// The current owner: the buyer once sold, the artist before that.
    #[must_use]
    pub const fn owner(&self) -> Option<UserId> {
        match self.listing {
            Listing::Sold { buyer, .. } => buyer,
            Listing::Unlisted | Listing::ForSale { .. } => Some(self.artist.id),
        }
    }

    #[must_use]
    pub fn is_artist(&self, user: UserId) -> bool {
        self.artist.id == user
    }

    /// Unit price, if the artwork has ever been priced.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.listing.price().map(|price| price.amount())
    }

    #[must_use]
    pub fn likes(&self) -> u32 {
        u32::try_from(self.liked_by.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn to_response(&self) -> ArtworkResponse {
        let (buyer_id, sold_at) = match self.listing {
            Listing::Sold { buyer, sold_at, .. } => (buyer, Some(sold_at)),
            Listing::Unlisted | Listing::ForSale { .. } => (None, None),
        };

        ArtworkResponse {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            image_ref: self.image_ref.clone(),
            artist: self.artist.clone(),
            owner_id: self.owner(),
            price: self.price(),
            for_sale: self.listing.is_for_sale(),
            sold: self.listing.is_sold(),
            buyer_id,
            sold_at,
            likes: self.likes(),
            liked_by: self.liked_by.clone(),
            comments: self
                .comments
                .iter()
                .map(|c| CommentResponse {
                    user: c.author.clone(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect(),
            created_at: self.created_at,
        }
    }
}

/// Data for a new artwork.
#[derive(Debug, Clone)]
pub struct NewArtwork {
    pub artist: UserId,
    pub title: String,
    pub description: String,
    pub image_ref: String,
    /// `Unlisted` or `ForSale`; new artworks are never sold.
    pub listing: Listing,
}

/// Partial metadata update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_ref: Option<String>,
}
