//! Artwork, like and comment storage for `PostgreSQL`.
//!
//! Artworks are read in two steps: the artwork rows joined with their artist,
//! then likes and comments for all of those ids in one query each.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use brana_core::api::UserSummary;
use brana_core::{ArtworkId, Price, UserId};

use super::{ArtworkFilter, ArtworkStore, PgStore, RepositoryError, count};
use crate::models::{Artwork, ArtworkChanges, Comment, Listing, NewArtwork};

// =============================================================================
// Internal Row Types
// =============================================================================

const ARTWORK_SELECT: &str = "SELECT a.id, a.title, a.description, a.image_ref, a.artist_id, \
     u.username AS artist_username, u.display_name AS artist_display_name, \
     u.profile_picture AS artist_profile_picture, \
     a.price, a.for_sale, a.sold, a.buyer_id, a.sold_at, a.created_at, a.updated_at \
     FROM brana.artwork a JOIN brana.user u ON u.id = a.artist_id";

#[derive(Debug, sqlx::FromRow)]
struct ArtworkRow {
    id: i32,
    title: String,
    description: String,
    image_ref: String,
    artist_id: i32,
    artist_username: Option<String>,
    artist_display_name: Option<String>,
    artist_profile_picture: Option<String>,
    price: Option<Decimal>,
    for_sale: bool,
    sold: bool,
    buyer_id: Option<i32>,
    sold_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ArtworkRow {
    fn listing(&self) -> Result<Listing, RepositoryError> {
        let price = || {
            let amount = self.price.ok_or_else(|| {
                RepositoryError::DataCorruption(format!("artwork {} has no price", self.id))
            })?;
            Price::new(amount).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
            })
        };

        if self.sold {
            let sold_at = self.sold_at.ok_or_else(|| {
                RepositoryError::DataCorruption(format!("artwork {} sold without date", self.id))
            })?;
            Ok(Listing::Sold {
                price: price()?,
                buyer: self.buyer_id.map(UserId::new),
                sold_at,
            })
        } else if self.for_sale {
            Ok(Listing::ForSale { price: price()? })
        } else {
            Ok(Listing::Unlisted)
        }
    }

    fn into_artwork(
        self,
        liked_by: Vec<UserId>,
        comments: Vec<Comment>,
    ) -> Result<Artwork, RepositoryError> {
        let listing = self.listing()?;
        Ok(Artwork {
            id: ArtworkId::new(self.id),
            title: self.title,
            description: self.description,
            image_ref: self.image_ref,
            artist: UserSummary {
                id: UserId::new(self.artist_id),
                username: self.artist_username,
                display_name: self.artist_display_name,
                profile_picture: self.artist_profile_picture,
            },
            listing,
            liked_by,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LikeRow {
    artwork_id: i32,
    user_id: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    artwork_id: i32,
    user_id: i32,
    username: Option<String>,
    display_name: Option<String>,
    profile_picture: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
}

// =============================================================================
// Loading
// =============================================================================

impl PgStore {
    /// Attach likes and comments to artwork rows, preserving row order.
    async fn hydrate(&self, rows: Vec<ArtworkRow>) -> Result<Vec<Artwork>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let likes = sqlx::query_as::<_, LikeRow>(
            "SELECT artwork_id, user_id FROM brana.artwork_like \
             WHERE artwork_id = ANY($1) ORDER BY created_at, user_id",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT c.artwork_id, c.user_id, u.username, u.display_name, u.profile_picture, \
                    c.text, c.created_at \
             FROM brana.artwork_comment c JOIN brana.user u ON u.id = c.user_id \
             WHERE c.artwork_id = ANY($1) ORDER BY c.created_at, c.id",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut likes_by_artwork: HashMap<i32, Vec<UserId>> = HashMap::new();
        for like in likes {
            likes_by_artwork
                .entry(like.artwork_id)
                .or_default()
                .push(UserId::new(like.user_id));
        }

        let mut comments_by_artwork: HashMap<i32, Vec<Comment>> = HashMap::new();
        for c in comments {
            comments_by_artwork
                .entry(c.artwork_id)
                .or_default()
                .push(Comment {
                    author: UserSummary {
                        id: UserId::new(c.user_id),
                        username: c.username,
                        display_name: c.display_name,
                        profile_picture: c.profile_picture,
                    },
                    text: c.text,
                    created_at: c.created_at,
                });
        }

        rows.into_iter()
            .map(|row| {
                let liked_by = likes_by_artwork.remove(&row.id).unwrap_or_default();
                let comments = comments_by_artwork.remove(&row.id).unwrap_or_default();
                row.into_artwork(liked_by, comments)
            })
            .collect()
    }

    /// Load artworks by id, in the order given. Missing ids are skipped.
    pub(super) async fn load_artworks(
        &self,
        ids: &[ArtworkId],
    ) -> Result<Vec<Artwork>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ArtworkId::as_i32).collect();
        let rows = sqlx::query_as::<_, ArtworkRow>(&format!("{ARTWORK_SELECT} WHERE a.id = ANY($1)"))
            .bind(&raw)
            .fetch_all(self.pool())
            .await?;

        let mut by_id: HashMap<ArtworkId, Artwork> = self
            .hydrate(rows)
            .await?
            .into_iter()
            .map(|artwork| (artwork.id, artwork))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl ArtworkStore for PgStore {
    async fn create_artwork(&self, new: &NewArtwork) -> Result<Artwork, RepositoryError> {
        let price = new.listing.price().map(|price| price.amount());
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO brana.artwork (title, description, image_ref, artist_id, price, for_sale) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.image_ref)
        .bind(new.artist)
        .bind(price)
        .bind(new.listing.is_for_sale())
        .fetch_one(self.pool())
        .await?;

        self.get_artwork(ArtworkId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        Ok(self.load_artworks(&[id]).await?.pop())
    }

    async fn list_artworks(&self, filter: ArtworkFilter) -> Result<Vec<Artwork>, RepositoryError> {
        let order = "ORDER BY a.created_at DESC, a.id DESC";
        let rows = match filter {
            ArtworkFilter::All => {
                sqlx::query_as::<_, ArtworkRow>(&format!("{ARTWORK_SELECT} {order}"))
                    .fetch_all(self.pool())
                    .await?
            }
            ArtworkFilter::ByArtist(artist) => {
                sqlx::query_as::<_, ArtworkRow>(&format!(
                    "{ARTWORK_SELECT} WHERE a.artist_id = $1 {order}"
                ))
                .bind(artist)
                .fetch_all(self.pool())
                .await?
            }
            ArtworkFilter::PurchasedBy(buyer) => {
                sqlx::query_as::<_, ArtworkRow>(&format!(
                    "{ARTWORK_SELECT} WHERE a.sold AND a.buyer_id = $1 \
                     ORDER BY a.sold_at DESC, a.id DESC"
                ))
                .bind(buyer)
                .fetch_all(self.pool())
                .await?
            }
        };

        self.hydrate(rows).await
    }

    async fn update_artwork(
        &self,
        id: ArtworkId,
        changes: &ArtworkChanges,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE brana.artwork SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 image_ref = COALESCE($4, image_ref), \
                 updated_at = now() \
             WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.image_ref.as_deref())
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(_) => self.get_artwork(id).await,
            None => Ok(None),
        }
    }

    async fn delete_artwork(&self, id: ArtworkId) -> Result<bool, RepositoryError> {
        // Likes, comments and cart lines cascade; order lines hold no reference.
        let result = sqlx::query("DELETE FROM brana.artwork WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(
        &self,
        id: ArtworkId,
        user: UserId,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM brana.artwork WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query(
            "DELETE FROM brana.artwork_like WHERE artwork_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO brana.artwork_like (artwork_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(user)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_artwork(id).await
    }

    async fn add_comment(
        &self,
        id: ArtworkId,
        user: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO brana.artwork_comment (artwork_id, user_id, text, created_at) \
             SELECT id, $2, $3, $4 FROM brana.artwork WHERE id = $1",
        )
        .bind(id)
        .bind(user)
        .bind(text)
        .bind(at)
        .execute(self.pool())
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_artwork(id).await
    }

    async fn list_for_sale(
        &self,
        id: ArtworkId,
        price: Price,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE brana.artwork SET for_sale = TRUE, price = $2, updated_at = now() \
             WHERE id = $1 AND NOT sold RETURNING id",
        )
        .bind(id)
        .bind(price.amount())
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(_) => self.get_artwork(id).await,
            None => Ok(None),
        }
    }

    async fn mark_sold(
        &self,
        id: ArtworkId,
        buyer: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError> {
        // Of two concurrent buyers only the first matches this WHERE clause.
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE brana.artwork \
             SET sold = TRUE, for_sale = FALSE, buyer_id = $2, sold_at = $3, updated_at = now() \
             WHERE id = $1 AND for_sale AND NOT sold AND artist_id <> $2 \
             RETURNING id",
        )
        .bind(id)
        .bind(buyer)
        .bind(at)
        .fetch_optional(self.pool())
        .await?;

        match updated {
            Some(_) => self.get_artwork(id).await,
            None => Ok(None),
        }
    }

    async fn count_artworks(&self) -> Result<u64, RepositoryError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM brana.artwork")
            .fetch_one(self.pool())
            .await?;
        count(n)
    }
}
