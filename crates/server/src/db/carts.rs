//! Cart storage for `PostgreSQL`.

use async_trait::async_trait;

use brana_core::pricing::MAX_LINE_QUANTITY;
use brana_core::{ArtworkId, UserId};

use super::{CartStore, PgStore, RepositoryError};
use crate::models::{Cart, CartLine};

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    artwork_id: i32,
    quantity: i32,
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT artwork_id, quantity FROM brana.cart_item \
             WHERE user_id = $1 ORDER BY added_at, artwork_id",
        )
        .bind(user)
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<ArtworkId> = rows.iter().map(|r| ArtworkId::new(r.artwork_id)).collect();
        let artworks = self.load_artworks(&ids).await?;

        let mut lines = Vec::with_capacity(rows.len());
        for artwork in artworks {
            let Some(row) = rows.iter().find(|r| r.artwork_id == artwork.id.as_i32()) else {
                continue;
            };
            let quantity = u32::try_from(row.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("invalid cart quantity: {}", row.quantity))
            })?;
            lines.push(CartLine { artwork, quantity });
        }

        Ok(Cart { lines })
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO brana.cart_item (user_id, artwork_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, artwork_id) \
             DO UPDATE SET quantity = LEAST(brana.cart_item.quantity + EXCLUDED.quantity, $4)",
        )
        .bind(user)
        .bind(artwork)
        .bind(to_db_quantity(quantity)?)
        .bind(to_db_quantity(MAX_LINE_QUANTITY)?)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE brana.cart_item SET quantity = $3 WHERE user_id = $1 AND artwork_id = $2",
        )
        .bind(user)
        .bind(artwork)
        .bind(to_db_quantity(quantity)?)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM brana.cart_item WHERE user_id = $1 AND artwork_id = $2")
                .bind(user)
                .bind(artwork)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM brana.cart_item WHERE user_id = $1")
            .bind(user)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}

pub(super) fn to_db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}
