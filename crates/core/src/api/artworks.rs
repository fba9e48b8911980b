//! `/artworks/*` bodies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ArtworkId, UserId};

/// Compact user reference embedded in artworks and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub user: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// An artwork with its artist populated.
///
/// `artist` is provenance and never changes; `ownerId` is the buyer once the
/// artwork is sold and the artist before that. A sold artwork whose buyer
/// account was deleted has no owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkResponse {
    pub id: ArtworkId,
    pub title: String,
    pub description: String,
    pub image_ref: String,
    pub artist: UserSummary,
    pub owner_id: Option<UserId>,
    pub price: Option<Decimal>,
    pub for_sale: bool,
    pub sold: bool,
    pub buyer_id: Option<UserId>,
    pub sold_at: Option<DateTime<Utc>>,
    pub likes: u32,
    pub liked_by: Vec<UserId>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtworkRequest {
    pub title: String,
    pub description: String,
    pub image_ref: String,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Artwork edits by the artist. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtworkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellRequest {
    pub price: Decimal,
}
