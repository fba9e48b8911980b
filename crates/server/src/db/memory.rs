//! Process-local store.
//!
//! Holds every record behind one `RwLock`, so each trait method is atomic
//! with respect to the others. Used for tests and `BRANA_IN_MEMORY` runs;
//! nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use brana_core::api::UserSummary;
use brana_core::pricing::MAX_LINE_QUANTITY;
use brana_core::{
    ArtworkId, Email, OrderId, OrderStatus, PaymentStatus, Price, Role, UserId, Username,
};

use super::{
    ArtworkFilter, ArtworkStore, CartStore, EMAIL_TAKEN, ORDER_NUMBER_TAKEN, OrderStore,
    RepositoryError, Store, USERNAME_TAKEN, UserStore,
};
use crate::models::{
    Artwork, ArtworkChanges, Cart, CartLine, Comment, Listing, NewArtwork, NewOrder, NewUser,
    Order, OrderFilter, ProfileChanges, User,
};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct ResetTokenRecord {
    user: UserId,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used: bool,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    author: UserId,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ArtworkRecord {
    id: ArtworkId,
    title: String,
    description: String,
    image_ref: String,
    artist: UserId,
    listing: Listing,
    liked_by: Vec<UserId>,
    comments: Vec<CommentRecord>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    next_user: i32,
    next_artwork: i32,
    next_order: i32,
    users: BTreeMap<UserId, UserRecord>,
    reset_tokens: Vec<ResetTokenRecord>,
    artworks: BTreeMap<ArtworkId, ArtworkRecord>,
    /// Lines per user, in the order they were added.
    carts: HashMap<UserId, Vec<(ArtworkId, u32)>>,
    orders: BTreeMap<OrderId, Order>,
}

impl State {
    fn summary(&self, id: UserId) -> UserSummary {
        self.users.get(&id).map_or_else(
            || UserSummary {
                id,
                username: None,
                display_name: None,
                profile_picture: None,
            },
            |record| record.user.summary(),
        )
    }

    fn artwork(&self, record: &ArtworkRecord) -> Artwork {
        Artwork {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            image_ref: record.image_ref.clone(),
            artist: self.summary(record.artist),
            listing: record.listing,
            liked_by: record.liked_by.clone(),
            comments: record
                .comments
                .iter()
                .map(|c| Comment {
                    author: self.summary(c.author),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn get_artwork(&self, id: ArtworkId) -> Option<Artwork> {
        self.artworks.get(&id).map(|record| self.artwork(record))
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| &r.user.email == email && Some(r.user.id) != except)
    }

    fn username_taken(&self, username: &Username, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| r.user.username.as_ref() == Some(username) && Some(r.user.id) != except)
    }

    fn remove_artwork(&mut self, id: ArtworkId) -> bool {
        if self.artworks.remove(&id).is_none() {
            return false;
        }
        for lines in self.carts.values_mut() {
            lines.retain(|(artwork, _)| *artwork != id);
        }
        true
    }
}

/// In-memory implementation of [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.email_taken(&new.email, None) {
            return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_owned()));
        }
        if let Some(username) = &new.username
            && state.username_taken(username, None)
        {
            return Err(RepositoryError::Conflict(USERNAME_TAKEN.to_owned()));
        }

        state.next_user += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_user),
            email: new.email.clone(),
            username: new.username.clone(),
            display_name: new.display_name.clone(),
            bio: None,
            profile_picture: None,
            phone: None,
            studio_address: None,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new.password_hash.clone(),
            },
        );
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|r| r.user.username.as_ref() == Some(username))
            .map(|r| r.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(Some(username)) = &changes.username
            && state.username_taken(username, Some(id))
        {
            return Err(RepositoryError::Conflict(USERNAME_TAKEN.to_owned()));
        }
        let Some(record) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(&mut record.user);
        record.user.updated_at = Utc::now();
        Ok(Some(record.user.clone()))
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        record.user.role = role;
        record.user.updated_at = Utc::now();
        Ok(Some(record.user.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().map(|r| r.user.clone()).collect();
        newest_first(&mut users, |u| (u.created_at, u.id.as_i32()));
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.read().await.users.len() as u64)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let authored: Vec<ArtworkId> = state
            .artworks
            .values()
            .filter(|a| a.artist == id)
            .map(|a| a.id)
            .collect();
        for artwork in authored {
            state.remove_artwork(artwork);
        }
        for artwork in state.artworks.values_mut() {
            artwork.liked_by.retain(|user| *user != id);
            artwork.comments.retain(|c| c.author != id);
            if let Listing::Sold { buyer, .. } = &mut artwork.listing
                && *buyer == Some(id)
            {
                *buyer = None;
            }
        }
        state.carts.remove(&id);
        state.reset_tokens.retain(|t| t.user != id);
        for order in state.orders.values_mut() {
            if order.user_id == Some(id) {
                order.user_id = None;
            }
        }
        Ok(true)
    }

    async fn create_reset_token(
        &self,
        user: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.reset_tokens.retain(|t| t.user != user || t.used);
        state.reset_tokens.push(ResetTokenRecord {
            user,
            token_hash: token_hash.to_owned(),
            expires_at,
            used: false,
        });
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(token) = state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && !t.used && t.expires_at > now)
        else {
            return Ok(None);
        };
        token.used = true;
        let user = token.user;

        let Some(record) = state.users.get_mut(&user) else {
            return Ok(None);
        };
        password_hash.clone_into(&mut record.password_hash);
        record.user.updated_at = now;
        Ok(Some(user))
    }
}

#[async_trait]
impl ArtworkStore for MemoryStore {
    async fn create_artwork(&self, new: &NewArtwork) -> Result<Artwork, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.artist) {
            return Err(RepositoryError::NotFound);
        }
        state.next_artwork += 1;
        let now = Utc::now();
        let record = ArtworkRecord {
            id: ArtworkId::new(state.next_artwork),
            title: new.title.clone(),
            description: new.description.clone(),
            image_ref: new.image_ref.clone(),
            artist: new.artist,
            listing: new.listing,
            liked_by: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let artwork = state.artwork(&record);
        state.artworks.insert(record.id, record);
        Ok(artwork)
    }

    async fn get_artwork(&self, id: ArtworkId) -> Result<Option<Artwork>, RepositoryError> {
        Ok(self.state.read().await.get_artwork(id))
    }

    async fn list_artworks(&self, filter: ArtworkFilter) -> Result<Vec<Artwork>, RepositoryError> {
        let state = self.state.read().await;
        let mut records: Vec<&ArtworkRecord> = state
            .artworks
            .values()
            .filter(|a| match filter {
                ArtworkFilter::All => true,
                ArtworkFilter::ByArtist(artist) => a.artist == artist,
                ArtworkFilter::PurchasedBy(buyer) => matches!(
                    a.listing,
                    Listing::Sold { buyer: Some(b), .. } if b == buyer
                ),
            })
            .collect();

        match filter {
            ArtworkFilter::PurchasedBy(_) => newest_first(&mut records, |a| match a.listing {
                Listing::Sold { sold_at, .. } => (sold_at, a.id.as_i32()),
                _ => (a.created_at, a.id.as_i32()),
            }),
            ArtworkFilter::All | ArtworkFilter::ByArtist(_) => {
                newest_first(&mut records, |a| (a.created_at, a.id.as_i32()));
            }
        }

        Ok(records.into_iter().map(|r| state.artwork(r)).collect())
    }

    async fn update_artwork(
        &self,
        id: ArtworkId,
        changes: &ArtworkChanges,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.artworks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            title.clone_into(&mut record.title);
        }
        if let Some(description) = &changes.description {
            description.clone_into(&mut record.description);
        }
        if let Some(image_ref) = &changes.image_ref {
            image_ref.clone_into(&mut record.image_ref);
        }
        record.updated_at = Utc::now();
        Ok(state.get_artwork(id))
    }

    async fn delete_artwork(&self, id: ArtworkId) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.remove_artwork(id))
    }

    async fn toggle_like(
        &self,
        id: ArtworkId,
        user: UserId,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.artworks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(pos) = record.liked_by.iter().position(|u| *u == user) {
            record.liked_by.remove(pos);
        } else {
            record.liked_by.push(user);
        }
        Ok(state.get_artwork(id))
    }

    async fn add_comment(
        &self,
        id: ArtworkId,
        user: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.artworks.get_mut(&id) else {
            return Ok(None);
        };
        record.comments.push(CommentRecord {
            author: user,
            text: text.to_owned(),
            created_at: at,
        });
        Ok(state.get_artwork(id))
    }

    async fn list_for_sale(
        &self,
        id: ArtworkId,
        price: Price,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.artworks.get_mut(&id) else {
            return Ok(None);
        };
        if record.listing.is_sold() {
            return Ok(None);
        }
        record.listing = Listing::ForSale { price };
        record.updated_at = Utc::now();
        Ok(state.get_artwork(id))
    }

    async fn mark_sold(
        &self,
        id: ArtworkId,
        buyer: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Artwork>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(record) = state.artworks.get_mut(&id) else {
            return Ok(None);
        };
        let Listing::ForSale { price } = record.listing else {
            return Ok(None);
        };
        if record.artist == buyer {
            return Ok(None);
        }
        record.listing = Listing::Sold {
            price,
            buyer: Some(buyer),
            sold_at: at,
        };
        record.updated_at = at;
        Ok(state.get_artwork(id))
    }

    async fn count_artworks(&self) -> Result<u64, RepositoryError> {
        Ok(self.state.read().await.artworks.len() as u64)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let state = self.state.read().await;
        let lines = state
            .carts
            .get(&user)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|(artwork, quantity)| {
                        state.get_artwork(*artwork).map(|artwork| CartLine {
                            artwork,
                            quantity: *quantity,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Cart { lines })
    }

    async fn add_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.artworks.contains_key(&artwork) || !state.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        let lines = state.carts.entry(user).or_default();
        if let Some((_, existing)) = lines.iter_mut().find(|(a, _)| *a == artwork) {
            *existing = existing.saturating_add(quantity).min(MAX_LINE_QUANTITY);
        } else {
            lines.push((artwork, quantity));
        }
        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        artwork: ArtworkId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let line = state
            .carts
            .get_mut(&user)
            .and_then(|lines| lines.iter_mut().find(|(a, _)| *a == artwork));
        match line {
            Some((_, existing)) => {
                *existing = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_cart_item(
        &self,
        user: UserId,
        artwork: ArtworkId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(lines) = state.carts.get_mut(&user) else {
            return Ok(false);
        };
        let before = lines.len();
        lines.retain(|(a, _)| *a != artwork);
        Ok(lines.len() != before)
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), RepositoryError> {
        self.state.write().await.carts.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .orders
            .values()
            .any(|o| o.order_number == new.order_number)
        {
            return Err(RepositoryError::Conflict(ORDER_NUMBER_TAKEN.to_owned()));
        }
        state.next_order += 1;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(state.next_order),
            order_number: new.order_number.clone(),
            user_id: Some(new.user_id),
            items: new.items.clone(),
            totals: new.totals,
            shipping_address: new.shipping_address.clone(),
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            transaction_ref: None,
            status: OrderStatus::Pending,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        only_from: Option<&[OrderStatus]>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };
        if only_from.is_some_and(|allowed| !allowed.contains(&order.status)) {
            return Ok(None);
        }
        order.status = status;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        transaction_ref: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.payment_status = PaymentStatus::Paid;
        order.transaction_ref = Some(transaction_ref.to_owned());
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn set_tracking_number(
        &self,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.tracking_number = Some(tracking_number.to_owned());
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn order_summary(&self) -> Result<(u64, Decimal), RepositoryError> {
        let state = self.state.read().await;
        let revenue = state.orders.values().map(|o| o.totals.total).sum();
        Ok((state.orders.len() as u64, revenue))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
