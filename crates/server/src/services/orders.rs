//! Order service.
//!
//! Checkout turns the caller's cart into an order whose lines and totals are
//! fixed at creation. The cart is cleared afterwards as a separate write: if
//! that write fails the order stands and the stale cart is left for the
//! customer to clear.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use tracing::instrument;

use brana_core::api::{CreateOrderRequest, ShippingAddress};
use brana_core::pricing::line_subtotal;
use brana_core::{OrderId, OrderPricing, OrderStatus, PaymentStatus};

use super::{ServiceError, ensure_admin, required_text};
use crate::db::{CartStore, ORDER_NUMBER_TAKEN, OrderStore, RepositoryError, Store};
use crate::models::{CurrentUser, NewOrder, Order, OrderFilter, OrderLine};

/// Attempts at finding an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

const ORDER_NUMBER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    pricing: OrderPricing,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, pricing: OrderPricing) -> Self {
        Self { store, pricing }
    }

    /// Place an order for everything in the caller's cart, then clear it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a shipping field is blank, the
    /// cart is empty or the total is too large to store, and
    /// `ServiceError::Conflict` if a cart line's artwork no longer has a
    /// price.
    #[instrument(skip(self, request), fields(user_id = %actor.id))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        request: &CreateOrderRequest,
    ) -> Result<Order, ServiceError> {
        let shipping_address = validate_address(&request.shipping_address)?;

        let cart = self.store.get_cart(actor.id).await?;
        if cart.is_empty() {
            return Err(ServiceError::Validation("cart is empty".to_owned()));
        }

        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let unit_price = line.artwork.price().ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "\"{}\" is no longer for sale",
                    line.artwork.title
                ))
            })?;
            items.push(OrderLine {
                artwork_id: line.artwork.id,
                title: line.artwork.title.clone(),
                quantity: line.quantity,
                unit_price,
                subtotal: line_subtotal(unit_price, line.quantity),
            });
        }
        let totals = self
            .pricing
            .totals(items.iter().map(|item| (item.unit_price, item.quantity)))
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let mut new_order = NewOrder {
            order_number: String::new(),
            user_id: actor.id,
            items,
            totals,
            shipping_address,
            payment_method: request.payment_method,
        };

        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            new_order.order_number = generate_order_number(Utc::now());
            match self.store.create_order(&new_order).await {
                Ok(order) => break order,
                Err(RepositoryError::Conflict(message))
                    if message == ORDER_NUMBER_TAKEN && attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(attempt, "Order number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        if let Err(e) = self.store.clear_cart(actor.id).await {
            tracing::error!(
                order_number = %order.order_number,
                error = %e,
                "Order placed but cart could not be cleared"
            );
        }

        tracing::info!(
            order_number = %order.order_number,
            total = %order.totals.total,
            "Order placed"
        );
        Ok(order)
    }

    /// Record a captured payment. Owner or admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Forbidden`,
    /// `ServiceError::Validation` for a blank reference, or
    /// `ServiceError::Conflict` if the order is already paid.
    #[instrument(skip(self), fields(user_id = %actor.id, order_id = %id))]
    pub async fn mark_paid(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        transaction_ref: &str,
    ) -> Result<Order, ServiceError> {
        let order = self.get(actor, id).await?;
        let transaction_ref = required_text("transaction reference", transaction_ref)?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::Conflict("order is already paid".to_owned()));
        }

        self.store
            .mark_order_paid(id, &transaction_ref)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Set an order's status. Admin only.
    ///
    /// Moving to `cancelled` follows the same rule as [`Self::cancel`].
    ///
    /// # Errors
    ///
    /// In order: `ServiceError::Forbidden` for non-admins,
    /// `ServiceError::Validation` for an unknown status,
    /// `ServiceError::NotFound`, and `ServiceError::Conflict` when cancelling
    /// an order that is past cancellation.
    #[instrument(skip(self), fields(user_id = %actor.id, order_id = %id))]
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        status: &str,
    ) -> Result<Order, ServiceError> {
        ensure_admin(actor)?;
        let status = status.trim().parse::<OrderStatus>().map_err(|_| {
            let valid: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
            ServiceError::Validation(format!(
                "invalid status, expected one of: {}",
                valid.join(", ")
            ))
        })?;

        if status == OrderStatus::Cancelled {
            return self.cancel_order(id).await;
        }

        let order = self
            .store
            .update_order_status(id, status, None)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(status = %status, "Order status updated");
        Ok(order)
    }

    /// Cancel an order. Owner or admin, while `pending` or `processing`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Forbidden`, or
    /// `ServiceError::Conflict` if the order can no longer be cancelled.
    #[instrument(skip(self), fields(user_id = %actor.id, order_id = %id))]
    pub async fn cancel(&self, actor: &CurrentUser, id: OrderId) -> Result<Order, ServiceError> {
        let order = self.get(actor, id).await?;
        if !order.status.is_cancellable() {
            return Err(not_cancellable(order.status));
        }
        self.cancel_order(id).await
    }

    /// Attach a tracking number. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden`, `ServiceError::Validation` for a
    /// blank number, or `ServiceError::NotFound`.
    #[instrument(skip(self), fields(user_id = %actor.id, order_id = %id))]
    pub async fn add_tracking(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<Order, ServiceError> {
        ensure_admin(actor)?;
        let tracking_number = required_text("tracking number", tracking_number)?;

        self.store
            .set_tracking_number(id, &tracking_number)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_for_user(&self, actor: &CurrentUser) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .store
            .list_orders(OrderFilter::for_user(actor.id))
            .await?)
    }

    /// Every order, newest first. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for non-admins.
    pub async fn list_all(&self, actor: &CurrentUser) -> Result<Vec<Order>, ServiceError> {
        ensure_admin(actor)?;
        Ok(self.store.list_orders(OrderFilter::default()).await?)
    }

    /// One order. Owner or admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Forbidden`.
    pub async fn get(&self, actor: &CurrentUser, id: OrderId) -> Result<Order, ServiceError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        if !order.is_owned_by(actor.id) && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "you do not have access to this order".to_owned(),
            ));
        }
        Ok(order)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        if let Some(order) = self
            .store
            .update_order_status(id, OrderStatus::Cancelled, Some(OrderStatus::CANCELLABLE))
            .await?
        {
            tracing::info!(order_number = %order.order_number, "Order cancelled");
            return Ok(order);
        }

        // Either gone or no longer cancellable; report which.
        match self.store.get_order(id).await? {
            Some(order) => Err(not_cancellable(order.status)),
            None => Err(not_found(id)),
        }
    }
}

fn validate_address(address: &ShippingAddress) -> Result<ShippingAddress, ServiceError> {
    Ok(ShippingAddress {
        full_name: required_text("full name", &address.full_name)?,
        phone: required_text("phone", &address.phone)?,
        address: required_text("address", &address.address)?,
        city: required_text("city", &address.city)?,
        state: required_text("state", &address.state)?,
        zip_code: required_text("zip code", &address.zip_code)?,
        country: required_text("country", &address.country)?,
    })
}

/// `BRN-<yyMMdd>-<6 uppercase alphanumerics>`.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .filter_map(|_| ORDER_NUMBER_CHARSET.choose(&mut rng).map(|&b| char::from(b)))
        .collect();
    format!("BRN-{}-{suffix}", now.format("%y%m%d"))
}

fn not_found(id: OrderId) -> ServiceError {
    ServiceError::NotFound(format!("order {id} not found"))
}

fn not_cancellable(status: OrderStatus) -> ServiceError {
    ServiceError::Conflict(format!("cannot cancel an order that is {status}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use brana_core::{ArtworkId, Email, PaymentMethod, Price, Role};

    use super::*;
    use crate::db::{ArtworkStore, MemoryStore, UserStore};
    use crate::models::{Listing, NewArtwork, NewUser};

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

    async fn listed(store: &MemoryStore, artist: &CurrentUser, price: i64) -> ArtworkId {
        store
            .create_artwork(&NewArtwork {
                artist: artist.id,
                title: "Sunset".to_owned(),
                description: "Oil".to_owned(),
                image_ref: "img1".to_owned(),
                listing: Listing::ForSale {
                    price: Price::new(Decimal::new(price, 0)).unwrap(),
                },
            })
            .await
            .unwrap()
            .id
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Bethlehem Tadesse".to_owned(),
            phone: "+251911000000".to_owned(),
            address: "Bole Road 12".to_owned(),
            city: "Addis Ababa".to_owned(),
            state: "Addis Ababa".to_owned(),
            zip_code: "1000".to_owned(),
            country: "Ethiopia".to_owned(),
        }
    }

    fn checkout(method: PaymentMethod) -> CreateOrderRequest {
        CreateOrderRequest {
            shipping_address: address(),
            payment_method: method,
        }
    }

    struct Fixture {
        store: MemoryStore,
        buyer: CurrentUser,
        admin: CurrentUser,
        stranger: CurrentUser,
    }

    impl Fixture {
        async fn with_cart() -> Self {
            let store = MemoryStore::new();
            let artist = account(&store, "alice@example.com", Role::User).await;
            let buyer = account(&store, "bob@example.com", Role::User).await;
            let admin = account(&store, "admin@example.com", Role::Admin).await;
            let stranger = account(&store, "eve@example.com", Role::User).await;
            let artwork = listed(&store, &artist, 100).await;
            store.add_cart_item(buyer.id, artwork, 2).await.unwrap();
            Self {
                store,
                buyer,
                admin,
                stranger,
            }
        }

        fn orders(&self) -> OrderService<'_> {
            OrderService::new(&self.store, OrderPricing::default())
        }
    }

    #[tokio::test]
    async fn test_checkout_totals_and_clears_cart() {
        let fx = Fixture::with_cart().await;

        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::CashOnDelivery))
            .await
            .unwrap();

        assert_eq!(order.totals.subtotal, Decimal::new(200, 0));
        assert_eq!(order.totals.shipping_cost, Decimal::new(50, 0));
        assert_eq!(order.totals.tax, Decimal::new(30, 0));
        assert_eq!(order.totals.total, Decimal::new(280, 0));
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert!(order.order_number.starts_with("BRN-"));

        assert!(fx.store.get_cart(fx.buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_validation() {
        let fx = Fixture::with_cart().await;

        let mut request = checkout(PaymentMethod::Card);
        request.shipping_address.city = "  ".to_owned();
        assert!(matches!(
            fx.orders().create(&fx.buyer, &request).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            fx.orders()
                .create(&fx.stranger, &checkout(PaymentMethod::Card))
                .await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_rejects_unstorable_totals() {
        let store = MemoryStore::new();
        let artist = account(&store, "alice@example.com", Role::User).await;
        let buyer = account(&store, "bob@example.com", Role::User).await;
        let artwork = listed(&store, &artist, 9_999_999_999).await;
        store.add_cart_item(buyer.id, artwork, 2).await.unwrap();
        let orders = OrderService::new(&store, OrderPricing::default());

        assert!(matches!(
            orders.create(&buyer, &checkout(PaymentMethod::Card)).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(store.get_cart(buyer.id).await.unwrap().total_items(), 2);
        assert!(orders.list_for_user(&buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_totals_survive_price_changes() {
        let fx = Fixture::with_cart().await;
        let cart = fx.store.get_cart(fx.buyer.id).await.unwrap();
        let artwork_id = cart.lines[0].artwork.id;

        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::Card))
            .await
            .unwrap();
        fx.store
            .list_for_sale(artwork_id, Price::new(Decimal::new(999, 0)).unwrap())
            .await
            .unwrap();

        let reread = fx.orders().get(&fx.buyer, order.id).await.unwrap();
        assert_eq!(reread.totals, order.totals);
        assert_eq!(
            reread.totals.total,
            reread.totals.subtotal + reread.totals.shipping_cost + reread.totals.tax
        );
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let fx = Fixture::with_cart().await;
        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::CashOnDelivery))
            .await
            .unwrap();

        assert!(matches!(
            fx.orders().cancel(&fx.stranger, order.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let cancelled = fx.orders().cancel(&fx.admin, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        assert!(matches!(
            fx.orders().cancel(&fx.buyer, order.id).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delivered_orders_cannot_be_cancelled() {
        let fx = Fixture::with_cart().await;
        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::Card))
            .await
            .unwrap();

        fx.orders()
            .update_status(&fx.admin, order.id, "delivered")
            .await
            .unwrap();

        assert!(matches!(
            fx.orders().cancel(&fx.buyer, order.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            fx.orders()
                .update_status(&fx.admin, order.id, "cancelled")
                .await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_checks() {
        let fx = Fixture::with_cart().await;
        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::Card))
            .await
            .unwrap();

        assert!(matches!(
            fx.orders()
                .update_status(&fx.buyer, order.id, "shipped")
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            fx.orders()
                .update_status(&fx.admin, order.id, "archived")
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            fx.orders()
                .update_status(&fx.admin, OrderId::new(999), "shipped")
                .await,
            Err(ServiceError::NotFound(_))
        ));

        let shipped = fx
            .orders()
            .update_status(&fx.admin, order.id, "shipped")
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_payment_and_tracking() {
        let fx = Fixture::with_cart().await;
        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::MobileBanking))
            .await
            .unwrap();

        assert!(matches!(
            fx.orders().mark_paid(&fx.buyer, order.id, " ").await,
            Err(ServiceError::Validation(_))
        ));
        let paid = fx
            .orders()
            .mark_paid(&fx.buyer, order.id, "TXN-42")
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.transaction_ref.as_deref(), Some("TXN-42"));

        assert!(matches!(
            fx.orders()
                .add_tracking(&fx.buyer, order.id, "ET123")
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            fx.orders().add_tracking(&fx.admin, order.id, "").await,
            Err(ServiceError::Validation(_))
        ));
        let tracked = fx
            .orders()
            .add_tracking(&fx.admin, order.id, "ET123")
            .await
            .unwrap();
        assert_eq!(tracked.tracking_number.as_deref(), Some("ET123"));
    }

    #[tokio::test]
    async fn test_order_visibility() {
        let fx = Fixture::with_cart().await;
        let order = fx
            .orders()
            .create(&fx.buyer, &checkout(PaymentMethod::Card))
            .await
            .unwrap();

        assert!(matches!(
            fx.orders().get(&fx.stranger, order.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        fx.orders().get(&fx.admin, order.id).await.unwrap();

        assert_eq!(fx.orders().list_for_user(&fx.buyer).await.unwrap().len(), 1);
        assert!(fx.orders().list_for_user(&fx.stranger).await.unwrap().is_empty());
        assert!(matches!(
            fx.orders().list_all(&fx.buyer).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(fx.orders().list_all(&fx.admin).await.unwrap().len(), 1);
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let number = generate_order_number(now);

        assert!(number.starts_with("BRN-261018-"));
        let suffix = number.trim_start_matches("BRN-261018-");
        assert_eq!(suffix.len(), 6);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }
}
