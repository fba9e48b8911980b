//! Typed HTTP client for the marketplace API.
//!
//! Every method maps to one endpoint. Authenticated endpoints take the bearer
//! token explicitly; the session that owns it lives in
//! [`SessionCache`](crate::SessionCache).
//!
//! The public artwork list is cached with `moka` for a short time. Any
//! artwork mutation made through this client empties the cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use brana_core::api::{
    AddToCartRequest, ArtworkResponse, AuthResponse, CartResponse, CommentRequest,
    CreateArtworkRequest, CreateOrderRequest, DashboardStats, ForgotPasswordRequest,
    LoginRequest, MarkPaidRequest, MessageResponse, OrderResponse, PublicProfile,
    RegisterRequest, ResetPasswordRequest, SalesReport, SalesReportQuery, SellRequest,
    SyncCartRequest, SyncCartResponse, TrackingRequest, UpdateArtworkRequest, UpdateCartRequest,
    UpdateProfileRequest, UpdateRoleRequest, UpdateStatusRequest, UserProfile,
};
use brana_core::{ArtworkId, OrderId, UserId};
use rust_decimal::Decimal;

use crate::error::{ClientError, Result};

const ARTWORK_LIST_KEY: &str = "artworks";
const ARTWORK_LIST_TTL: Duration = Duration::from_secs(30);

/// Client for the BRANA Arts API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    artworks: Cache<&'static str, Arc<Vec<ArtworkResponse>>>,
}

impl ApiClient {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let artworks = Cache::builder()
            .max_capacity(1)
            .time_to_live(ARTWORK_LIST_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                artworks,
            }),
        })
    }

    /// Create a client from `BRANA_API_URL` (default `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the variable is not a usable URL.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("BRANA_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http://localhost:5000".to_owned());
        Self::new(&base_url)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        Self::handle_response(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        builder: RequestBuilder,
        body: &B,
    ) -> Result<T> {
        self.send(builder.json(body)).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")));
        }
        Err(Self::parse_error(response).await)
    }

    /// Decode the `{"message": ...}` error body, falling back to the raw text.
    async fn parse_error(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        debug!(status, message = %message, "API error");
        ClientError::Api { status, message }
    }

    fn invalidate_artworks(&self) {
        self.inner.artworks.invalidate_all();
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Whether the server reports ready.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the server cannot be reached.
    pub async fn ready(&self) -> Result<bool> {
        let response = self
            .request(Method::GET, "/health/ready", None)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// # Errors
    ///
    /// Returns the API's error for invalid input or a taken email/username.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        self.send_json(self.request(Method::POST, "/auth/register", None), request)
            .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for bad credentials.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        self.send_json(self.request(Method::POST, "/auth/login", None), &body)
            .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn profile(&self, token: &str) -> Result<UserProfile> {
        self.send(self.request(Method::GET, "/auth/profile", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns the API's error if the request is rejected.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        let body = ForgotPasswordRequest {
            email: email.to_owned(),
        };
        self.send_json(
            self.request(Method::POST, "/auth/forgot-password", None),
            &body,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for an unknown, used or expired token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<MessageResponse> {
        let body = ResetPasswordRequest {
            token: token.to_owned(),
            new_password: new_password.to_owned(),
        };
        self.send_json(
            self.request(Method::POST, "/auth/reset-password", None),
            &body,
        )
        .await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns the API's error for invalid fields.
    pub async fn update_profile(
        &self,
        token: &str,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile> {
        self.send_json(
            self.request(Method::PUT, "/users/profile", Some(token)),
            request,
        )
        .await
    }

    /// Anyone's public profile.
    ///
    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown users.
    pub async fn user(&self, id: UserId) -> Result<PublicProfile> {
        self.send(self.request(Method::GET, &format!("/users/{id}"), None))
            .await
    }

    /// The full profile, for the account owner or an admin.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Parse` when the caller may only see the public
    /// part.
    pub async fn user_full(&self, token: &str, id: UserId) -> Result<UserProfile> {
        self.send(self.request(Method::GET, &format!("/users/{id}"), Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown users.
    pub async fn user_artworks(&self, id: UserId) -> Result<Vec<ArtworkResponse>> {
        self.send(self.request(Method::GET, &format!("/users/{id}/artworks"), None))
            .await
    }

    // =========================================================================
    // Artworks
    // =========================================================================

    /// The catalog, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns the API's error on a cache miss that fails.
    pub async fn artworks(&self) -> Result<Arc<Vec<ArtworkResponse>>> {
        if let Some(cached) = self.inner.artworks.get(ARTWORK_LIST_KEY).await {
            debug!("Artwork list cache hit");
            return Ok(cached);
        }

        let list: Vec<ArtworkResponse> =
            self.send(self.request(Method::GET, "/artworks", None)).await?;
        let list = Arc::new(list);
        self.inner
            .artworks
            .insert(ARTWORK_LIST_KEY, Arc::clone(&list))
            .await;
        Ok(list)
    }

    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown artworks.
    pub async fn artwork(&self, id: ArtworkId) -> Result<ArtworkResponse> {
        self.send(self.request(Method::GET, &format!("/artworks/{id}"), None))
            .await
    }

    /// # Errors
    ///
    /// Returns the API's error for invalid fields.
    pub async fn create_artwork(
        &self,
        token: &str,
        request: &CreateArtworkRequest,
    ) -> Result<ArtworkResponse> {
        let artwork = self
            .send_json(self.request(Method::POST, "/artworks", Some(token)), request)
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` unless the caller is the artist.
    pub async fn update_artwork(
        &self,
        token: &str,
        id: ArtworkId,
        request: &UpdateArtworkRequest,
    ) -> Result<ArtworkResponse> {
        let artwork = self
            .send_json(
                self.request(Method::PUT, &format!("/artworks/{id}"), Some(token)),
                request,
            )
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` unless the caller is the artist or an
    /// admin.
    pub async fn delete_artwork(&self, token: &str, id: ArtworkId) -> Result<MessageResponse> {
        let message = self
            .send(self.request(Method::DELETE, &format!("/artworks/{id}"), Some(token)))
            .await?;
        self.invalidate_artworks();
        Ok(message)
    }

    /// Toggle the caller's like.
    ///
    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown artworks.
    pub async fn like(&self, token: &str, id: ArtworkId) -> Result<ArtworkResponse> {
        let artwork = self
            .send(self.request(Method::PUT, &format!("/artworks/{id}/like"), Some(token)))
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// # Errors
    ///
    /// Returns a 400 `ClientError::Api` for empty text.
    pub async fn comment(&self, token: &str, id: ArtworkId, text: &str) -> Result<ArtworkResponse> {
        let body = CommentRequest {
            text: text.to_owned(),
        };
        let artwork = self
            .send_json(
                self.request(Method::POST, &format!("/artworks/{id}/comment"), Some(token)),
                &body,
            )
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// List an artwork for sale.
    ///
    /// # Errors
    ///
    /// Returns a 403 for non-artists, 400 for a bad price, 409 once sold.
    pub async fn sell(&self, token: &str, id: ArtworkId, price: Decimal) -> Result<ArtworkResponse> {
        let artwork = self
            .send_json(
                self.request(Method::PUT, &format!("/artworks/{id}/sell"), Some(token)),
                &SellRequest { price },
            )
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// # Errors
    ///
    /// Returns a 409 `ClientError::Api` if the artwork is not for sale.
    pub async fn buy(&self, token: &str, id: ArtworkId) -> Result<ArtworkResponse> {
        let artwork = self
            .send(self.request(Method::POST, &format!("/artworks/{id}/buy"), Some(token)))
            .await?;
        self.invalidate_artworks();
        Ok(artwork)
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn purchased(&self, token: &str) -> Result<Vec<ArtworkResponse>> {
        self.send(self.request(Method::GET, "/artworks/purchased", Some(token)))
            .await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn cart(&self, token: &str) -> Result<CartResponse> {
        self.send(self.request(Method::GET, "/cart", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 404 for unknown artworks, 400 for a bad quantity.
    pub async fn add_to_cart(
        &self,
        token: &str,
        artwork_id: ArtworkId,
        quantity: Option<i64>,
    ) -> Result<CartResponse> {
        let body = AddToCartRequest {
            artwork_id,
            quantity,
        };
        self.send_json(self.request(Method::POST, "/cart", Some(token)), &body)
            .await
    }

    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` if the line does not exist.
    pub async fn update_cart_item(
        &self,
        token: &str,
        artwork_id: ArtworkId,
        quantity: i64,
    ) -> Result<CartResponse> {
        self.send_json(
            self.request(Method::PUT, &format!("/cart/{artwork_id}"), Some(token)),
            &UpdateCartRequest { quantity },
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn remove_cart_item(&self, token: &str, artwork_id: ArtworkId) -> Result<CartResponse> {
        self.send(self.request(Method::DELETE, &format!("/cart/{artwork_id}"), Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn clear_cart(&self, token: &str) -> Result<CartResponse> {
        self.send(self.request(Method::DELETE, "/cart", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn sync_cart(&self, token: &str, request: &SyncCartRequest) -> Result<SyncCartResponse> {
        self.send_json(self.request(Method::POST, "/cart/sync", Some(token)), request)
            .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Check out the cart.
    ///
    /// # Errors
    ///
    /// Returns a 400 for an empty cart or bad address, 409 for unpriced lines.
    pub async fn create_order(
        &self,
        token: &str,
        request: &CreateOrderRequest,
    ) -> Result<OrderResponse> {
        let order = self
            .send_json(self.request(Method::POST, "/orders", Some(token)), request)
            .await?;
        self.invalidate_artworks();
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns a 401 `ClientError::Api` for a bad token.
    pub async fn orders(&self, token: &str) -> Result<Vec<OrderResponse>> {
        self.send(self.request(Method::GET, "/orders", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 404 for unknown orders, 403 for other users' orders.
    pub async fn order(&self, token: &str, id: OrderId) -> Result<OrderResponse> {
        self.send(self.request(Method::GET, &format!("/orders/{id}"), Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 409 `ClientError::Api` once the order has shipped.
    pub async fn cancel_order(&self, token: &str, id: OrderId) -> Result<OrderResponse> {
        self.send(self.request(Method::PUT, &format!("/orders/{id}/cancel"), Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 409 `ClientError::Api` if the order is already paid.
    pub async fn pay_order(
        &self,
        token: &str,
        id: OrderId,
        transaction_ref: &str,
    ) -> Result<OrderResponse> {
        let body = MarkPaidRequest {
            transaction_ref: transaction_ref.to_owned(),
        };
        self.send_json(
            self.request(Method::PUT, &format!("/orders/{id}/pay"), Some(token)),
            &body,
        )
        .await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` for non-admins.
    pub async fn admin_users(&self, token: &str) -> Result<Vec<UserProfile>> {
        self.send(self.request(Method::GET, "/admin/users", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 400 for an unknown role, 409 for self-demotion.
    pub async fn update_role(&self, token: &str, id: UserId, role: &str) -> Result<UserProfile> {
        let body = UpdateRoleRequest {
            role: role.to_owned(),
        };
        self.send_json(
            self.request(Method::PUT, &format!("/admin/users/{id}/role"), Some(token)),
            &body,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a 404 for unknown users, 409 for self-deletion.
    pub async fn delete_user(&self, token: &str, id: UserId) -> Result<MessageResponse> {
        let message = self
            .send(self.request(Method::DELETE, &format!("/admin/users/{id}"), Some(token)))
            .await?;
        self.invalidate_artworks();
        Ok(message)
    }

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` for non-admins.
    pub async fn admin_artworks(&self, token: &str) -> Result<Vec<ArtworkResponse>> {
        self.send(self.request(Method::GET, "/admin/artworks", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown artworks.
    pub async fn admin_delete_artwork(&self, token: &str, id: ArtworkId) -> Result<MessageResponse> {
        let message = self
            .send(self.request(
                Method::DELETE,
                &format!("/admin/artworks/{id}"),
                Some(token),
            ))
            .await?;
        self.invalidate_artworks();
        Ok(message)
    }

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` for non-admins.
    pub async fn admin_orders(&self, token: &str) -> Result<Vec<OrderResponse>> {
        self.send(self.request(Method::GET, "/admin/orders", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 400 for an unknown status, 409 for a disallowed cancel.
    pub async fn update_order_status(
        &self,
        token: &str,
        id: OrderId,
        status: &str,
    ) -> Result<OrderResponse> {
        let body = UpdateStatusRequest {
            status: status.to_owned(),
        };
        self.send_json(
            self.request(Method::PUT, &format!("/admin/orders/{id}/status"), Some(token)),
            &body,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a 404 `ClientError::Api` for unknown orders.
    pub async fn add_tracking(
        &self,
        token: &str,
        id: OrderId,
        tracking_number: &str,
    ) -> Result<OrderResponse> {
        let body = TrackingRequest {
            tracking_number: tracking_number.to_owned(),
        };
        self.send_json(
            self.request(
                Method::PUT,
                &format!("/admin/orders/{id}/tracking"),
                Some(token),
            ),
            &body,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns a 403 `ClientError::Api` for non-admins.
    pub async fn stats(&self, token: &str) -> Result<DashboardStats> {
        self.send(self.request(Method::GET, "/admin/stats", Some(token)))
            .await
    }

    /// # Errors
    ///
    /// Returns a 400 `ClientError::Api` if the range is reversed.
    pub async fn sales_report(&self, token: &str, query: SalesReportQuery) -> Result<SalesReport> {
        self.send(self.request(
            Method::GET,
            &format!("/admin/sales-report{}", sales_report_query(query)),
            Some(token),
        ))
        .await
    }
}

/// Query string for the sales report, empty when both ends are open.
fn sales_report_query(query: SalesReportQuery) -> String {
    let params: Vec<String> = [
        query.start_date.map(|d| format!("startDate={d}")),
        query.end_date.map(|d| format!("endDate={d}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.com"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_sales_report_query() {
        assert_eq!(sales_report_query(SalesReportQuery::default()), "");

        let query = SalesReportQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
        };
        assert_eq!(
            sales_report_query(query),
            "?startDate=2024-01-01&endDate=2024-01-31"
        );

        let open_start = SalesReportQuery {
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
        };
        assert_eq!(sales_report_query(open_start), "?endDate=2024-02-01");
    }
}
