//! Integration test harness for BRANA Arts.
//!
//! [`TestServer::spawn`] serves the full router (same middleware as the
//! binary, rate limiting off) on an ephemeral port over a fresh
//! [`MemoryStore`]. Tests talk to it through [`brana_client::ApiClient`].
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p brana-integration-tests
//!
//! # PostgreSQL-backed tests (ignored by default)
//! BRANA_TEST_DATABASE_URL=postgres://... cargo test -p brana-integration-tests -- --ignored
//! ```

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::task::JoinHandle;

use brana_client::ApiClient;
use brana_core::api::{CreateOrderRequest, RegisterRequest, ShippingAddress, UserProfile};
use brana_core::{Email, PaymentMethod, Role};
use brana_server::app::build_router;
use brana_server::config::{ServerConfig, StoreConfig};
use brana_server::db::{MemoryStore, PgStore, Store, UserStore};
use brana_server::services::auth::MemoryOutbox;
use brana_server::services::auth::reset::token_from_link;
use brana_server::state::AppState;

/// Signing secret for tests only.
const TEST_TOKEN_SECRET: &str = "k8Qz2mW9xR4vL7pN3sT6yB1cF5hJ0dG8";

/// Password used by every test account.
pub const PASSWORD: &str = "password123";

/// A running server plus a client pointed at it.
pub struct TestServer {
    pub client: ApiClient,
    pub base_url: String,
    pub state: AppState,
    pub outbox: Arc<MemoryOutbox>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server over a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with_store(StoreConfig::InMemory, Arc::new(MemoryStore::new())).await
    }

    /// Start a server over `PostgreSQL` at `BRANA_TEST_DATABASE_URL`.
    ///
    /// Returns `None` when the variable is unset.
    pub async fn spawn_postgres() -> Option<Self> {
        let url = std::env::var("BRANA_TEST_DATABASE_URL").ok()?;
        let url = SecretString::from(url);
        let pool = brana_server::db::create_pool(&url)
            .await
            .expect("Failed to connect to test database");
        Some(Self::spawn_with_store(StoreConfig::Postgres(url), Arc::new(PgStore::new(pool))).await)
    }

    async fn spawn_with_store(store_config: StoreConfig, store: Arc<dyn Store>) -> Self {
        let mut config =
            ServerConfig::with_defaults(store_config, SecretString::from(TEST_TOKEN_SECRET));
        config.rate_limit = false;

        let outbox = Arc::new(MemoryOutbox::new());
        let state = AppState::new(config, store, outbox.clone());
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        let base_url = format!("http://{addr}");
        let client = ApiClient::new(&base_url).expect("Invalid test base URL");

        Self {
            client,
            base_url,
            state,
            outbox,
            handle,
        }
    }

    /// Register `{name}@example.com` with username `name` and log in.
    ///
    /// Returns the bearer token and the profile.
    pub async fn signup(&self, name: &str) -> (String, UserProfile) {
        let email = format!("{name}@example.com");
        self.client
            .register(&RegisterRequest {
                email: email.clone(),
                password: PASSWORD.to_owned(),
                username: Some(name.to_owned()),
                display_name: None,
            })
            .await
            .expect("Registration failed");

        let auth = self
            .client
            .login(&email, PASSWORD)
            .await
            .expect("Login failed");
        (auth.token, auth.user)
    }

    /// Sign up `name` and promote the account to admin directly in the store.
    pub async fn signup_admin(&self, name: &str) -> (String, UserProfile) {
        let (token, profile) = self.signup(name).await;
        self.state
            .store()
            .set_role(profile.id, Role::Admin)
            .await
            .expect("Store error")
            .expect("Admin account vanished");
        (token, profile)
    }

    /// The reset token most recently sent to `email`.
    pub fn reset_token_for(&self, email: &str) -> Option<String> {
        let email = Email::parse(email).ok()?;
        self.outbox
            .last_link_for(&email)
            .and_then(|link| token_from_link(&link))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Bekele Alemu".to_owned(),
        phone: "+251911000000".to_owned(),
        address: "Bole Road 12".to_owned(),
        city: "Addis Ababa".to_owned(),
        state: "Addis Ababa".to_owned(),
        zip_code: "1000".to_owned(),
        country: "Ethiopia".to_owned(),
    }
}

/// Checkout request paying cash on delivery.
#[must_use]
pub fn cash_on_delivery() -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_address: shipping_address(),
        payment_method: PaymentMethod::CashOnDelivery,
    }
}
