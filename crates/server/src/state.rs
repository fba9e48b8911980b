//! Application state shared across handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::auth::{ResetDelivery, TokenSigner};
use crate::services::{AdminService, AuthService, CartService, CatalogService, OrderService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the record store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    tokens: TokenSigner,
    delivery: Arc<dyn ResetDelivery>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Record store (`PostgreSQL` or in-memory)
    /// * `delivery` - Where password reset links are sent
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        delivery: Arc<dyn ResetDelivery>,
    ) -> Self {
        let tokens = TokenSigner::new(
            config.token_secret.clone(),
            Duration::hours(config.token_ttl_hours),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                delivery,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.store(),
            &self.inner.tokens,
            self.inner.delivery.as_ref(),
            &self.inner.config.public_url,
        )
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.inner.config.pricing)
    }

    #[must_use]
    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(self.store())
    }
}
