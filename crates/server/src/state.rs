//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::CafeConfig;
use crate::services::stripe::StripeClient;
use crate::store::OrderStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the in-memory catalog, the Stripe client, and the order
/// store. Everything in it is built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CafeConfig,
    catalog: CatalogStore,
    stripe: StripeClient,
    orders: OrderStore,
}

impl AppState {
    /// Assemble the application state from its parts.
    ///
    /// The Stripe client is injected rather than constructed here so tests
    /// can point it at a mock API server.
    #[must_use]
    pub fn new(
        config: CafeConfig,
        catalog: CatalogStore,
        stripe: StripeClient,
        orders: OrderStore,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                stripe,
                orders,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &CafeConfig {
        &self.inner.config
    }

    /// Get a reference to the in-memory catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &OrderStore {
        &self.inner.orders
    }
}
