//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, CoffeeApiClient};
use crate::config::StorefrontConfig;
use crate::services::{CartStore, InFlight, RevokedTokens};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API client, carts and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: CoffeeApiClient,
    carts: CartStore,
    in_flight: InFlight,
    revoked_tokens: RevokedTokens,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = CoffeeApiClient::new(&config.api)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                carts: CartStore::default(),
                in_flight: InFlight::new(),
                revoked_tokens: RevokedTokens::default(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the coffee shop API client.
    #[must_use]
    pub fn api(&self) -> &CoffeeApiClient {
        &self.inner.api
    }

    /// Get a reference to the per-visitor cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the in-flight registry.
    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    /// Get a reference to the logged-out token registry.
    #[must_use]
    pub fn revoked_tokens(&self) -> &RevokedTokens {
        &self.inner.revoked_tokens
    }
}
