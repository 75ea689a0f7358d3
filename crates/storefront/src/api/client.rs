//! Coffee shop API client implementation.

use std::sync::Arc;
use std::time::Duration;

use coffee_shop_core::{
    BearerToken, Catalog, ChatMessage, ChatReply, OrderDraft, OrderId, OrderRecord, Profile,
};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_draft_line, convert_order, convert_products};
use super::types::{
    ChatInput, ChatRequest, ChatResponse, CreateOrderRequest, CreateOrderResponse, ErrorBody,
    OrdersQuery, PaymentFields, ProductsResponse, RegisterRequest, TokenResponse, UserPayload,
};
use crate::config::CoffeeApiConfig;

/// Client for the coffee shop API.
///
/// Cheap to clone. The product list is cached for 5 minutes.
#[derive(Clone)]
pub struct CoffeeApiClient {
    inner: Arc<CoffeeApiClientInner>,
}

struct CoffeeApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl CoffeeApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CoffeeApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("coffee-shop-storefront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        // Url::join replaces the last segment unless the base ends in '/'
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            inner: Arc::new(CoffeeApiClientInner {
                client,
                base_url,
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    /// Check the status and parse the body as JSON.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let text = Self::read_text(response).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Check the status and return the body.
    async fn read_text(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text).map_or_else(
                |_| text.chars().take(200).collect::<String>(),
                |body| match body.detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            );
            tracing::warn!(status = %status, message = %message, "API returned non-success status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }

    // =========================================================================
    // Auth & Users
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] (or a 4xx status) for bad
    /// credentials, or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<BearerToken, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("login")?)
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::read_json(response).await?;
        Ok(BearerToken::new(token.access_token))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the registration or the request fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        phone_number: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("register")?)
            .json(&RegisterRequest {
                name,
                email,
                password: password.expose_secret(),
                phone_number,
            })
            .send()
            .await?;

        Self::read_text(response).await?;
        Ok(())
    }

    /// Fetch the logged-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn get_profile(&self, token: &BearerToken) -> Result<Profile, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("users/me")?)
            .bearer_auth(token.expose())
            .send()
            .await?;

        let user: UserPayload = Self::read_json(response).await?;
        Ok(user.into())
    }

    /// Save the customer's profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected.
    #[instrument(skip(self, token, profile))]
    pub async fn update_profile(
        &self,
        token: &BearerToken,
        profile: &Profile,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .put(self.endpoint("users/me")?)
            .bearer_auth(token.expose())
            .json(&UserPayload::from(profile))
            .send()
            .await?;

        Self::read_text(response).await?;
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Get the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Catalog, ApiError> {
        if let Some(CacheValue::Products(catalog)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(catalog);
        }

        let response = self
            .inner
            .client
            .get(self.endpoint("products")?)
            .send()
            .await?;

        let body: ProductsResponse = Self::read_json(response).await?;
        let catalog = Catalog::new(convert_products(body.products));

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(catalog.clone()))
            .await;

        Ok(catalog)
    }

    /// Drop the cached product list.
    pub async fn invalidate_products(&self) {
        self.inner.cache.invalidate(&CacheKey::Products).await;
    }

    // =========================================================================
    // Orders & Payments
    // =========================================================================

    /// Create an order for `user_email`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected, or an error
    /// if the request fails.
    #[instrument(skip(self, token, draft), fields(total = %draft.total, mode = %draft.mode))]
    pub async fn create_order(
        &self,
        token: &BearerToken,
        user_email: &str,
        draft: &OrderDraft,
    ) -> Result<OrderId, ApiError> {
        let body = CreateOrderRequest {
            items: draft.lines.iter().map(convert_draft_line).collect(),
            user_email,
            total_price_usd: draft.total.amount(),
            delivery_mode: draft.mode.as_str(),
            address: draft.address.as_deref(),
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("create-order")?)
            .bearer_auth(token.expose())
            .json(&body)
            .send()
            .await?;

        let created: CreateOrderResponse = Self::read_json(response).await?;
        Ok(OrderId::new(created.order_id))
    }

    /// Get the pre-signed payment form fields for an order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected, or an error
    /// if the request fails.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn initiate_payment(
        &self,
        token: &BearerToken,
        order_id: &OrderId,
    ) -> Result<PaymentFields, ApiError> {
        let path = format!("initiate-payment/{}", urlencoding::encode(order_id.as_str()));
        let response = self
            .inner
            .client
            .post(self.endpoint(&path)?)
            .bearer_auth(token.expose())
            .json(&serde_json::json!({}))
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Get the order history for `user_email`.
    ///
    /// Entries that cannot be parsed are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected, or an error
    /// if the request fails.
    #[instrument(skip(self, token))]
    pub async fn get_orders(
        &self,
        token: &BearerToken,
        user_email: &str,
    ) -> Result<Vec<OrderRecord>, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("orders")?)
            .bearer_auth(token.expose())
            .query(&OrdersQuery { user_email })
            .send()
            .await?;

        let orders: Vec<super::types::OrderPayload> = Self::read_json(response).await?;
        Ok(orders
            .into_iter()
            .filter_map(|o| {
                convert_order(o)
                    .inspect_err(|e| tracing::warn!(error = %e, "Skipping invalid order"))
                    .ok()
            })
            .collect())
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Send the full transcript to the chat agent and get its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply is malformed.
    #[instrument(skip(self, messages), fields(history = messages.len()))]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("chat")?)
            .json(&ChatRequest {
                input: ChatInput { messages },
            })
            .send()
            .await?;

        let body: ChatResponse = Self::read_json(response).await?;
        let reply = ChatReply::from_message(body.output);
        if reply.skipped_lines() > 0 {
            tracing::warn!(
                skipped = reply.skipped_lines(),
                "Chat reply carried order lines that could not be used"
            );
        }
        Ok(reply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CoffeeApiClient {
        CoffeeApiClient::new(&CoffeeApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let client = client("http://api.local:8000/v1");
        assert_eq!(
            client.endpoint("create-order").unwrap().as_str(),
            "http://api.local:8000/v1/create-order"
        );
    }

    #[test]
    fn test_endpoint_at_root() {
        let client = client("http://api.local:8000");
        assert_eq!(
            client.endpoint("users/me").unwrap().as_str(),
            "http://api.local:8000/users/me"
        );
    }
}
