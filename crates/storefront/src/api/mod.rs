//! Coffee shop API client.
//!
//! # Architecture
//!
//! - Plain JSON/form request-response calls with `reqwest`
//! - The API is the source of truth for users, products, orders and payments
//! - The product list is cached in memory via `moka` (5 minute TTL)
//! - Bearer tokens are forwarded as-is; a 401 surfaces as [`ApiError::Unauthorized`]
//!
//! # Example
//!
//! ```rust,ignore
//! use coffee_shop_storefront::api::CoffeeApiClient;
//!
//! let client = CoffeeApiClient::new(&config.api)?;
//! let catalog = client.get_products().await?;
//! let token = client.login("ana@example.com", &password).await?;
//! ```

mod cache;
mod client;
mod conversions;
pub mod types;

pub use client::CoffeeApiClient;
pub use types::PaymentFields;

use thiserror::Error;

/// Errors that can occur when calling the coffee shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bearer token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success status other than 401.
    #[error("API returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, or a truncated body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but violates the contract (e.g. negative price).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Client could not be built or a URL could not be formed.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the API rejected the caller's credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// The `detail` message for a client error (4xx), if any.
    #[must_use]
    pub fn client_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if (400..500).contains(status) => Some(message),
            _ => None,
        }
    }
}
