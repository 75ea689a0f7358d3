//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COFFEE_API_URL` - Base URL of the coffee shop API (auth, products, orders, chat)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `COFFEE_API_TIMEOUT_SECS` - Per-request timeout for API calls (default: 15)
//! - `PAYMENT_FORM_URL` - Payment processor form endpoint (default: eSewa test form)
//! - `DELIVERY_FEE_USD` - Surcharge for delivered orders (default: 1.00)
//! - `LOCAL_CURRENCY_CODE` - Display currency for order history (default: NPR)
//! - `LOCAL_CURRENCY_RATE` - Local units per USD (default: 133.0)
//! - `CHAT_RECOMMENDATIONS` - Ask the chat agent for suggestions after payment (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use coffee_shop_core::{LocalCurrency, Usd};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// eSewa's public test form endpoint.
pub const DEFAULT_PAYMENT_FORM_URL: &str = "https://rc-epay.esewa.com.np/api/epay/main/v2/form";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Coffee shop API configuration
    pub api: CoffeeApiConfig,
    /// Checkout settings
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<SecretString>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Coffee shop API configuration.
#[derive(Debug, Clone)]
pub struct CoffeeApiConfig {
    /// Base URL, e.g. `https://api.coffee.example`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Checkout and display settings.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Where the pre-signed payment form is posted
    pub payment_form_url: Url,
    /// Surcharge added to delivered orders
    pub delivery_fee: Usd,
    /// Fixed display conversion for order history
    pub local_currency: LocalCurrency,
    /// Fetch a chat recommendation on the thank-you page
    pub chat_recommendations: bool,
}

impl CheckoutConfig {
    /// Default checkout settings posting payments to `payment_form_url`.
    #[must_use]
    pub fn with_payment_form(payment_form_url: Url) -> Self {
        Self {
            payment_form_url,
            delivery_fee: Usd::from_cents(100),
            local_currency: LocalCurrency {
                code: "NPR".to_string(),
                per_usd: Decimal::new(1330, 1),
            },
            chat_recommendations: true,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or("STOREFRONT_PORT", "3000")?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;

        let api = CoffeeApiConfig {
            base_url: env.url("COFFEE_API_URL", None)?,
            timeout: Duration::from_secs(env.parse_or("COFFEE_API_TIMEOUT_SECS", "15")?),
        };

        let delivery_fee: Decimal = env.parse_or("DELIVERY_FEE_USD", "1.00")?;
        if delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "DELIVERY_FEE_USD".to_string(),
                "must not be negative".to_string(),
            ));
        }
        let per_usd: Decimal = env.parse_or("LOCAL_CURRENCY_RATE", "133.0")?;
        if per_usd <= Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "LOCAL_CURRENCY_RATE".to_string(),
                "must be positive".to_string(),
            ));
        }

        let checkout = CheckoutConfig {
            payment_form_url: env.url("PAYMENT_FORM_URL", Some(DEFAULT_PAYMENT_FORM_URL))?,
            delivery_fee: Usd::new(delivery_fee),
            local_currency: LocalCurrency {
                code: env.or_default("LOCAL_CURRENCY_CODE", "NPR"),
                per_usd,
            },
            chat_recommendations: env.parse_or("CHAT_RECOMMENDATIONS", "true")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            api,
            checkout,
            sentry_dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse an absolute http(s) URL.
    fn url(&self, key: &str, default: Option<&str>) -> Result<Url, ConfigError> {
        let raw = match default {
            Some(default) => self.or_default(key, default),
            None => self.required(key)?,
        };
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("COFFEE_API_URL", "http://localhost:8000"),
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        assert_eq!(config.checkout.delivery_fee, Usd::from_cents(100));
        assert_eq!(config.checkout.local_currency.code, "NPR");
        assert_eq!(config.checkout.local_currency.per_usd, Decimal::new(1330, 1));
        assert_eq!(config.checkout.payment_form_url.as_str(), DEFAULT_PAYMENT_FORM_URL);
        assert!(config.checkout.chat_recommendations);
        assert!(config.sentry_dsn.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "COFFEE_API_URL"));
    }

    #[test]
    fn test_blank_counts_as_missing() {
        let err = load(&[("COFFEE_API_URL", "  "), REQUIRED[1]]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STOREFRONT_PORT", "not-a-port"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(ref k, _)) if k == "STOREFRONT_PORT"));

        let mut vars = REQUIRED.to_vec();
        vars.push(("LOCAL_CURRENCY_RATE", "0"));
        assert!(load(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("DELIVERY_FEE_USD", "-1"));
        assert!(load(&vars).is_err());

        let vars = [("COFFEE_API_URL", "ftp://example.com"), REQUIRED[1]];
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("STOREFRONT_PORT", "8080"),
            ("DELIVERY_FEE_USD", "2.50"),
            ("LOCAL_CURRENCY_CODE", "EUR"),
            ("LOCAL_CURRENCY_RATE", "0.92"),
            ("CHAT_RECOMMENDATIONS", "false"),
            ("STOREFRONT_BASE_URL", "https://shop.example"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.checkout.delivery_fee, Usd::from_cents(250));
        assert_eq!(config.checkout.local_currency.code, "EUR");
        assert!(!config.checkout.chat_recommendations);
        assert!(config.is_secure());
    }
}
