//! Tokens that were logged out.
//!
//! The session store saves the whole record when a request ends, so a request
//! that started before a logout can write the old token back. Every logout
//! records its token here and [`load_auth_session`](crate::middleware::load_auth_session)
//! refuses to restore a recorded one.

use std::time::Duration;

use coffee_shop_core::BearerToken;
use moka::future::Cache;

/// How long a logged-out token stays refused; matches the session inactivity
/// expiry.
pub const REVOKED_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Logged-out bearer tokens. Cheap to clone.
#[derive(Clone)]
pub struct RevokedTokens {
    tokens: Cache<String, ()>,
}

impl RevokedTokens {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Refuse `token` from now on.
    pub async fn revoke(&self, token: &BearerToken) {
        self.tokens.insert(token.expose().to_owned(), ()).await;
    }

    /// Accept `token` again after the API issued it on a fresh login.
    pub async fn forget(&self, token: &BearerToken) {
        self.tokens.invalidate(token.expose()).await;
    }

    #[must_use]
    pub fn is_revoked(&self, token: &BearerToken) -> bool {
        self.tokens.contains_key(token.expose())
    }
}

impl Default for RevokedTokens {
    fn default() -> Self {
        Self::new(REVOKED_TOKEN_TTL)
    }
}
