//! Session-related types.
//!
//! What the visitor's session holds between requests. The cart itself is not
//! here: it lives in process memory keyed by [`VisitorId`].

use coffee_shop_core::DeliveryMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-visitor id, minted on first use and kept for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(Uuid);

impl VisitorId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VisitorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery choices on the order page, kept while the visitor edits the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPrefs {
    pub mode: DeliveryMode,
    pub address: String,
}

/// Session keys.
pub mod keys {
    /// Bearer token for the coffee shop API.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Message owed to the login screen after an account edit logged the visitor out.
    pub const LOGOUT_MESSAGE: &str = "logout_message";

    /// Visitor id keying the in-memory cart and in-flight registry.
    pub const VISITOR_ID: &str = "visitor_id";

    /// Chat transcript.
    pub const CHAT_TRANSCRIPT: &str = "chat_transcript";

    /// Checkout state machine.
    pub const CHECKOUT_FLOW: &str = "checkout_flow";

    /// Delivery mode and address on the order page.
    pub const ORDER_PREFS: &str = "order_prefs";

    /// Pending one-shot notices.
    pub const FLASH: &str = "flash";
}
