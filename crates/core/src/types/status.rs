//! Small closed enums shared between the storefront and the API wire format.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an order reaches the customer.
///
/// The wire values are the labels the API stores: `"Deliver"` and `"Pick Up"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliveryMode {
    #[default]
    #[serde(rename = "Deliver")]
    Deliver,
    #[serde(rename = "Pick Up")]
    PickUp,
}

impl DeliveryMode {
    /// The label used on the wire and in forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deliver => "Deliver",
            Self::PickUp => "Pick Up",
        }
    }

    /// Whether this mode needs a delivery address.
    #[must_use]
    pub const fn requires_address(self) -> bool {
        matches!(self, Self::Deliver)
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a delivery mode label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown delivery mode: {0}")]
pub struct UnknownDeliveryMode(pub String);

impl FromStr for DeliveryMode {
    type Err = UnknownDeliveryMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Deliver" | "deliver" => Ok(Self::Deliver),
            "Pick Up" | "pick_up" | "pickup" | "PickUp" => Ok(Self::PickUp),
            other => Err(UnknownDeliveryMode(other.to_string())),
        }
    }
}

/// Outcome reported by the payment processor on the return redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    /// Replies from the remote agent. Older transcripts used `"bot"`.
    #[serde(alias = "bot")]
    Assistant,
}
