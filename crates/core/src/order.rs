//! Order history records, as stored by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeliveryMode, LocalAmount, LocalCurrency, OrderId, Usd};

/// One line of a placed order. The unit price is the one charged at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: u32,
    pub price: Usd,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Usd {
        self.price * self.quantity
    }
}

/// A placed order. Read-only on this side of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    /// Includes the delivery fee, if any.
    pub total_usd: Usd,
    /// Free-form status string owned by the API ("pending", "paid", ...).
    pub status: String,
    pub delivery_mode: DeliveryMode,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Total in the local display currency.
    #[must_use]
    pub fn total_local(&self, currency: &LocalCurrency) -> LocalAmount {
        self.total_usd.to_local(currency)
    }

    /// Total number of units ordered.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Sort orders newest first.
pub fn newest_first(orders: &mut [OrderRecord]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
