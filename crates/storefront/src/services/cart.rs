//! In-memory cart store.
//!
//! Carts are keyed by [`VisitorId`] and kept in a `moka` cache with an idle
//! expiry. They are never written to the session store and do not survive a
//! restart.

use std::sync::Arc;
use std::time::Duration;

use coffee_shop_core::Cart;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::models::VisitorId;

/// Idle time after which an untouched cart is dropped.
pub const CART_IDLE_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Shared handle to one visitor's cart.
pub type CartHandle = Arc<Mutex<Cart>>;

/// Per-visitor carts. Cheap to clone.
#[derive(Clone)]
pub struct CartStore {
    carts: Cache<VisitorId, CartHandle>,
}

impl CartStore {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self {
            carts: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// The visitor's cart, created empty on first use.
    pub async fn handle(&self, visitor: VisitorId) -> CartHandle {
        self.carts
            .get_with(visitor, async { Arc::new(Mutex::new(Cart::new())) })
            .await
    }

    /// A copy of the visitor's cart.
    pub async fn snapshot(&self, visitor: VisitorId) -> Cart {
        self.handle(visitor).await.lock().await.clone()
    }

    /// Add `delta` units of `name` (catalog "+" and detail page).
    pub async fn add(&self, visitor: VisitorId, name: &str, delta: i64) {
        self.handle(visitor).await.lock().await.add(name, delta);
    }

    /// Apply an order-page +/- step.
    pub async fn adjust_quantity(&self, visitor: VisitorId, name: &str, delta: i64) {
        self.handle(visitor)
            .await
            .lock()
            .await
            .adjust_quantity(name, delta);
    }

    /// Drop a line entirely.
    pub async fn remove(&self, visitor: VisitorId, name: &str) {
        let handle = self.handle(visitor).await;
        let mut cart = handle.lock().await;
        let quantity = cart.quantity(name);
        cart.adjust_quantity(name, -i64::from(quantity));
    }

    /// Total units in the visitor's cart, for the header badge.
    pub async fn item_count(&self, visitor: VisitorId) -> u64 {
        match self.carts.get(&visitor).await {
            Some(cart) => cart.lock().await.item_count(),
            None => 0,
        }
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(CART_IDLE_EXPIRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_carts_are_isolated_per_visitor() {
        let store = CartStore::default();
        let ana = VisitorId::new();
        let ben = VisitorId::new();

        store.add(ana, "Latte", 2).await;
        store.add(ben, "Muffin", 1).await;

        assert_eq!(store.snapshot(ana).await.quantity("Latte"), 2);
        assert_eq!(store.snapshot(ana).await.quantity("Muffin"), 0);
        assert_eq!(store.item_count(ben).await, 1);
    }

    #[tokio::test]
    async fn test_adjust_to_zero_removes_line() {
        let store = CartStore::default();
        let visitor = VisitorId::new();

        store.add(visitor, "Latte", 1).await;
        store.adjust_quantity(visitor, "Latte", -1).await;

        assert!(store.snapshot(visitor).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_drops_whole_line() {
        let store = CartStore::default();
        let visitor = VisitorId::new();

        store.add(visitor, "Latte", 3).await;
        store.add(visitor, "Muffin", 1).await;
        store.remove(visitor, "Latte").await;

        let cart = store.snapshot(visitor).await;
        assert_eq!(cart.quantity("Latte"), 0);
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_visitor_has_no_items() {
        let store = CartStore::default();
        assert_eq!(store.item_count(VisitorId::new()).await, 0);
    }
}
