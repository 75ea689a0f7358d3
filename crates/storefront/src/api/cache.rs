//! Cache types for API responses.

use coffee_shop_core::Catalog;

/// Cache key for API responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Catalog),
}
