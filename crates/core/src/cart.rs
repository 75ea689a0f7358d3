//! The cart: product name → quantity bookkeeping.
//!
//! The cart is keyed by product *name* (the catalog's unique display key, not
//! the server id) and stores no prices; totals are always recomputed from the
//! current catalog.
//!
//! Both mutation paths share one rule: a quantity that drops to zero or below
//! removes the line. The cart therefore never holds a zero or negative entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::types::Usd;

/// One (product, quantity) pair, as used by chat directives and order payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub name: String,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Mapping from product name to a strictly positive quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeMap<String, u32>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signed quantity delta to a product.
    ///
    /// Used by the catalog "+" buttons, the product page and chat directives.
    /// Despite the name this is a relative adjustment; a result at or below
    /// zero removes the line.
    pub fn add(&mut self, name: &str, delta: i64) {
        self.apply_delta(name, delta);
    }

    /// Apply a +/- adjustment from the order page.
    ///
    /// Same semantics as [`Cart::add`].
    pub fn adjust_quantity(&mut self, name: &str, delta: i64) {
        self.apply_delta(name, delta);
    }

    fn apply_delta(&mut self, name: &str, delta: i64) {
        let current = i64::from(self.quantity(name));
        let next = current.saturating_add(delta);

        if next <= 0 {
            self.items.remove(name);
            return;
        }

        let quantity = u32::try_from(next).unwrap_or(u32::MAX);
        self.items.insert(name.to_owned(), quantity);
    }

    /// Remove every line.
    pub fn empty(&mut self) {
        self.items.clear();
    }

    /// Replace the whole cart with `lines`.
    ///
    /// The cart is cleared first and each line is then added with [`Cart::add`]
    /// semantics, so duplicate names accumulate and zero quantities vanish.
    pub fn replace<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a CartLine>,
    {
        self.empty();
        for line in lines {
            self.add(&line.name, i64::from(line.quantity));
        }
    }

    /// Quantity for a product, zero if absent.
    #[must_use]
    pub fn quantity(&self, name: &str) -> u32 {
        self.items.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.values().map(|&q| u64::from(q)).sum()
    }

    /// Product names in the cart, in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Iterate over `(name, quantity)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(name, &q)| (name.as_str(), q))
    }

    /// Sum of catalog price × quantity over lines whose product is in the catalog.
    ///
    /// Lines referencing products the catalog no longer has contribute nothing;
    /// use [`Cart::unknown_products`] to surface them.
    #[must_use]
    pub fn total(&self, catalog: &Catalog) -> Usd {
        self.iter()
            .filter_map(|(name, quantity)| {
                catalog
                    .find_by_name(name)
                    .map(|product| product.price * quantity)
            })
            .sum()
    }

    /// Names of cart lines whose product is missing from the catalog.
    #[must_use]
    pub fn unknown_products(&self, catalog: &Catalog) -> Vec<String> {
        self.names()
            .filter(|name| catalog.find_by_name(name).is_none())
            .map(ToOwned::to_owned)
            .collect()
    }
}
