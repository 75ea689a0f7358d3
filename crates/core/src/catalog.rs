//! Product catalog and client-side browsing filters.

use serde::{Deserialize, Serialize};

use crate::types::{ProductId, Usd};

/// Category chip that shows every product.
pub const ALL_CATEGORIES: &str = "All";

/// Highest rating a product can carry.
pub const MAX_RATING: f32 = 5.0;

/// A product as sold by the shop. Read-only on this side of the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Server-generated id, used in product URLs.
    pub id: ProductId,
    /// Unique display name; doubles as the cart key.
    pub name: String,
    pub category: String,
    pub price: Usd,
    pub image_url: String,
    /// Average rating in `[0, 5]`.
    pub rating: f32,
    pub description: String,
}

impl Product {
    /// Create a product with no image, rating or description.
    #[must_use]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Usd,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            price,
            image_url: String::new(),
            rating: 0.0,
            description: String::new(),
        }
    }

    /// Clamp a raw rating into `[0, 5]`; NaN becomes 0.
    #[must_use]
    pub fn clamp_rating(raw: f32) -> f32 {
        if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, MAX_RATING)
        }
    }
}

/// A category chip for the browse screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub selected: bool,
}

/// Browse filter: selected category plus a free-text name search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// `None` or `"All"` shows every category.
    pub category: Option<String>,
    /// Case-insensitive substring match on the product name.
    pub query: Option<String>,
}

impl Filter {
    /// The selected category id, defaulting to [`ALL_CATEGORIES`].
    #[must_use]
    pub fn selected_category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CATEGORIES)
    }

    /// The trimmed search text, if any.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.selected_category() != ALL_CATEGORIES || self.search_text().is_some()
    }

    fn matches(&self, product: &Product, needle: Option<&str>) -> bool {
        let category = self.selected_category();
        if category != ALL_CATEGORIES && product.category != category {
            return false;
        }
        needle.is_none_or(|needle| product.name.to_lowercase().contains(needle))
    }
}

/// The product list fetched from the API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Look a product up by its display name (the cart key).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Look a product up by its server id (the URL key).
    #[must_use]
    pub fn find_by_id(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Category chips: `All` first, then each category in first-seen order.
    #[must_use]
    pub fn categories(&self, selected: &str) -> Vec<Category> {
        let mut ids: Vec<&str> = vec![ALL_CATEGORIES];
        for product in &self.products {
            if !ids.contains(&product.category.as_str()) {
                ids.push(&product.category);
            }
        }

        ids.into_iter()
            .map(|id| Category {
                id: id.to_owned(),
                selected: id == selected,
            })
            .collect()
    }

    /// Products matching the filter, in catalog order.
    #[must_use]
    pub fn filter(&self, filter: &Filter) -> Vec<&Product> {
        let needle = filter.search_text().map(str::to_lowercase);
        self.products
            .iter()
            .filter(|p| filter.matches(p, needle.as_deref()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Product::new(ProductId::new("a"), "Cappuccino", "Coffee", Usd::from_cents(450)),
            Product::new(ProductId::new("b"), "Chocolate Croissant", "Bakery", Usd::from_cents(375)),
            Product::new(ProductId::new("c"), "Iced Latte", "Coffee", Usd::from_cents(500)),
            Product::new(ProductId::new("d"), "Earl Grey", "Tea", Usd::from_cents(300)),
        ])
    }

    fn names(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_categories_all_first_then_first_seen() {
        let ids: Vec<_> = catalog()
            .categories(ALL_CATEGORIES)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["All", "Coffee", "Bakery", "Tea"]);
    }

    #[test]
    fn test_categories_mark_selection() {
        let cats = catalog().categories("Tea");
        let selected: Vec<_> = cats.iter().filter(|c| c.selected).map(|c| c.id.as_str()).collect();
        assert_eq!(selected, vec!["Tea"]);
    }

    #[test]
    fn test_filter_default_shows_everything() {
        let catalog = catalog();
        assert_eq!(catalog.filter(&Filter::default()).len(), 4);
        assert!(!Filter::default().is_active());
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = catalog();
        let filter = Filter {
            category: Some("Coffee".to_string()),
            query: None,
        };
        assert_eq!(names(&catalog.filter(&filter)), vec!["Cappuccino", "Iced Latte"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = catalog();
        let filter = Filter {
            category: None,
            query: Some("  LATTE ".to_string()),
        };
        assert_eq!(names(&catalog.filter(&filter)), vec!["Iced Latte"]);
    }

    #[test]
    fn test_search_and_category_combine() {
        let catalog = catalog();
        let filter = Filter {
            category: Some("Bakery".to_string()),
            query: Some("c".to_string()),
        };
        assert_eq!(names(&catalog.filter(&filter)), vec!["Chocolate Croissant"]);

        let filter = Filter {
            category: Some("Tea".to_string()),
            query: Some("latte".to_string()),
        };
        assert!(catalog.filter(&filter).is_empty());
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let catalog = catalog();
        assert_eq!(catalog.find_by_name("Earl Grey").unwrap().id, ProductId::new("d"));
        assert_eq!(catalog.find_by_id(&ProductId::new("a")).unwrap().name, "Cappuccino");
        assert!(catalog.find_by_name("earl grey").is_none());
    }

    #[test]
    fn test_clamp_rating() {
        assert!((Product::clamp_rating(7.5) - 5.0).abs() < f32::EPSILON);
        assert!(Product::clamp_rating(-1.0).abs() < f32::EPSILON);
        assert!(Product::clamp_rating(f32::NAN).abs() < f32::EPSILON);
        assert!((Product::clamp_rating(4.2) - 4.2).abs() < f32::EPSILON);
    }
}
