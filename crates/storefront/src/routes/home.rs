//! Home page route handler: the catalog grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use coffee_shop_core::{Category, Filter};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use super::products::ProductView;
use crate::middleware::{RequireAuth, Visitor};
use crate::state::AppState;

/// Browse query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

/// Category chip display data.
#[derive(Clone)]
pub struct CategoryView {
    pub id: String,
    pub selected: bool,
    /// Link that keeps the current search.
    pub href: String,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductView>,
    pub search: String,
    pub selected_category: String,
    pub filtered: bool,
    pub load_failed: bool,
    /// Current URL, so add-to-cart comes back here.
    pub return_to: String,
}

fn chip(category: Category, search: &str) -> CategoryView {
    let mut href = format!("/?category={}", urlencoding::encode(&category.id));
    if !search.is_empty() {
        href.push_str("&q=");
        href.push_str(&urlencoding::encode(search));
    }
    CategoryView {
        id: category.id,
        selected: category.selected,
        href,
    }
}

/// Display the catalog with category chips and name search.
#[instrument(skip(state, session, user, visitor))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
    Query(query): Query<BrowseQuery>,
) -> impl IntoResponse {
    let filter = Filter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        query: query.q.filter(|q| !q.trim().is_empty()),
    };
    let search = filter.query.clone().unwrap_or_default();

    let (categories, products, load_failed) = match state.api().get_products().await {
        Ok(catalog) => {
            let cart = state.carts().snapshot(visitor).await;
            let categories = catalog
                .categories(filter.selected_category())
                .into_iter()
                .map(|c| chip(c, &search))
                .collect();
            let products = catalog
                .filter(&filter)
                .into_iter()
                .map(|p| ProductView::new(p, cart.quantity(&p.name)))
                .collect();
            (categories, products, false)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            (Vec::new(), Vec::new(), true)
        }
    };

    let mut return_to = String::from("/");
    if filter.is_active() {
        return_to = chip(
            Category {
                id: filter.selected_category().to_owned(),
                selected: true,
            },
            &search,
        )
        .href;
    }

    HomeTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        categories,
        products,
        selected_category: filter.selected_category().to_owned(),
        filtered: filter.is_active(),
        search,
        load_failed,
        return_to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_keeps_search() {
        let view = chip(
            Category {
                id: "Cold Drinks".to_string(),
                selected: false,
            },
            "iced latte",
        );
        assert_eq!(view.href, "/?category=Cold%20Drinks&q=iced%20latte");
    }

    #[test]
    fn test_chip_without_search() {
        let view = chip(
            Category {
                id: "All".to_string(),
                selected: true,
            },
            "",
        );
        assert_eq!(view.href, "/?category=All");
        assert!(view.selected);
    }
}
