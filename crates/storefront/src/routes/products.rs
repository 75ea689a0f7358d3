//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use coffee_shop_core::guard;
use coffee_shop_core::{Product, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, flash};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAuth, Visitor};
use crate::models::Flash;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub image_url: String,
    pub rating: String,
    pub stars: String,
    pub description: String,
    /// Units of this product already in the cart.
    pub in_cart: u32,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, in_cart: u32) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            image_url: product.image_url.clone(),
            rating: format!("{:.1}", product.rating),
            stars: stars(product.rating),
            description: product.description.clone(),
            in_cart,
        }
    }
}

/// Five-star bar for a rating in `[0, 5]`, rounded to the nearest star.
fn stars(rating: f32) -> String {
    (0u8..5)
        .map(|i| if f32::from(i) + 0.5 <= rating { '★' } else { '☆' })
        .collect()
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    /// Page to go back to afterwards.
    pub return_to: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
}

/// Display product detail page.
#[instrument(skip(state, session, user, visitor))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let catalog = state.api().get_products().await?;
    let product = catalog
        .find_by_id(&ProductId::new(id))
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let in_cart = state.carts().snapshot(visitor).await.quantity(&product.name);

    Ok(ProductShowTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        product: ProductView::new(product, in_cart),
    })
}

/// Add a product to the cart and go back where the visitor came from.
#[instrument(skip_all)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Visitor(visitor): Visitor,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let back = guard::post_login_target(form.return_to.as_deref()).to_owned();
    let catalog = state.api().get_products().await?;

    let Some(product) = catalog.find_by_id(&ProductId::new(form.product_id)) else {
        flash(&session, Flash::error("That product is no longer available.")).await;
        return Ok(Redirect::to(&back));
    };

    let quantity = form.quantity.unwrap_or(1).max(1);
    state
        .carts()
        .add(visitor, &product.name, i64::from(quantity))
        .await;

    add_breadcrumb("cart", "Added product", Some(&[("product", product.name.as_str())]));
    flash(&session, Flash::success(format!("{} added to cart", product.name))).await;

    Ok(Redirect::to(&back))
}
