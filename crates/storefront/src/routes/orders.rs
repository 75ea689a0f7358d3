//! Order history route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use coffee_shop_core::order::newest_first;
use coffee_shop_core::{LocalCurrency, OrderRecord};
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::auth;
use crate::state::AppState;

/// One line of a past order.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Past order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub order_id: String,
    pub placed_at: String,
    pub status: String,
    pub delivery_mode: String,
    pub address: Option<String>,
    pub items: Vec<OrderItemView>,
    pub total_usd: String,
    pub total_local: String,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &OrderRecord, currency: &LocalCurrency) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            placed_at: order.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            status: order.status.clone(),
            delivery_mode: order.delivery_mode.to_string(),
            address: order.address.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: item.price.to_string(),
                    line_total: item.line_total().to_string(),
                })
                .collect(),
            total_usd: order.total_usd.to_string(),
            total_local: order.total_local(currency).to_string(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub load_failed: bool,
}

/// Display the customer's orders, newest first.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let (orders, load_failed) = match state
        .api()
        .get_orders(&user.token, user.identity.email.as_str())
        .await
    {
        Ok(mut orders) => {
            newest_first(&mut orders);
            let currency = &state.config().checkout.local_currency;
            (
                orders.iter().map(|o| OrderView::new(o, currency)).collect(),
                false,
            )
        }
        Err(e) if e.is_unauthorized() => {
            return Err(
                auth::handle_api_error(&session, state.revoked_tokens(), "/orders", e).await,
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load orders");
            (Vec::new(), true)
        }
    };

    Ok(OrdersTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        orders,
        load_failed,
    })
}
