//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Browse (requires auth)
//! GET  /                       - Catalog grid with category chips and search
//! GET  /details/{id}           - Product detail
//! POST /cart/add               - Add to cart, then back to the referring page
//!
//! # Order (requires auth)
//! GET  /order                  - Cart lines, delivery choice, totals
//! POST /order/quantity         - +/- one line
//! POST /order/remove           - Drop a line
//! POST /order/delivery         - Save delivery mode and address
//! POST /order/checkout         - Create order, then auto-submit the payment form
//! GET  /thankyou               - Payment return (?status=&fromPayment=)
//!
//! # Chat (requires auth)
//! GET  /chat                   - Transcript
//! POST /chat/send              - Send a message
//! POST /chat/clear             - Wipe the transcript
//!
//! # Account (requires auth)
//! GET  /account                - Account details
//! POST /account                - Save account details
//! GET  /orders                 - Order history
//!
//! # Auth
//! GET  /login                  - Login page (?from=&message=)
//! POST /login                  - Login action
//! GET  /register               - Register page
//! POST /register               - Register action
//! POST /logout                 - Logout action
//! ```

pub mod account;
pub mod auth;
pub mod chat;
pub mod home;
pub mod order;
pub mod orders;
pub mod payment;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use coffee_shop_core::Identity;
use tower_sessions::Session;

use crate::models::{Flash, VisitorId, session_keys};
use crate::state::AppState;

/// Data every page's header needs.
pub struct Layout {
    pub user_name: Option<String>,
    pub cart_count: u64,
    pub flashes: Vec<Flash>,
}

impl Layout {
    /// Collect header data and take the pending notices.
    ///
    /// Call this only when a page is actually rendered; redirects must leave
    /// notices queued for the page they lead to.
    pub async fn load(state: &AppState, session: &Session, identity: Option<&Identity>) -> Self {
        let visitor = session
            .get::<VisitorId>(session_keys::VISITOR_ID)
            .await
            .ok()
            .flatten();
        let cart_count = match visitor {
            Some(visitor) => state.carts().item_count(visitor).await,
            None => 0,
        };

        Self {
            user_name: identity.map(|i| i.display_name.clone()),
            cart_count,
            flashes: Flash::take_all(session).await,
        }
    }
}

/// Queue a notice, logging instead of failing the request if the session
/// cannot take it.
pub async fn flash(session: &Session, notice: Flash) {
    if let Err(e) = notice.push(session).await {
        tracing::warn!(error = %e, "Failed to queue notice");
    }
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(order::show))
        .route("/quantity", post(order::adjust_quantity))
        .route("/remove", post(order::remove))
        .route("/delivery", post(order::update_delivery))
        .route("/checkout", post(order::checkout))
}

/// Create the chat routes router.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::show))
        .route("/send", post(chat::send))
        .route("/clear", post(chat::clear))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Browse
        .route("/", get(home::home))
        .route("/details/{id}", get(products::show))
        .route("/cart/add", post(products::add_to_cart))
        // Order and payment
        .nest("/order", order_routes())
        .route("/thankyou", get(payment::thank_you))
        // Chat
        .nest("/chat", chat_routes())
        // Account
        .route("/account", get(account::show).post(account::update))
        .route("/orders", get(orders::index))
        // Auth
        .merge(auth_routes())
}
