//! Order page route handlers: cart lines, delivery choice and checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use coffee_shop_core::checkout::{self, display_total};
use coffee_shop_core::{Cart, Catalog, DeliveryMode, Usd};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, flash};
use crate::config::CheckoutConfig;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, Visitor};
use crate::models::{Flash, OrderPrefs};
use crate::services::checkout::{
    ORDER_FAILED_MESSAGE, load_flow, load_prefs, store_flow, store_prefs,
};
use crate::services::{Action, CheckoutService, PaymentRedirect, SubmitError, auth};
use crate::state::AppState;

/// Where every order-page action lands.
const ORDER_PATH: &str = "/order";

/// One cart line on the order page.
#[derive(Clone)]
pub struct LineView {
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    /// False when the catalog no longer has this product.
    pub available: bool,
}

/// Order page display data.
#[derive(Clone)]
pub struct OrderView {
    pub lines: Vec<LineView>,
    pub deliver: bool,
    pub address: String,
    pub address_error: Option<String>,
    pub unavailable: Vec<String>,
    pub subtotal: String,
    pub fee: String,
    pub total: String,
    /// Everything but the address is ready; the page re-checks the address
    /// as it is typed.
    pub items_ready: bool,
    pub can_submit: bool,
    pub submitting: bool,
    /// The menu could not be fetched, so nothing is priced.
    pub menu_unavailable: bool,
}

impl OrderView {
    /// Price the cart for display. Never fails: problems become inline
    /// errors and a disabled submit button.
    ///
    /// Without a catalog the lines are listed unpriced and submission is
    /// disabled.
    #[must_use]
    pub fn build(
        cart: &Cart,
        catalog: Option<&Catalog>,
        prefs: &OrderPrefs,
        config: &CheckoutConfig,
        submitting: bool,
    ) -> Self {
        let Some(catalog) = catalog else {
            return Self::unpriced(cart, prefs, submitting);
        };

        let lines: Vec<LineView> = cart
            .iter()
            .map(|(name, quantity)| match catalog.find_by_name(name) {
                Some(product) => LineView {
                    name: name.to_owned(),
                    quantity,
                    unit_price: product.price.to_string(),
                    line_total: (product.price * quantity).to_string(),
                    available: true,
                },
                None => LineView {
                    name: name.to_owned(),
                    quantity,
                    unit_price: "-".to_string(),
                    line_total: "-".to_string(),
                    available: false,
                },
            })
            .collect();

        let subtotal = cart.total(catalog);
        let fee = if prefs.mode.requires_address() {
            config.delivery_fee
        } else {
            Usd::ZERO
        };
        let total = display_total(subtotal, prefs.mode, config.delivery_fee);
        let address_error = checkout::validate(prefs.mode, &prefs.address)
            .err()
            .map(|e| e.to_string());
        let unavailable = cart.unknown_products(catalog);

        let items_ready =
            !cart.is_empty() && !subtotal.is_zero() && unavailable.is_empty() && !submitting;
        let can_submit = items_ready && address_error.is_none();

        Self {
            lines,
            deliver: prefs.mode.requires_address(),
            address: prefs.address.clone(),
            address_error,
            unavailable,
            subtotal: subtotal.to_string(),
            fee: fee.to_string(),
            total: total.to_string(),
            items_ready,
            can_submit,
            submitting,
            menu_unavailable: false,
        }
    }

    fn unpriced(cart: &Cart, prefs: &OrderPrefs, submitting: bool) -> Self {
        let lines = cart
            .iter()
            .map(|(name, quantity)| LineView {
                name: name.to_owned(),
                quantity,
                unit_price: "-".to_string(),
                line_total: "-".to_string(),
                available: true,
            })
            .collect();

        Self {
            lines,
            deliver: prefs.mode.requires_address(),
            address: prefs.address.clone(),
            address_error: checkout::validate(prefs.mode, &prefs.address)
                .err()
                .map(|e| e.to_string()),
            unavailable: Vec::new(),
            subtotal: "-".to_string(),
            fee: "-".to_string(),
            total: "-".to_string(),
            items_ready: false,
            can_submit: false,
            submitting,
            menu_unavailable: true,
        }
    }
}

/// Order page template.
#[derive(Template, WebTemplate)]
#[template(path = "order/show.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

/// Auto-submitting form that hands the visitor to the payment processor.
#[derive(Template, WebTemplate)]
#[template(path = "order/payment_redirect.html")]
pub struct PaymentRedirectTemplate {
    pub payment: PaymentRedirect,
}

/// Quantity step form data.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub product_name: String,
    pub delta: i64,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_name: String,
}

/// Delivery choice form data; also posted with checkout.
#[derive(Debug, Deserialize)]
pub struct DeliveryForm {
    pub mode: String,
    #[serde(default)]
    pub address: String,
}

impl DeliveryForm {
    fn into_prefs(self) -> Result<OrderPrefs> {
        let mode = self
            .mode
            .parse::<DeliveryMode>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(OrderPrefs {
            mode,
            address: self.address,
        })
    }
}

/// Display the order page.
///
/// Coming back here after a payment outcome starts a new round of editing.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
) -> Result<impl IntoResponse> {
    let mut flow = load_flow(&session).await?;
    flow.resume_editing();
    store_flow(&session, &flow).await?;

    let prefs = load_prefs(&session).await?;
    let catalog = match state.api().get_products().await {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load the menu for the order page");
            None
        }
    };
    let cart = state.carts().snapshot(visitor).await;
    let submitting = state.in_flight().is_pending(visitor, Action::Checkout);

    Ok(OrderTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        order: OrderView::build(
            &cart,
            catalog.as_ref(),
            &prefs,
            &state.config().checkout,
            submitting,
        ),
    })
}

/// Apply a +/- step to one line.
#[instrument(skip_all, fields(product = %form.product_name))]
pub async fn adjust_quantity(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Visitor(visitor): Visitor,
    Form(form): Form<QuantityForm>,
) -> Redirect {
    state
        .carts()
        .adjust_quantity(visitor, &form.product_name, form.delta)
        .await;
    Redirect::to(ORDER_PATH)
}

/// Drop a line, e.g. one the catalog no longer sells.
#[instrument(skip_all, fields(product = %form.product_name))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Visitor(visitor): Visitor,
    Form(form): Form<RemoveForm>,
) -> Redirect {
    state.carts().remove(visitor, &form.product_name).await;
    Redirect::to(ORDER_PATH)
}

/// Save the delivery mode and address.
#[instrument(skip_all)]
pub async fn update_delivery(
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<DeliveryForm>,
) -> Result<Redirect> {
    store_prefs(&session, &form.into_prefs()?).await?;
    Ok(Redirect::to(ORDER_PATH))
}

/// Submit the order.
///
/// On success renders the auto-submitting payment form. On any failure the
/// visitor goes back to the order page with a notice and an unchanged cart;
/// a rejected token logs them out instead.
#[instrument(skip_all, fields(visitor = %visitor))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
    Form(form): Form<DeliveryForm>,
) -> Result<Response> {
    let prefs = form.into_prefs()?;
    store_prefs(&session, &prefs).await?;

    let Some(_slot) = state.in_flight().try_begin(visitor, Action::Checkout) else {
        flash(&session, Flash::info("Your order is already being placed.")).await;
        return Ok(Redirect::to(ORDER_PATH).into_response());
    };

    let mut flow = load_flow(&session).await?;
    let catalog = match state.api().get_products().await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(error = %e, "Menu unavailable at checkout");
            flash(&session, Flash::error(ORDER_FAILED_MESSAGE)).await;
            return Ok(Redirect::to(ORDER_PATH).into_response());
        }
    };
    let cart = state.carts().snapshot(visitor).await;

    let result = CheckoutService::new(state.api(), &state.config().checkout)
        .submit(&user, &cart, &catalog, &prefs, &mut flow)
        .await;
    store_flow(&session, &flow).await?;

    match result {
        Ok(payment) => Ok(PaymentRedirectTemplate { payment }.into_response()),
        Err(SubmitError::CreateOrder(e) | SubmitError::InitiatePayment(e))
            if e.is_unauthorized() =>
        {
            Err(auth::handle_api_error(&session, state.revoked_tokens(), ORDER_PATH, e).await)
        }
        Err(e) => {
            if matches!(e, SubmitError::Draft(checkout::DraftError::UnknownProducts(_))) {
                // The cached menu may predate a product the cart names.
                state.api().invalidate_products().await;
            }
            tracing::warn!(error = %e, "Checkout did not reach the payment processor");
            flash(&session, Flash::error(e.user_message())).await;
            Ok(Redirect::to(ORDER_PATH).into_response())
        }
    }
}
