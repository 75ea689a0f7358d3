//! Checkout service: order submission and the hand-off to the payment processor.
//!
//! The checkout state machine and the order-page delivery choices are kept in
//! the visitor's session. `Submitting` is never persisted: a submission runs
//! inside one request, under an in-flight slot, and leaves the flow either
//! awaiting the payment redirect or back in editing.

use coffee_shop_core::checkout::{CheckoutError, DraftError};
use coffee_shop_core::{Cart, Catalog, CheckoutFlow, OrderDraft};
use serde_json::Value;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;
use url::Url;

use crate::api::{ApiError, CoffeeApiClient, PaymentFields};
use crate::config::CheckoutConfig;
use crate::middleware::CurrentUser;
use crate::models::{OrderPrefs, session_keys};

/// Shown when order creation fails for any reason other than a rejected token.
pub const ORDER_FAILED_MESSAGE: &str = "Failed to create order. Please try again.";

/// Shown when the order exists but payment could not be initiated.
pub const PAYMENT_FAILED_MESSAGE: &str = "Failed to initiate payment. Please try again.";

/// Why a submission did not reach the payment processor.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The draft is invalid; no network call was made.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// A submission is already running.
    #[error(transparent)]
    Flow(#[from] CheckoutError),

    /// `POST /create-order` failed.
    #[error("order creation failed: {0}")]
    CreateOrder(#[source] ApiError),

    /// `POST /initiate-payment/{id}` failed.
    #[error("payment initiation failed: {0}")]
    InitiatePayment(#[source] ApiError),
}

impl SubmitError {
    /// The API error behind a network failure, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::CreateOrder(e) | Self::InitiatePayment(e) => Some(e),
            Self::Draft(_) | Self::Flow(_) => None,
        }
    }

    /// Notice to show the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Draft(e) => e.to_string(),
            Self::Flow(_) => "Your order is already being placed.".to_string(),
            Self::CreateOrder(_) => ORDER_FAILED_MESSAGE.to_string(),
            Self::InitiatePayment(_) => PAYMENT_FAILED_MESSAGE.to_string(),
        }
    }
}

/// A same-tab form POST to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRedirect {
    pub action_url: String,
    /// Field name and value pairs.
    pub fields: Vec<(String, String)>,
}

impl PaymentRedirect {
    /// Forward the pre-signed fields verbatim.
    #[must_use]
    pub fn new(action_url: &Url, fields: &PaymentFields) -> Self {
        Self {
            action_url: action_url.to_string(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.clone(), form_value(value)))
                .collect(),
        }
    }
}

/// Render a JSON value as a browser would when it sets it on a form input:
/// strings unchanged, numbers in their shortest form (`100.0` becomes `100`).
fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string())
            }
        }
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    api: &'a CoffeeApiClient,
    config: &'a CheckoutConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(api: &'a CoffeeApiClient, config: &'a CheckoutConfig) -> Self {
        Self { api, config }
    }

    /// Create the order and fetch its payment form.
    ///
    /// On a draft error nothing is sent. On a network error the flow returns to
    /// editing. The cart is never touched here: it is only emptied once the
    /// payment processor reports success.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`].
    #[instrument(skip_all, fields(email = %user.identity.email, mode = %prefs.mode))]
    pub async fn submit(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        catalog: &Catalog,
        prefs: &OrderPrefs,
        flow: &mut CheckoutFlow,
    ) -> Result<PaymentRedirect, SubmitError> {
        let draft = OrderDraft::build(
            cart,
            catalog,
            prefs.mode,
            &prefs.address,
            self.config.delivery_fee,
        )?;

        flow.begin_submit()?;

        let order_id = match self
            .api
            .create_order(&user.token, user.identity.email.as_str(), &draft)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                flow.network_failed();
                return Err(SubmitError::CreateOrder(e));
            }
        };
        tracing::info!(order_id = %order_id, total = %draft.total, "Order created");

        flow.order_created(order_id.clone(), draft.item_names())?;

        let fields = match self.api.initiate_payment(&user.token, &order_id).await {
            Ok(fields) => fields,
            Err(e) => {
                flow.network_failed();
                return Err(SubmitError::InitiatePayment(e));
            }
        };

        Ok(PaymentRedirect::new(&self.config.payment_form_url, &fields))
    }
}

/// Read the checkout flow from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn load_flow(session: &Session) -> Result<CheckoutFlow, tower_sessions::session::Error> {
    Ok(session
        .get(session_keys::CHECKOUT_FLOW)
        .await?
        .unwrap_or_default())
}

/// Write the checkout flow to the session.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn store_flow(
    session: &Session,
    flow: &CheckoutFlow,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CHECKOUT_FLOW, flow).await
}

/// Read the order-page delivery choices.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn load_prefs(session: &Session) -> Result<OrderPrefs, tower_sessions::session::Error> {
    Ok(session
        .get(session_keys::ORDER_PREFS)
        .await?
        .unwrap_or_default())
}

/// Write the order-page delivery choices.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn store_prefs(
    session: &Session,
    prefs: &OrderPrefs,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::ORDER_PREFS, prefs).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_form_values_render_like_a_browser() {
        assert_eq!(form_value(&json!("EPAYTEST")), "EPAYTEST");
        assert_eq!(form_value(&json!(100)), "100");
        assert_eq!(form_value(&json!(100.0)), "100");
        assert_eq!(form_value(&json!(10.5)), "10.5");
        assert_eq!(form_value(&json!(0)), "0");
        assert_eq!(form_value(&json!(null)), "null");
        assert_eq!(form_value(&json!(true)), "true");
    }

    #[test]
    fn test_payment_redirect_forwards_every_field() {
        let fields: PaymentFields = serde_json::from_value(json!({
            "amount": 10.0,
            "tax_amount": 0,
            "total_amount": "10",
            "transaction_uuid": "ord-1",
            "signed_field_names": "total_amount,transaction_uuid,product_code"
        }))
        .unwrap();
        let url = Url::parse("https://pay.example/form").unwrap();

        let redirect = PaymentRedirect::new(&url, &fields);

        assert_eq!(redirect.action_url, "https://pay.example/form");
        assert_eq!(redirect.fields.len(), 5);
        assert!(redirect.fields.contains(&("amount".to_string(), "10".to_string())));
        assert!(
            redirect
                .fields
                .contains(&("total_amount".to_string(), "10".to_string()))
        );
    }

    #[test]
    fn test_draft_errors_are_shown_verbatim() {
        let err = SubmitError::Draft(DraftError::EmptyCart);
        assert_eq!(err.user_message(), "Your cart is empty.");
        assert!(err.api_error().is_none());

        let err = SubmitError::CreateOrder(ApiError::Unauthorized);
        assert_eq!(err.user_message(), ORDER_FAILED_MESSAGE);
        assert!(err.api_error().is_some_and(ApiError::is_unauthorized));
    }
}
