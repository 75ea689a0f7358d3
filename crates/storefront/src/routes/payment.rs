//! Payment return handler (`/thankyou`).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use coffee_shop_core::{PaymentReturn, ReconcileOutcome};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Layout;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAuth, Visitor};
use crate::services::ChatService;
use crate::services::checkout::{load_flow, store_flow};
use crate::state::AppState;

/// Query the payment processor appends to the return URL.
#[derive(Debug, Deserialize)]
pub struct PaymentReturnQuery {
    pub status: Option<String>,
    #[serde(rename = "fromPayment")]
    pub from_payment: Option<String>,
}

/// Thank-you page template, for both outcomes.
#[derive(Template, WebTemplate)]
#[template(path = "payment/thank_you.html")]
pub struct ThankYouTemplate {
    pub layout: Layout,
    pub success: bool,
    pub order_id: Option<String>,
    pub item_names: Vec<String>,
    pub recommendation: Option<String>,
}

/// Reconcile a return from the payment processor.
///
/// Without `fromPayment=true` and a known status this is a direct visit and
/// goes home untouched. A success empties the cart once; reloading the page
/// shows the same summary without clearing anything again. A failure keeps the
/// cart for another attempt.
#[instrument(skip(state, session, user, visitor))]
pub async fn thank_you(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
    Query(query): Query<PaymentReturnQuery>,
) -> Result<Response> {
    let ret = PaymentReturn::from_query(query.status.as_deref(), query.from_payment.as_deref());

    let mut flow = load_flow(&session).await?;
    let outcome = {
        let handle = state.carts().handle(visitor).await;
        let mut cart = handle.lock().await;
        flow.reconcile(ret, &mut cart)
    };
    store_flow(&session, &flow).await?;

    let (success, order_id, item_names) = match outcome {
        ReconcileOutcome::DirectNavigation => return Ok(Redirect::to("/").into_response()),
        ReconcileOutcome::Completed {
            cleared,
            order_id,
            item_names,
        } => {
            if cleared {
                tracing::info!(order_id = ?order_id, "Payment confirmed; cart emptied");
                add_breadcrumb("checkout", "Payment confirmed", None);
            }
            (true, order_id, item_names)
        }
        ReconcileOutcome::Failed { order_id } => {
            tracing::info!(order_id = ?order_id, "Payment failed; cart kept");
            (false, order_id, Vec::new())
        }
    };

    let recommendation = if success && state.config().checkout.chat_recommendations {
        ChatService::new(state.api(), state.carts(), state.in_flight())
            .recommend(&item_names)
            .await
    } else {
        None
    };

    Ok(ThankYouTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        success,
        order_id: order_id.map(|id| id.to_string()),
        item_names,
        recommendation,
    }
    .into_response())
}
