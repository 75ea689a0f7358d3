//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use coffee_shop_core::profile::REAUTH_MESSAGE;
use coffee_shop_core::{Email, Profile};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, flash};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::services::auth;
use crate::state::AppState;

const ACCOUNT_PATH: &str = "/account";
const ACCOUNT_EDIT_PATH: &str = "/account?edit=true";

/// Shown when the API refuses the new details.
pub const UPDATE_FAILED_MESSAGE: &str =
    "Failed to update account details. Email may already be taken.";

/// Account page query.
#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub edit: bool,
}

/// Account edit form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl From<AccountForm> for Profile {
    fn from(form: AccountForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            phone_number: form.phone_number,
        }
        .trimmed()
    }
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/show.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub editing: bool,
}

/// Display account details, or the edit form with `?edit=true`.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<AccountQuery>,
) -> Result<impl IntoResponse> {
    let profile = match state.api().get_profile(&user.token).await {
        Ok(profile) => profile,
        Err(e) => {
            return Err(
                auth::handle_api_error(&session, state.revoked_tokens(), ACCOUNT_PATH, e).await,
            );
        }
    };

    Ok(AccountTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        profile,
        editing: query.edit,
    })
}

/// Save account details.
///
/// The bearer token carries the customer's identity, so changing any of these
/// fields logs the customer out and sends them to the login page with an
/// explanation. Unchanged details keep the session.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    let updated = Profile::from(form);
    if updated.name.is_empty() || updated.phone_number.is_empty() {
        flash(&session, Flash::error("Name and phone number are required.")).await;
        return Ok(Redirect::to(ACCOUNT_EDIT_PATH).into_response());
    }
    if let Err(e) = Email::parse(&updated.email) {
        flash(&session, Flash::error(format!("Invalid email: {e}"))).await;
        return Ok(Redirect::to(ACCOUNT_EDIT_PATH).into_response());
    }

    let current = match state.api().get_profile(&user.token).await {
        Ok(profile) => profile,
        Err(e) => {
            return Err(
                auth::handle_api_error(&session, state.revoked_tokens(), ACCOUNT_PATH, e).await,
            );
        }
    };

    if let Err(e) = state.api().update_profile(&user.token, &updated).await {
        if e.is_unauthorized() {
            return Err(
                auth::handle_api_error(&session, state.revoked_tokens(), ACCOUNT_PATH, e).await,
            );
        }
        tracing::warn!(error = %e, "Account update rejected");
        flash(&session, Flash::error(UPDATE_FAILED_MESSAGE)).await;
        return Ok(Redirect::to(ACCOUNT_EDIT_PATH).into_response());
    }

    if current.requires_reauth(&updated) {
        tracing::info!("Account details changed; logging out for re-authentication");
        let login_url =
            auth::invalidate(&session, state.revoked_tokens(), REAUTH_MESSAGE, ACCOUNT_PATH)
                .await?;
        return Ok(Redirect::to(&login_url).into_response());
    }

    flash(&session, Flash::success("Account details updated successfully!")).await;
    Ok(Redirect::to(ACCOUNT_PATH).into_response())
}
