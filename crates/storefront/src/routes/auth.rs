//! Authentication route handlers.
//!
//! Login and registration re-render their form on failure so the visitor keeps
//! what they typed and the `from` target survives.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use coffee_shop_core::guard::{self, LOGIN_PATH};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, flash};
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::services::AuthError;
use crate::services::AuthService;
use crate::services::auth::{self, Registration};
use crate::state::AppState;

/// Shown when the API refuses the credentials.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Check your email or password.";

/// Shown when the API refuses a registration.
pub const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Email may already be taken.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub from: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Login page query: where to go afterwards and why the visitor is here.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub from: Option<String>,
    pub message: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub from: String,
    pub message: Option<String>,
    pub error: Option<String>,
    pub email: String,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session, user))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(guard::post_login_target(query.from.as_deref())).into_response();
    }

    LoginTemplate {
        layout: Layout::load(&state, &session, None).await,
        from: guard::post_login_target(query.from.as_deref()).to_owned(),
        message: query.message,
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let target = guard::post_login_target(form.from.as_deref()).to_owned();
    let password = SecretString::from(form.password);

    let service = AuthService::new(state.api(), state.revoked_tokens());
    let error = match service.login(&session, &form.email, &password).await {
        Ok(identity) => {
            flash(&session, Flash::success("Login successful!")).await;
            tracing::debug!(email = %identity.email, target = %target, "Redirecting after login");
            return Ok(Redirect::to(&target).into_response());
        }
        Err(AuthError::Session(e)) => return Err(e.into()),
        Err(e @ (AuthError::InvalidEmail(_) | AuthError::MissingField(_))) => e.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            LOGIN_FAILED_MESSAGE.to_string()
        }
    };

    Ok(LoginTemplate {
        layout: Layout::load(&state, &session, None).await,
        from: target,
        message: None,
        error: Some(error),
        email: form.email,
    }
    .into_response())
}

/// Display the registration page.
#[instrument(skip_all)]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        layout: Layout::load(&state, &session, None).await,
        error: None,
        name: String::new(),
        email: String::new(),
        phone_number: String::new(),
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        name: form.name,
        email: form.email,
        password: SecretString::from(form.password),
        phone_number: form.phone_number,
    };

    let service = AuthService::new(state.api(), state.revoked_tokens());
    let error = match service.register(&registration).await {
        Ok(()) => {
            flash(&session, Flash::success("Account created. Please log in.")).await;
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Err(e @ (AuthError::InvalidEmail(_) | AuthError::MissingField(_))) => e.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            REGISTER_FAILED_MESSAGE.to_string()
        }
    };

    RegisterTemplate {
        layout: Layout::load(&state, &session, None).await,
        error: Some(error),
        name: registration.name,
        email: registration.email,
        phone_number: registration.phone_number,
    }
    .into_response()
}

/// Log out and return to the login page.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    auth::logout(&session, state.revoked_tokens()).await?;
    tracing::info!("Customer logged out");
    Ok(Redirect::to(LOGIN_PATH))
}
