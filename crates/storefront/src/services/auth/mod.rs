//! Authentication service.
//!
//! Login and registration go through the coffee shop API; the resulting
//! bearer token is the only credential the storefront keeps. Every transition
//! of the auth session is written through to the visitor's session before the
//! handler responds. Logging out also revokes the token, so a request still in
//! flight cannot bring it back.

mod error;
mod revoked;

pub use error::AuthError;
pub use revoked::RevokedTokens;

use chrono::Utc;
use coffee_shop_core::guard;
use coffee_shop_core::{Email, Identity};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, CoffeeApiClient};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{load_auth_session, store_auth_session};

/// Registration details as entered on the sign-up form.
#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub phone_number: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    api: &'a CoffeeApiClient,
    revoked: &'a RevokedTokens,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(api: &'a CoffeeApiClient, revoked: &'a RevokedTokens) -> Self {
        Self { api, revoked }
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingField` for bad
    /// input (no API call is made), `AuthError::InvalidCredentials` if the API
    /// rejects them, and `AuthError::Token` if the issued token is unreadable.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &Session,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingField("Password"));
        }

        let token = match self.api.login(email.as_str(), password).await {
            Ok(token) => token,
            Err(ApiError::Unauthorized) => return Err(AuthError::InvalidCredentials),
            Err(e) if e.client_message().is_some() => {
                tracing::info!(error = %e, "Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        self.revoked.forget(&token).await;
        let mut auth = load_auth_session(session, self.revoked).await?;
        let result = auth.login(token, Utc::now());
        store_auth_session(session, &auth).await?;
        let identity = result?;

        set_sentry_user(identity.email.as_str());
        tracing::info!(email = %identity.email, "Customer logged in");
        Ok(identity)
    }

    /// Create an account. The visitor still has to log in afterwards.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank or malformed fields (no API call is
    /// made), or `AuthError::Api` if the API rejects the registration.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("Name"));
        }
        let email = Email::parse(&registration.email)?;
        if registration.password.expose_secret().is_empty() {
            return Err(AuthError::MissingField("Password"));
        }
        let phone_number = registration.phone_number.trim();
        if phone_number.is_empty() {
            return Err(AuthError::MissingField("Phone number"));
        }

        self.api
            .register(name, email.as_str(), &registration.password, phone_number)
            .await?;

        tracing::info!("Customer registered");
        Ok(())
    }
}

/// Log the visitor out and destroy their session. Idempotent.
///
/// # Errors
///
/// Returns an error if the session cannot be read or deleted.
pub async fn logout(
    session: &Session,
    revoked: &RevokedTokens,
) -> Result<(), tower_sessions::session::Error> {
    let mut auth = load_auth_session(session, revoked).await?;
    if let Some(token) = auth.token() {
        revoked.revoke(token).await;
    }
    auth.logout();
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

/// Log out after the account details changed.
///
/// The credential is revoked and cleared first, then the guard is evaluated
/// for `from` so the one redirect owed to the login screen is issued right
/// away. The session keeps its data under a new id. Returns that login URL,
/// carrying `message`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn invalidate(
    session: &Session,
    revoked: &RevokedTokens,
    message: &str,
    from: &str,
) -> Result<String, tower_sessions::session::Error> {
    let mut auth = load_auth_session(session, revoked).await?;
    if let Some(token) = auth.token() {
        revoked.revoke(token).await;
    }
    auth.invalidate(message);
    let decision = guard::check(&mut auth, from);
    store_auth_session(session, &auth).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    Ok(decision
        .login_url()
        .unwrap_or_else(|| guard::login_url(from, Some(message))))
}

/// Turn an API failure into a handler error.
///
/// A rejected token forces a logout and becomes a login redirect back to
/// `from`; anything else passes through.
pub async fn handle_api_error(
    session: &Session,
    revoked: &RevokedTokens,
    from: &str,
    error: ApiError,
) -> AppError {
    if !error.is_unauthorized() {
        return error.into();
    }

    tracing::info!(from = %from, "API rejected the session token; logging out");
    match logout(session, revoked).await {
        Ok(()) => AppError::SessionExpired {
            from: from.to_owned(),
        },
        Err(e) => e.into(),
    }
}
