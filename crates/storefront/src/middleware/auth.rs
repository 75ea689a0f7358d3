//! Authentication extractors and the route guard.
//!
//! The auth session is rebuilt from the session store on every request
//! ([`load_auth_session`]) and written back after each transition
//! ([`store_auth_session`]), so a change made by one request is visible to the
//! next. A token that was logged out is never restored, even if a slower
//! request wrote it back.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use coffee_shop_core::guard::{self, GuardDecision};
use coffee_shop_core::{AuthSession, BearerToken, Identity};
use tower_sessions::Session;

use crate::models::{VisitorId, session_keys};
use crate::services::auth::RevokedTokens;
use crate::state::AppState;

/// The logged-in customer for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub token: BearerToken,
}

/// Extractor that requires a session.
///
/// If nobody is logged in, redirects to `/login?from=<this path>`. A session
/// that was just invalidated by an account edit redirects once with its
/// explanatory message.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.identity.display_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when the guard rejects a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page.
    RedirectToLogin(String),
    /// Session layer missing or session store failed.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(url) => Redirect::to(&url).into_response(),
            Self::SessionUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::SessionUnavailable)?;

        let from = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string);

        let mut auth = load_auth_session(session, state.revoked_tokens())
            .await
            .map_err(|_| AuthRejection::SessionUnavailable)?;

        let decision = guard::check(&mut auth, &from);
        store_auth_session(session, &auth)
            .await
            .map_err(|_| AuthRejection::SessionUnavailable)?;

        match (decision, auth.token()) {
            (GuardDecision::Allow(identity), Some(token)) => Ok(Self(CurrentUser {
                identity,
                token: token.clone(),
            })),
            (decision, _) => {
                tracing::debug!(from = %from, "Guard redirecting to login");
                Err(AuthRejection::RedirectToLogin(
                    decision
                        .login_url()
                        .unwrap_or_else(|| guard::login_url(&from, None)),
                ))
            }
        }
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this never rejects and never settles a pending
/// logout message.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        let state = AppState::from_ref(state);

        let user = match load_auth_session(session, state.revoked_tokens()).await {
            Ok(auth) => match (auth.identity(), auth.token()) {
                (Some(identity), Some(token)) => Some(CurrentUser {
                    identity: identity.clone(),
                    token: token.clone(),
                }),
                _ => None,
            },
            Err(_) => None,
        };

        Ok(Self(user))
    }
}

/// Extractor for the visitor id, minting one on first use.
pub struct Visitor(pub VisitorId);

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::SessionUnavailable)?;

        if let Ok(Some(id)) = session.get::<VisitorId>(session_keys::VISITOR_ID).await {
            return Ok(Self(id));
        }

        let id = VisitorId::new();
        session
            .insert(session_keys::VISITOR_ID, id)
            .await
            .map_err(|_| AuthRejection::SessionUnavailable)?;
        Ok(Self(id))
    }
}

/// Rebuild the auth session from the session store.
///
/// A stored token that no longer decodes (malformed or expired) or that was
/// logged out is removed.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn load_auth_session(
    session: &Session,
    revoked: &RevokedTokens,
) -> Result<AuthSession, tower_sessions::session::Error> {
    let stored: Option<BearerToken> = session.get(session_keys::AUTH_TOKEN).await?;
    let message: Option<String> = session.get(session_keys::LOGOUT_MESSAGE).await?;
    let had_token = stored.is_some();
    let token = stored.filter(|token| !revoked.is_revoked(token));

    let auth = AuthSession::restore(token, message, Utc::now());
    if had_token && auth.persisted_token().is_none() && auth.pending_message().is_none() {
        tracing::info!("Dropping stored token that was logged out or no longer decodes");
        session
            .remove::<BearerToken>(session_keys::AUTH_TOKEN)
            .await?;
    }

    Ok(auth)
}

/// Write the auth session back to the session store.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    match auth.persisted_token() {
        Some(token) => session.insert(session_keys::AUTH_TOKEN, token).await?,
        None => {
            session
                .remove::<BearerToken>(session_keys::AUTH_TOKEN)
                .await?;
        }
    }

    match auth.pending_message() {
        Some(message) => session.insert(session_keys::LOGOUT_MESSAGE, message).await?,
        None => {
            session
                .remove::<String>(session_keys::LOGOUT_MESSAGE)
                .await?;
        }
    }

    Ok(())
}
