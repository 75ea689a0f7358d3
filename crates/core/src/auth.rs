//! Auth session: bearer credential plus the identity decoded from it.
//!
//! The API issues JWT bearer tokens whose claims carry the customer's email
//! (`sub`) and display name (`name`). The storefront never verifies the
//! signature; it only reads the claims so it can greet the user and bind orders
//! to their email. The API remains the authority and rejects bad tokens with
//! HTTP 401.
//!
//! # States
//!
//! ```text
//!              login(ok) / restore(ok)
//! Anonymous ──────────────────────────────▶ Authenticated
//!     ▲  ▲                                     │   │
//!     │  └──────────── logout / 401 ───────────┘   │ invalidate(msg)
//!     │                                            ▼
//!     └────────────── settle ─────────────── LoggingOut { message }
//! ```
//!
//! `LoggingOut` is the transitional state entered when account details change:
//! the credential is already gone, and the route guard turns it into exactly one
//! login redirect carrying the message before settling back to `Anonymous`.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, EmailError};

/// Opaque bearer token as issued by `POST /login`.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Who is logged in, as stated by the token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: Email,
    pub display_name: String,
}

/// Errors decoding a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("token payload is not valid base64url")]
    Encoding,
    #[error("token claims could not be parsed: {0}")]
    Claims(String),
    #[error("token subject is not an email: {0}")]
    Subject(#[from] EmailError),
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the identity carried by a JWT, rejecting expired tokens.
///
/// # Errors
///
/// Returns a [`TokenError`] if the token is not a JWT, the payload is not
/// JSON claims with an email `sub`, or `exp` is at or before `now`.
pub fn decode_identity(token: &BearerToken, now: DateTime<Utc>) -> Result<Identity, TokenError> {
    let mut parts = token.expose().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    // Some issuers keep the padding; URL_SAFE_NO_PAD rejects it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| TokenError::Encoding)?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))?;

    if let Some(exp) = claims.exp {
        let expires_at = DateTime::from_timestamp(exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
        if expires_at <= now {
            return Err(TokenError::Expired(expires_at));
        }
    }

    let email = Email::parse(&claims.sub)?;
    let display_name = claims
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.as_str().to_owned());

    Ok(Identity {
        email,
        display_name,
    })
}

/// Session state. Identity only ever exists alongside the token it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated {
        token: BearerToken,
        identity: Identity,
    },
    /// Credential cleared; one login redirect with `message` is still owed.
    LoggingOut { message: String },
}

/// The auth session store.
///
/// Pure state machine: callers persist [`AuthSession::persisted_token`] and
/// [`AuthSession::pending_message`] after each transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    state: AuthState,
}

impl AuthSession {
    /// A session with nobody logged in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Rebuild the session from persisted storage.
    ///
    /// A pending logout message wins over any token. A token that fails to
    /// decode (malformed or expired) yields an anonymous session, and the caller
    /// must drop the persisted copy; [`AuthSession::persisted_token`] is `None`
    /// in that case.
    #[must_use]
    pub fn restore(
        token: Option<BearerToken>,
        pending_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        if let Some(message) = pending_message {
            return Self {
                state: AuthState::LoggingOut { message },
            };
        }

        let state = match token {
            Some(token) => match decode_identity(&token, now) {
                Ok(identity) => AuthState::Authenticated { token, identity },
                Err(_) => AuthState::Anonymous,
            },
            None => AuthState::Anonymous,
        };
        Self { state }
    }

    /// Log in with a freshly issued token.
    ///
    /// # Errors
    ///
    /// On decode failure the session is left anonymous and the error returned;
    /// no credential survives without a matching identity.
    pub fn login(&mut self, token: BearerToken, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        match decode_identity(&token, now) {
            Ok(identity) => {
                self.state = AuthState::Authenticated {
                    token,
                    identity: identity.clone(),
                };
                Ok(identity)
            }
            Err(e) => {
                self.state = AuthState::Anonymous;
                Err(e)
            }
        }
    }

    /// Drop the credential. Idempotent.
    pub fn logout(&mut self) {
        self.state = AuthState::Anonymous;
    }

    /// Drop the credential because account details changed under it.
    ///
    /// Enters [`AuthState::LoggingOut`]; the guard will redirect once with
    /// `message`.
    pub fn invalidate(&mut self, message: impl Into<String>) {
        self.state = AuthState::LoggingOut {
            message: message.into(),
        };
    }

    /// Leave `LoggingOut`, returning the owed message.
    pub fn settle(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            AuthState::LoggingOut { message } => Some(message),
            other => {
                self.state = other;
                None
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.state {
            AuthState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn token(&self) -> Option<&BearerToken> {
        match &self.state {
            AuthState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    /// What should be in persistent storage for the token.
    #[must_use]
    pub const fn persisted_token(&self) -> Option<&BearerToken> {
        self.token()
    }

    /// What should be in persistent storage for the pending logout message.
    #[must_use]
    pub fn pending_message(&self) -> Option<&str> {
        match &self.state {
            AuthState::LoggingOut { message } => Some(message),
            _ => None,
        }
    }
}

/// Build an unsigned JWT with the given claims, for tests and fake APIs.
#[cfg(any(test, feature = "test-util"))]
#[must_use]
pub fn unsigned_token(email: &str, name: &str, exp: Option<i64>) -> BearerToken {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = match exp {
        Some(exp) => serde_json::json!({ "sub": email, "name": name, "exp": exp }),
        None => serde_json::json!({ "sub": email, "name": name }),
    };
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    BearerToken::new(format!("{header}.{payload}.c2lnbmF0dXJl"))
}
