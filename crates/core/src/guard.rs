//! Route guard decision.
//!
//! Every screen except login and registration requires a session. The storefront
//! evaluates the guard once per request, after restoring the session from the
//! persisted credential, so there is no "still loading" phase to tolerate here.

use crate::auth::{AuthSession, Identity};

/// Path of the login screen.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of evaluating the guard for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session present; render the screen for this identity.
    Allow(Identity),
    /// No session; go to login and come back to `from` afterwards.
    RedirectToLogin {
        from: String,
        message: Option<String>,
    },
}

impl GuardDecision {
    /// The login URL for a redirect decision, with `from` and `message` encoded.
    #[must_use]
    pub fn login_url(&self) -> Option<String> {
        match self {
            Self::Allow(_) => None,
            Self::RedirectToLogin { from, message } => Some(login_url(from, message.as_deref())),
        }
    }
}

/// Evaluate the guard for `path`.
///
/// A session in `LoggingOut` produces one redirect carrying its message and then
/// settles to anonymous; the next evaluation redirects without a message.
pub fn check(session: &mut AuthSession, path: &str) -> GuardDecision {
    if let Some(message) = session.settle() {
        return GuardDecision::RedirectToLogin {
            from: path.to_owned(),
            message: Some(message),
        };
    }

    match session.identity() {
        Some(identity) => GuardDecision::Allow(identity.clone()),
        None => GuardDecision::RedirectToLogin {
            from: path.to_owned(),
            message: None,
        },
    }
}

/// Build `/login?from=...&message=...`.
#[must_use]
pub fn login_url(from: &str, message: Option<&str>) -> String {
    let mut url = format!("{LOGIN_PATH}?from={}", urlencoding::encode(from));
    if let Some(message) = message {
        url.push_str("&message=");
        url.push_str(&urlencoding::encode(message));
    }
    url
}

/// Where to go after a successful login.
///
/// Only local absolute paths are honoured; anything else (absent, relative,
/// protocol-relative or absolute URLs) falls back to `/`.
#[must_use]
pub fn post_login_target(from: Option<&str>) -> &str {
    match from {
        Some(path) if is_local_path(path) => path,
        _ => "/",
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.starts_with(LOGIN_PATH)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::auth::unsigned_token;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    fn logged_in() -> AuthSession {
        let token = unsigned_token("ana@example.com", "Ana", None);
        AuthSession::restore(Some(token), None, now())
    }

    #[test]
    fn test_allows_authenticated_session() {
        let mut session = logged_in();
        let decision = check(&mut session, "/order");
        assert!(matches!(decision, GuardDecision::Allow(ref id) if id.display_name == "Ana"));
        assert!(decision.login_url().is_none());
    }

    #[test]
    fn test_redirects_anonymous_with_origin() {
        let mut session = AuthSession::anonymous();
        let decision = check(&mut session, "/orders");
        assert_eq!(
            decision,
            GuardDecision::RedirectToLogin {
                from: "/orders".to_string(),
                message: None
            }
        );
        assert_eq!(decision.login_url().unwrap(), "/login?from=%2Forders");
    }

    #[test]
    fn test_logging_out_redirects_exactly_once_with_message() {
        let mut session = logged_in();
        session.invalidate("Please log in again.");

        let first = check(&mut session, "/account");
        assert_eq!(
            first.login_url().unwrap(),
            "/login?from=%2Faccount&message=Please%20log%20in%20again."
        );

        let second = check(&mut session, "/account");
        assert_eq!(
            second,
            GuardDecision::RedirectToLogin {
                from: "/account".to_string(),
                message: None
            }
        );
    }

    #[test]
    fn test_login_url_encodes_query_characters() {
        assert_eq!(
            login_url("/?category=Tea&q=x y", None),
            "/login?from=%2F%3Fcategory%3DTea%26q%3Dx%20y"
        );
    }

    #[test]
    fn test_post_login_target_only_allows_local_paths() {
        assert_eq!(post_login_target(Some("/orders")), "/orders");
        assert_eq!(post_login_target(None), "/");
        assert_eq!(post_login_target(Some("https://evil.example")), "/");
        assert_eq!(post_login_target(Some("//evil.example")), "/");
        assert_eq!(post_login_target(Some("orders")), "/");
        assert_eq!(post_login_target(Some("/login?from=/x")), "/");
    }
}
