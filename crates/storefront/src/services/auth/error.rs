//! Authentication error types.

use coffee_shop_core::TokenError;
use coffee_shop_core::types::EmailError;
use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// A required form field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The API rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The API issued a token this storefront cannot read.
    #[error("unusable token: {0}")]
    Token(#[from] TokenError),

    /// Coffee shop API call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Session store operation failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
