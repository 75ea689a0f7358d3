//! One-shot notices ("toasts") carried across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS modifier used by the toast markup.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Info => "toast-info",
            Self::Error => "toast-error",
        }
    }
}

/// A notice shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// Queue a notice for the next page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn push(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        let mut pending: Vec<Self> = session
            .get(session_keys::FLASH)
            .await?
            .unwrap_or_default();
        pending.push(self);
        session.insert(session_keys::FLASH, pending).await
    }

    /// Take every queued notice. A failed read yields none.
    pub async fn take_all(session: &Session) -> Vec<Self> {
        session
            .remove::<Vec<Self>>(session_keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }
}
