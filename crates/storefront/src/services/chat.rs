//! Chat-driven ordering.
//!
//! The transcript lives in the visitor's session. A send holds the visitor's
//! chat slot in the in-flight registry until the agent replies, so the chat
//! page can show the typing indicator and a second send is turned away.

use coffee_shop_core::chat::{self, SendError};
use coffee_shop_core::{ChatMessage, ChatSession};
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::CoffeeApiClient;
use crate::models::{VisitorId, session_keys};
use crate::services::cart::CartStore;
use crate::services::in_flight::{Action, InFlight};

/// Why a chat operation was not carried out.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A reply is still pending for this visitor.
    #[error("Still thinking about your last message...")]
    Busy,

    /// Session store operation failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// What a send did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    /// The agent replied. `cart_replaced` is set when its reply replaced the cart.
    Replied { cart_replaced: bool },
    /// The call failed and the apology message was appended.
    Failed,
}

/// Chat service.
pub struct ChatService<'a> {
    api: &'a CoffeeApiClient,
    carts: &'a CartStore,
    in_flight: &'a InFlight,
}

impl<'a> ChatService<'a> {
    #[must_use]
    pub const fn new(api: &'a CoffeeApiClient, carts: &'a CartStore, in_flight: &'a InFlight) -> Self {
        Self {
            api,
            carts,
            in_flight,
        }
    }

    /// Whether a reply is pending for the visitor.
    #[must_use]
    pub fn is_typing(&self, visitor: VisitorId) -> bool {
        self.in_flight.is_pending(visitor, Action::Chat)
    }

    /// Send `text` with the full history and record the reply.
    ///
    /// A reply carrying an order replaces the visitor's cart in one step.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Busy` if a reply is still pending, or a session
    /// error if the transcript cannot be read or written.
    #[instrument(skip(self, session, text), fields(visitor = %visitor))]
    pub async fn send(
        &self,
        session: &Session,
        visitor: VisitorId,
        text: &str,
    ) -> Result<SendOutcome, ChatError> {
        let _slot = self
            .in_flight
            .try_begin(visitor, Action::Chat)
            .ok_or(ChatError::Busy)?;

        let mut transcript = load_transcript(session).await?;
        let history = match transcript.begin_send(text) {
            Ok(history) => history.to_vec(),
            Err(SendError::Blank) => return Ok(SendOutcome::Ignored),
            Err(SendError::Busy) => return Err(ChatError::Busy),
        };
        store_transcript(session, &transcript).await?;

        let outcome = match self.api.chat(&history).await {
            Ok(reply) => {
                let cart_replaced = reply.cart_directive.is_some();
                let handle = self.carts.handle(visitor).await;
                let mut cart = handle.lock().await;
                transcript.complete(reply, &mut cart);
                if cart_replaced {
                    tracing::info!(items = cart.item_count(), "Chat replaced the cart");
                }
                SendOutcome::Replied { cart_replaced }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                transcript.fail();
                SendOutcome::Failed
            }
        };

        store_transcript(session, &transcript).await?;
        Ok(outcome)
    }

    /// Wipe the transcript. The cart is left alone.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Busy` while a reply is pending, or a session error.
    pub async fn clear(&self, session: &Session, visitor: VisitorId) -> Result<(), ChatError> {
        if self.is_typing(visitor) {
            return Err(ChatError::Busy);
        }
        let mut transcript = load_transcript(session).await?;
        transcript.clear();
        store_transcript(session, &transcript).await?;
        Ok(())
    }

    /// Ask the agent what to order next, seeded with what was just bought.
    ///
    /// Returns `None` on any failure; a missing recommendation never blocks
    /// the thank-you page.
    #[instrument(skip(self))]
    pub async fn recommend(&self, item_names: &[String]) -> Option<String> {
        if item_names.is_empty() {
            return None;
        }
        let prompt = [ChatMessage::user(chat::recommendation_prompt(item_names))];
        match self.api.chat(&prompt).await {
            Ok(reply) => Some(reply.reply.content).filter(|c| !c.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation request failed");
                None
            }
        }
    }
}

/// Read the transcript from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn load_transcript(session: &Session) -> Result<ChatSession, tower_sessions::session::Error> {
    let messages: Vec<ChatMessage> = session
        .get(session_keys::CHAT_TRANSCRIPT)
        .await?
        .unwrap_or_default();
    Ok(ChatSession::new(messages))
}

async fn store_transcript(
    session: &Session,
    transcript: &ChatSession,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CHAT_TRANSCRIPT, transcript.messages())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tower_sessions::MemoryStore;
    use url::Url;

    use super::*;
    use crate::config::CoffeeApiConfig;

    fn api() -> CoffeeApiClient {
        CoffeeApiClient::new(&CoffeeApiConfig {
            base_url: Url::parse("http://api.local:8000").unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_clear_empties_transcript_and_keeps_cart() {
        let (api, carts, in_flight) = (api(), CartStore::default(), InFlight::new());
        let service = ChatService::new(&api, &carts, &in_flight);
        let session = session();
        let visitor = VisitorId::new();
        carts.add(visitor, "Latte", 2).await;
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello!")];
        session
            .insert(session_keys::CHAT_TRANSCRIPT, &history)
            .await
            .unwrap();

        service.clear(&session, visitor).await.unwrap();

        assert!(load_transcript(&session).await.unwrap().messages().is_empty());
        assert_eq!(carts.snapshot(visitor).await.quantity("Latte"), 2);
    }

    #[tokio::test]
    async fn test_clear_is_refused_while_reply_pending() {
        let (api, carts, in_flight) = (api(), CartStore::default(), InFlight::new());
        let service = ChatService::new(&api, &carts, &in_flight);
        let session = session();
        let visitor = VisitorId::new();
        session
            .insert(session_keys::CHAT_TRANSCRIPT, vec![ChatMessage::user("hi")])
            .await
            .unwrap();

        let _slot = in_flight.try_begin(visitor, Action::Chat).unwrap();

        assert!(matches!(service.clear(&session, visitor).await, Err(ChatError::Busy)));
        assert_eq!(load_transcript(&session).await.unwrap().messages().len(), 1);
    }
}
