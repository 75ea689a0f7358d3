//! Chat-driven ordering.
//!
//! The transcript is append-only. The remote agent may attach an `order` list to
//! the `memory` of its reply; that list is a directive to replace the cart, and
//! is lifted out of the loosely-typed memory into [`CartDirective`] before it
//! reaches the cart.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::{Cart, CartLine};
use crate::types::ChatRole;

/// Shown in place of a reply when the chat call fails.
pub const ERROR_REPLY: &str = "Sorry, something went wrong!";

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Agent state. Kept verbatim and sent back with the history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            memory: None,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            memory: None,
        }
    }

    #[must_use]
    pub fn with_memory(mut self, memory: Value) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// A cart mutation requested by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartDirective {
    /// Clear the cart, then add each line.
    ReplaceCart(Vec<CartLine>),
}

impl CartDirective {
    pub fn apply(&self, cart: &mut Cart) {
        match self {
            Self::ReplaceCart(lines) => cart.replace(lines),
        }
    }
}

/// A reply from the chat service with its directive made explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: ChatMessage,
    pub cart_directive: Option<CartDirective>,
}

impl ChatReply {
    /// Split a raw assistant message into reply and directive.
    ///
    /// `memory.order` must be an array of `{ item, quantity }` objects; entries
    /// with a missing name or a quantity that is not a non-negative integer (or
    /// a string holding one) are skipped. A present but empty `order` array is a
    /// directive to empty the cart.
    #[must_use]
    pub fn from_message(reply: ChatMessage) -> Self {
        let cart_directive = reply
            .memory
            .as_ref()
            .and_then(|m| m.get("order"))
            .and_then(Value::as_array)
            .map(|entries| CartDirective::ReplaceCart(entries.iter().filter_map(parse_line).collect()));

        Self {
            reply,
            cart_directive,
        }
    }

    /// Number of order entries the agent sent that could not be used.
    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        let sent = self
            .reply
            .memory
            .as_ref()
            .and_then(|m| m.get("order"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let kept = match &self.cart_directive {
            Some(CartDirective::ReplaceCart(lines)) => lines.len(),
            None => 0,
        };
        sent.saturating_sub(kept)
    }
}

fn parse_line(entry: &Value) -> Option<CartLine> {
    let name = entry.get("item")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let quantity = match entry.get("quantity")? {
        Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(CartLine::new(name, quantity))
}

/// Why a message could not be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("message is empty")]
    Blank,
    #[error("still waiting for the previous reply")]
    Busy,
}

/// The chat transcript plus the typing indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    typing: bool,
}

impl ChatSession {
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            typing: false,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    #[must_use]
    pub const fn is_typing(&self) -> bool {
        self.typing
    }

    /// Append the user's message and mark typing.
    ///
    /// Returns the full history to send to the chat service.
    ///
    /// # Errors
    ///
    /// Blank input is ignored; a send while typing is rejected.
    pub fn begin_send(&mut self, text: &str) -> Result<&[ChatMessage], SendError> {
        if self.typing {
            return Err(SendError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::Blank);
        }
        self.messages.push(ChatMessage::user(text));
        self.typing = true;
        Ok(&self.messages)
    }

    /// Append the reply, apply its directive to `cart`, clear typing.
    pub fn complete(&mut self, reply: ChatReply, cart: &mut Cart) {
        if let Some(directive) = &reply.cart_directive {
            directive.apply(cart);
        }
        self.messages.push(reply.reply);
        self.typing = false;
    }

    /// Append the synthetic error reply and clear typing.
    pub fn fail(&mut self) {
        self.messages.push(ChatMessage::assistant(ERROR_REPLY));
        self.typing = false;
    }

    /// Wipe the transcript. The cart is not touched.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.typing = false;
    }
}

/// Prompt asking the agent for follow-up suggestions after a paid order.
#[must_use]
pub fn recommendation_prompt(item_names: &[String]) -> String {
    format!(
        "I just ordered {}. What else would you recommend?",
        item_names.join(", ")
    )
}
