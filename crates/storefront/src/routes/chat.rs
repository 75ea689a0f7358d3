//! Chat route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use coffee_shop_core::ChatRole;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, flash};
use crate::error::Result;
use crate::middleware::{RequireAuth, Visitor};
use crate::models::Flash;
use crate::services::chat::load_transcript;
use crate::services::{ChatError, ChatService, SendOutcome};
use crate::state::AppState;

const CHAT_PATH: &str = "/chat";

/// One transcript bubble.
#[derive(Clone)]
pub struct MessageView {
    pub from_user: bool,
    pub content: String,
}

/// Chat page template.
#[derive(Template, WebTemplate)]
#[template(path = "chat/show.html")]
pub struct ChatTemplate {
    pub layout: Layout,
    pub messages: Vec<MessageView>,
    pub typing: bool,
}

/// Send message form data.
#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub message: String,
}

/// Display the transcript.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Visitor(visitor): Visitor,
) -> Result<impl IntoResponse> {
    let transcript = load_transcript(&session).await?;
    let typing = ChatService::new(state.api(), state.carts(), state.in_flight()).is_typing(visitor);

    Ok(ChatTemplate {
        layout: Layout::load(&state, &session, Some(&user.identity)).await,
        messages: transcript
            .into_messages()
            .into_iter()
            .map(|m| MessageView {
                from_user: m.role == ChatRole::User,
                content: m.content,
            })
            .collect(),
        typing,
    })
}

/// Send a message to the ordering assistant.
#[instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Visitor(visitor): Visitor,
    Form(form): Form<SendForm>,
) -> Result<Redirect> {
    let service = ChatService::new(state.api(), state.carts(), state.in_flight());

    match service.send(&session, visitor, &form.message).await {
        Ok(SendOutcome::Replied {
            cart_replaced: true,
        }) => flash(&session, Flash::success("Your cart has been updated.")).await,
        Ok(_) => {}
        Err(ChatError::Busy) => flash(&session, Flash::info(ChatError::Busy.to_string())).await,
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(CHAT_PATH))
}

/// Wipe the transcript.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Visitor(visitor): Visitor,
) -> Result<Redirect> {
    let service = ChatService::new(state.api(), state.carts(), state.in_flight());

    match service.clear(&session, visitor).await {
        Ok(()) => {}
        Err(ChatError::Busy) => flash(&session, Flash::info(ChatError::Busy.to_string())).await,
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(CHAT_PATH))
}
