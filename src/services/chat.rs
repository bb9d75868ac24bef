//! Chat service: validated message → prompt → relay → persisted exchange.
//!
//! DESIGN
//! ======
//! `handle_message` is the only write path into the history store. Each
//! stage fails into one `ChatError` variant, and the HTTP layer maps those
//! variants to status codes. Validation and rate limiting run before any
//! I/O, so rejected requests never reach the relay or the store.

use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::history::HistoryError;
use super::prompt::build_prompt;
use super::validation::{ChatRequest, ValidationError, parse_chat_request};
use crate::error::{ErrorCode, format_rfc3339};
use crate::llm::LlmChat;
use crate::llm::retry::chat_with_retry;
use crate::llm::types::{LlmError, PromptRequest, truncate_chars};
use crate::rate_limit::RateLimitError;
use crate::state::{AppState, ChatExchange};

const LOG_MESSAGE_CHARS: usize = 200;
const CHECK_MESSAGE: &str = "Hello";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    RateLimited(#[from] RateLimitError),
    #[error("upstream error: {0}")]
    Upstream(#[from] LlmError),
    #[error("history error: {0}")]
    Store(#[from] HistoryError),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::RateLimited(e) => e.error_code(),
            Self::Upstream(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::RateLimited(e) => e.retryable(),
            Self::Upstream(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
        }
    }
}

/// Successful `POST /api/chat` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub success: bool,
    pub response: String,
    pub conversation_id: String,
    pub message_id: Uuid,
    pub timestamp: String,
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Handle one chat message from `client_ip`.
///
/// # Errors
///
/// Returns the first stage that failed; see [`ChatError`].
pub async fn handle_message(state: &AppState, body: &Value, client_ip: IpAddr) -> Result<ChatReply, ChatError> {
    let request = parse_chat_request(body)?;

    if !(state.config.environment.is_development() && client_ip.is_loopback()) {
        state.chat_limiter.check_and_record(client_ip)?;
    }

    let window = load_window(state, &request).await;
    let prompt = build_prompt(&request.message, request.context.as_ref(), &window);
    let prompt_request = PromptRequest { prompt: &prompt, message: &request.message, context: request.context.as_ref() };

    let ai_response = match chat_with_retry(state.llm.as_ref(), &prompt_request, state.retry).await {
        Ok(text) => text,
        Err(e) => {
            warn!(
                %client_ip,
                service = state.llm.service_name(),
                code = e.error_code(),
                error = %e,
                "chat: relay failed"
            );
            return Err(e.into());
        }
    };

    let ChatRequest { message, user_id, conversation_id, context } = request;
    let exchange = ChatExchange {
        id: Uuid::new_v4(),
        user_id,
        conversation_id: conversation_id.unwrap_or_else(new_conversation_id),
        user_message: message,
        ai_response,
        timestamp: OffsetDateTime::now_utc(),
        client_context: context,
        client_ip: Some(client_ip),
    };

    let reply = ChatReply {
        success: true,
        response: exchange.ai_response.clone(),
        conversation_id: exchange.conversation_id.clone(),
        message_id: exchange.id,
        timestamp: format_rfc3339(exchange.timestamp),
    };

    info!(
        message_id = %exchange.id,
        user_id = %exchange.user_id,
        conversation_id = %exchange.conversation_id,
        %client_ip,
        message = %truncate_chars(&exchange.user_message, LOG_MESSAGE_CHARS),
        response_len = exchange.ai_response.chars().count(),
        "chat: interaction"
    );

    state.history.append(exchange).await?;
    Ok(reply)
}

/// Prior turns of the client's conversation, oldest first.
///
/// A store failure here degrades to an empty window; the append later in the
/// request still surfaces a broken store.
async fn load_window(state: &AppState, request: &ChatRequest) -> Vec<ChatExchange> {
    let Some(conversation_id) = request.conversation_id.as_deref() else {
        return Vec::new();
    };
    match state.history.recent(conversation_id, state.config.context_window).await {
        Ok(window) => window,
        Err(e) => {
            warn!(%conversation_id, error = %e, "chat: failed to load conversation window");
            Vec::new()
        }
    }
}

fn new_conversation_id() -> String {
    format!("conv_{}", Uuid::new_v4().simple())
}

/// Send a fixed greeting through the relay to confirm it is reachable.
///
/// # Errors
///
/// Returns the relay's [`LlmError`] unchanged.
pub async fn check_relay(llm: &dyn LlmChat) -> Result<(), LlmError> {
    let prompt = build_prompt(CHECK_MESSAGE, None, &[]);
    let request = PromptRequest { prompt: &prompt, message: CHECK_MESSAGE, context: None };
    let text = llm.chat(&request).await?;
    info!(service = llm.service_name(), response_len = text.chars().count(), "chat: relay check ok");
    Ok(())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
