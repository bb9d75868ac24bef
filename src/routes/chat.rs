//! Chat routes: send a message, read history, report relay status.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;
use uuid::Uuid;

use super::{ClientIp, rate_limited_response};
use crate::config::MAX_HISTORY_LIMIT;
use crate::error::{ErrorCode, format_rfc3339, now_rfc3339};
use crate::services::chat::{self, ChatError};
use crate::services::history::HistoryQuery;
use crate::state::{AppState, ChatExchange};

const CHAT_RATE_LIMIT_MESSAGE: &str = "Too many chat messages. Please wait a moment before sending another message.";
const GENERIC_FAILURE_MESSAGE: &str =
    "I apologize, but I encountered an error processing your request. Please try again in a moment.";
const HISTORY_FAILURE_MESSAGE: &str = "Failed to retrieve chat history";

// =============================================================================
// POST /api/chat
// =============================================================================

/// `POST /api/chat`: relay one message and persist the exchange.
pub async fn send_message(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let expose_details = state.config.environment.is_development();
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return invalid_json_response(&rejection, expose_details),
    };

    match chat::handle_message(&state, &body, ip).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => chat_error_response(&e, expose_details),
    }
}

fn invalid_json_response(rejection: &JsonRejection, expose_details: bool) -> Response {
    let mut body = json!({
        "success": false,
        "error": "Invalid JSON body",
        "code": "E_VALIDATION",
        "field": "body",
        "timestamp": now_rfc3339(),
    });
    if expose_details {
        body["details"] = Value::String(rejection.body_text());
    }
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Map a chat failure to its HTTP status and JSON body.
pub(crate) fn chat_error_response(err: &ChatError, expose_details: bool) -> Response {
    let (status, message) = match err {
        ChatError::Validation(v) => {
            let mut body = json!({
                "success": false,
                "error": v.message,
                "code": err.error_code(),
                "field": v.field,
                "timestamp": now_rfc3339(),
            });
            if let Some(max) = v.max_length {
                body["maxLength"] = json!(max);
            }
            if let Some(current) = v.current_length {
                body["currentLength"] = json!(current);
            }
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
        ChatError::RateLimited(e) => return rate_limited_response(e, CHAT_RATE_LIMIT_MESSAGE),
        ChatError::Upstream(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.user_message()),
        ChatError::Store(e) => {
            error!(error = %e, "chat: failed to persist exchange");
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_MESSAGE)
        }
    };

    let mut body = json!({
        "success": false,
        "error": message,
        "code": err.error_code(),
        "timestamp": now_rfc3339(),
    });
    if expose_details {
        body["details"] = Value::String(err.to_string());
    }
    (status, Json(body)).into_response()
}

// =============================================================================
// GET /api/chat/history
// =============================================================================

/// Raw query string. Fields stay strings so a bad `limit` falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub limit: Option<String>,
}

/// Public view of a stored exchange. Client IPs never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub conversation_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub timestamp: String,
}

impl From<ChatExchange> for HistoryEntry {
    fn from(exchange: ChatExchange) -> Self {
        Self {
            id: exchange.id,
            user_id: exchange.user_id,
            conversation_id: exchange.conversation_id,
            user_message: exchange.user_message,
            ai_response: exchange.ai_response,
            timestamp: format_rfc3339(exchange.timestamp),
        }
    }
}

/// `GET /api/chat/history`: most recent matching exchanges, oldest first.
pub async fn history(State(state): State<AppState>, Query(params): Query<HistoryParams>) -> Response {
    let query = HistoryQuery {
        user_id: non_empty(params.user_id),
        conversation_id: non_empty(params.conversation_id),
        limit: resolve_limit(params.limit.as_deref(), state.config.history_default_limit),
    };

    match state.history.list(&query).await {
        Ok(page) => {
            let history: Vec<HistoryEntry> = page.items.into_iter().map(HistoryEntry::from).collect();
            Json(json!({
                "success": true,
                "count": history.len(),
                "total": page.total,
                "history": history,
            }))
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "chat: failed to list history");
            let mut body = json!({
                "success": false,
                "error": HISTORY_FAILURE_MESSAGE,
                "code": e.error_code(),
            });
            if state.config.environment.is_development() {
                body["details"] = Value::String(e.to_string());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Ids are matched exactly as stored; only an empty parameter means "any".
fn non_empty(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.is_empty())
}

/// Missing, unparseable or zero limits use `default`; anything larger than
/// [`MAX_HISTORY_LIMIT`] is capped.
fn resolve_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
        .min(MAX_HISTORY_LIMIT)
}

// =============================================================================
// GET /api/chat/status
// =============================================================================

/// `GET /api/chat/status`: which relay is answering.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "service": state.llm.service_name(),
        "timestamp": now_rfc3339(),
    }))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
