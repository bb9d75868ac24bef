//! Chat request validation.
//!
//! The body is taken as raw JSON so type mismatches produce field-tagged
//! 400s instead of the extractor's generic rejection. Nothing that fails
//! here reaches the relay or the history store.

use serde_json::Value;

use crate::state::ClientContext;

pub const MAX_MESSAGE_CHARS: usize = 4000;
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
    pub max_length: Option<usize>,
    pub current_length: Option<usize>,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into(), max_length: None, current_length: None }
    }
}

impl crate::error::ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }
}

/// A validated chat request. `message` is already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub conversation_id: Option<String>,
    pub context: Option<ClientContext>,
}

/// Validate a `POST /api/chat` body.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, tagged with its field.
pub fn parse_chat_request(body: &Value) -> Result<ChatRequest, ValidationError> {
    let Some(obj) = body.as_object() else {
        return Err(ValidationError::new("body", "Request body must be a JSON object"));
    };

    let message = validate_message(obj.get("message"))?;
    let user_id = optional_id(obj.get("userId"), "userId")?.unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let conversation_id = optional_id(obj.get("conversationId"), "conversationId")?;
    let context = optional_context(obj.get("context"))?;

    Ok(ChatRequest { message, user_id, conversation_id, context })
}

fn validate_message(raw: Option<&Value>) -> Result<String, ValidationError> {
    let text = match raw {
        None | Some(Value::Null | Value::Bool(false)) => return Err(required()),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|v| v.abs() < f64::EPSILON) => return Err(required()),
        Some(Value::String(s)) if s.is_empty() => return Err(required()),
        Some(Value::String(s)) => s,
        Some(_) => return Err(ValidationError::new("message", "Message must be a string")),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("message", "Message cannot be empty"));
    }

    let length = trimmed.chars().count();
    if length > MAX_MESSAGE_CHARS {
        return Err(ValidationError {
            field: "message",
            message: format!("Message is too long (maximum {MAX_MESSAGE_CHARS} characters)"),
            max_length: Some(MAX_MESSAGE_CHARS),
            current_length: Some(length),
        });
    }

    Ok(trimmed.to_string())
}

fn required() -> ValidationError {
    ValidationError::new("message", "Message is required")
}

/// Optional string id, kept exactly as sent. Null and `""` count as absent.
fn optional_id(raw: Option<&Value>, field: &'static str) -> Result<Option<String>, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::new(field, format!("{field} must be a string"))),
    }
}

fn optional_context(raw: Option<&Value>) -> Result<Option<ClientContext>, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => {
            let ctx: ClientContext = serde_json::from_value(value.clone()).map_err(|_| {
                ValidationError::new("context", "context must contain a string page, numeric userScore and string userTier")
            })?;
            Ok((!ctx.is_empty()).then_some(ctx))
        }
        Some(_) => Err(ValidationError::new("context", "context must be an object")),
    }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
