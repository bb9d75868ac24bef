//! LLM types: the relay trait, prompt envelope, and classified errors.
//!
//! Upstream failures are mapped into a closed set of categories so the
//! HTTP boundary can match them exhaustively instead of sniffing strings.

use crate::state::ClientContext;

const MAX_ERROR_BODY_CHARS: usize = 500;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while configuring or calling the upstream model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Upstream answered 429.
    #[error("upstream rate limited: {body}")]
    RateLimited { body: String },

    /// Upstream answered 401; the API key is wrong or revoked.
    #[error("upstream rejected credentials: {body}")]
    AuthFailed { body: String },

    /// Upstream answered with a 5xx status.
    #[error("upstream unavailable: status {status}")]
    Unavailable { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection or DNS resolution failed.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// Anything else, including malformed response bodies.
    #[error("upstream error: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Polite, user-facing explanation for this failure category.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "The assistant is busy right now. Please try again in a moment.",
            Self::AuthFailed { .. } => {
                "The assistant is not configured correctly. Please contact support if this keeps happening."
            }
            Self::Unavailable { .. } => "The AI service is temporarily unavailable. Please try again later.",
            Self::Timeout => "The assistant took too long to respond. Please try again.",
            Self::Unreachable(_) => "Unable to connect to the AI service. Please try again later.",
            Self::ConfigParse(_) | Self::MissingApiKey { .. } | Self::HttpClientBuild(_) | Self::Unknown(_) => {
                "I apologize, but I could not get a response from the AI service. Please try again in a moment."
            }
        }
    }
}

impl crate::error::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::RateLimited { .. } => "E_UPSTREAM_RATE_LIMITED",
            Self::AuthFailed { .. } => "E_UPSTREAM_AUTH_FAILED",
            Self::Unavailable { .. } => "E_UPSTREAM_UNAVAILABLE",
            Self::Timeout => "E_UPSTREAM_TIMEOUT",
            Self::Unreachable(_) => "E_UPSTREAM_UNREACHABLE",
            Self::Unknown(_) => "E_UPSTREAM_UNKNOWN",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unavailable { .. } | Self::Timeout)
    }
}

/// Map a non-success HTTP status from the provider into an error category.
#[must_use]
pub fn classify_status(status: u16, body: &str) -> LlmError {
    let body = truncate_chars(body, MAX_ERROR_BODY_CHARS);
    match status {
        429 => LlmError::RateLimited { body },
        401 => LlmError::AuthFailed { body },
        500.. => LlmError::Unavailable { status, body },
        _ => LlmError::Unknown(format!("status {status}: {body}")),
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// =============================================================================
// PROMPT ENVELOPE
// =============================================================================

/// Everything a relay backend may need to answer one message.
///
/// Hosted models consume `prompt`; the offline responder works from the raw
/// `message` and the client-supplied `context`.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    /// Fully templated prompt (persona, context, window, question).
    pub prompt: &'a str,
    /// The validated user message on its own.
    pub message: &'a str,
    pub context: Option<&'a ClientContext>,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// Provider-neutral async trait for the relay. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// Human-readable name reported by `GET /api/chat/status`.
    fn service_name(&self) -> &str;

    /// Produce a reply for one message.
    ///
    /// # Errors
    ///
    /// Returns a classified [`LlmError`] when the upstream call fails or its
    /// response carries no usable text.
    async fn chat(&self, request: &PromptRequest<'_>) -> Result<String, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
