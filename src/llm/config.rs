//! LLM configuration parsed from environment variables.

use super::types::LlmError;
use crate::config::{env_bool, env_parse};

pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 0;
pub const DEFAULT_LLM_RETRY_BASE_MS: u64 = 500;

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    Canned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Retry policy for retryable upstream failures (429, 5xx, timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first call. Zero disables retries.
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_LLM_MAX_RETRIES, base_delay_ms: DEFAULT_LLM_RETRY_BASE_MS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    /// `None` when the key variable is unset or blank.
    pub api_key: Option<String>,
    pub api_url: String,
    pub timeouts: LlmTimeouts,
    pub retry: RetryPolicy,
    /// Send a check message at startup and log the outcome.
    pub startup_check: bool,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Optional:
    /// - `LLM_PROVIDER`: `gemini` (default) or `canned`
    /// - `GEMINI_API_KEY`: required by the Gemini client at build time
    /// - `GEMINI_API_URL`: `generateContent` endpoint
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    /// - `LLM_MAX_RETRIES`: default 0
    /// - `LLM_RETRY_BASE_MS`: default 500
    /// - `LLM_STARTUP_CHECK`: default false
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigParse`] for an unknown provider name.
    pub fn from_env() -> Result<Self, LlmError> {
        let provider = parse_provider(std::env::var("LLM_PROVIDER").ok().as_deref())?;
        let api_key = std::env::var(GEMINI_API_KEY_VAR)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let api_url = std::env::var("GEMINI_API_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string());
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS).max(1),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS).max(1),
        };
        let retry = RetryPolicy {
            max_retries: env_parse("LLM_MAX_RETRIES", DEFAULT_LLM_MAX_RETRIES),
            base_delay_ms: env_parse("LLM_RETRY_BASE_MS", DEFAULT_LLM_RETRY_BASE_MS),
        };
        let startup_check = env_bool("LLM_STARTUP_CHECK").unwrap_or(false);

        Ok(Self { provider, api_key, api_url, timeouts, retry, startup_check })
    }
}

fn parse_provider(raw: Option<&str>) -> Result<LlmProviderKind, LlmError> {
    match raw.map(str::trim).unwrap_or("gemini") {
        "gemini" | "" => Ok(LlmProviderKind::Gemini),
        "canned" => Ok(LlmProviderKind::Canned),
        other => Err(LlmError::ConfigParse(format!("unknown LLM_PROVIDER: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
