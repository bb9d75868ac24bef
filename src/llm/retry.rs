//! Retry wrapper for retryable upstream failures.
//!
//! Attempts are `1 + max_retries`. Delays double from `base_delay_ms` with up
//! to 50% random jitter. Non-retryable errors return immediately.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::config::RetryPolicy;
use super::types::{LlmChat, LlmError, PromptRequest};
use crate::error::ErrorCode;

const MAX_BACKOFF_MS: u64 = 30_000;

/// Call `llm` under `policy`.
///
/// # Errors
///
/// Returns the last [`LlmError`] once attempts are exhausted, or the first
/// non-retryable one.
pub async fn chat_with_retry(
    llm: &dyn LlmChat,
    request: &PromptRequest<'_>,
    policy: RetryPolicy,
) -> Result<String, LlmError> {
    let mut attempt: u32 = 0;
    loop {
        match llm.chat(request).await {
            Ok(text) => return Ok(text),
            Err(e) if e.retryable() && attempt < policy.max_retries => {
                let delay = backoff_delay(policy.base_delay_ms, attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    code = e.error_code(),
                    "llm: retrying after upstream error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms
        .saturating_mul(1_u64.checked_shl(attempt).unwrap_or(u64::MAX))
        .min(MAX_BACKOFF_MS);
    let jitter = if exp >= 2 { rand::rng().random_range(0..=exp / 2) } else { 0 };
    Duration::from_millis(exp + jitter)
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
