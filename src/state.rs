//! Shared application state and the chat exchange record.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the history store, the LLM relay, both rate limiters, and the
//! process config. Every field is behind an `Arc` so cloning is cheap.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::llm::LlmChat;
use crate::llm::config::RetryPolicy;
use crate::rate_limit::RateLimiter;
use crate::services::history::HistoryStore;

// =============================================================================
// CHAT EXCHANGE
// =============================================================================

/// Optional page/score hints sent by the frontend with a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tier: Option<String>,
}

impl ClientContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.user_score.is_none() && self.user_tier.is_none()
    }
}

/// One user-message/AI-response pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    pub id: Uuid,
    pub user_id: String,
    pub conversation_id: String,
    pub user_message: String,
    pub ai_response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_context: Option<ClientContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub history: Arc<dyn HistoryStore>,
    pub llm: Arc<dyn LlmChat>,
    pub retry: RetryPolicy,
    /// Per-IP limiter for `POST /api/chat`.
    pub chat_limiter: RateLimiter,
    /// Per-IP limiter for every `/api` route.
    pub api_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, history: Arc<dyn HistoryStore>, llm: Arc<dyn LlmChat>, retry: RetryPolicy) -> Self {
        let chat_limiter = RateLimiter::new(config.chat_rate);
        let api_limiter = RateLimiter::new(config.api_rate);
        Self {
            config: Arc::new(config),
            history,
            llm,
            retry,
            chat_limiter,
            api_limiter,
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
