//! History service: append-only chat exchange storage.
//!
//! DESIGN
//! ======
//! `HistoryStore` is the seam between the chat flow and storage. Two backends
//! satisfy the same contract:
//! - `MemoryHistory`: a bounded FIFO ring. Push and eviction happen under one
//!   mutex, so concurrent appends never overshoot the cap. Lost on restart.
//! - `PgHistory` (see `history_db`): a Postgres table with no cap.
//!
//! Neither backend exposes update or delete.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::state::ChatExchange;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

impl crate::error::ErrorCode for HistoryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_HISTORY_DATABASE",
            Self::Corrupt(_) => "E_HISTORY_CORRUPT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Filter for history listings. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub limit: usize,
}

impl HistoryQuery {
    fn matches(&self, exchange: &ChatExchange) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == exchange.user_id)
            && self
                .conversation_id
                .as_ref()
                .is_none_or(|c| *c == exchange.conversation_id)
    }
}

/// The most recent `limit` matches, oldest first, plus the total match count.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub items: Vec<ChatExchange>,
    pub total: usize,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Short backend label for health output and logs.
    fn backend_name(&self) -> &'static str;

    /// Persist one completed exchange.
    async fn append(&self, exchange: ChatExchange) -> Result<(), HistoryError>;

    /// List exchanges matching `query`.
    async fn list(&self, query: &HistoryQuery) -> Result<HistoryPage, HistoryError>;

    /// The last `n` exchanges of a conversation, oldest first.
    async fn recent(&self, conversation_id: &str, n: usize) -> Result<Vec<ChatExchange>, HistoryError>;
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

pub struct MemoryHistory {
    entries: Mutex<VecDeque<ChatExchange>>,
    capacity: usize,
}

impl MemoryHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity.min(4096))), capacity }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ChatExchange>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, exchange: ChatExchange) -> Result<(), HistoryError> {
        let mut entries = self.lock();
        entries.push_back(exchange);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        Ok(())
    }

    async fn list(&self, query: &HistoryQuery) -> Result<HistoryPage, HistoryError> {
        let entries = self.lock();
        let matching: Vec<&ChatExchange> = entries.iter().filter(|e| query.matches(e)).collect();
        let total = matching.len();
        let skip = total.saturating_sub(query.limit);
        let items = matching.into_iter().skip(skip).cloned().collect();
        Ok(HistoryPage { items, total })
    }

    async fn recent(&self, conversation_id: &str, n: usize) -> Result<Vec<ChatExchange>, HistoryError> {
        let entries = self.lock();
        let mut window: Vec<ChatExchange> = entries
            .iter()
            .rev()
            .filter(|e| e.conversation_id == conversation_id)
            .take(n)
            .cloned()
            .collect();
        window.reverse();
        Ok(window)
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
