//! LLM: the relay between a chat message and a hosted generative model.
//!
//! DESIGN
//! ======
//! The `LlmClient` enum dispatches to the Gemini HTTP client or to the offline
//! canned responder, chosen by `LLM_PROVIDER`. Handlers only ever see the
//! `LlmChat` trait object, so tests swap in mocks without touching the network.

pub mod canned;
pub mod config;
pub mod gemini;
pub mod retry;
pub mod types;

use config::{LlmConfig, LlmProviderKind};
pub use types::LlmChat;
use types::{LlmError, PromptRequest};

const GEMINI_SERVICE_NAME: &str = "Gemini AI";

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete relay that dispatches to Gemini or the canned responder.
pub struct LlmClient {
    inner: LlmProvider,
}

enum LlmProvider {
    Gemini(gemini::GeminiClient),
    Canned(canned::CannedResponder),
}

impl LlmClient {
    /// Build a relay from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when Gemini is selected without a
    /// key, or [`LlmError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let inner = match config.provider {
            LlmProviderKind::Gemini => {
                let api_key = config
                    .api_key
                    .clone()
                    .ok_or_else(|| LlmError::MissingApiKey { var: config::GEMINI_API_KEY_VAR.into() })?;
                LlmProvider::Gemini(gemini::GeminiClient::new(config.api_url.clone(), api_key, config.timeouts)?)
            }
            LlmProviderKind::Canned => LlmProvider::Canned(canned::CannedResponder),
        };
        Ok(Self { inner })
    }

    /// Offline relay that never leaves the process.
    #[must_use]
    pub fn canned() -> Self {
        Self { inner: LlmProvider::Canned(canned::CannedResponder) }
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    fn service_name(&self) -> &str {
        match &self.inner {
            LlmProvider::Gemini(_) => GEMINI_SERVICE_NAME,
            LlmProvider::Canned(_) => canned::SERVICE_NAME,
        }
    }

    async fn chat(&self, request: &PromptRequest<'_>) -> Result<String, LlmError> {
        match &self.inner {
            LlmProvider::Gemini(c) => c.generate(request.prompt).await,
            LlmProvider::Canned(c) => Ok(c.reply(request.message, request.context)),
        }
    }
}
