//! Gemini `generateContent` client.
//!
//! Thin HTTP wrapper around one outbound call. Request shaping and response
//! parsing are pure functions for testability; transport failures are
//! classified through [`classify_transport`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::LlmTimeouts;
use super::types::{LlmError, classify_status};

const TEMPERATURE: f32 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 1024;
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client with the configured request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if reqwest rejects the settings.
    pub fn new(api_url: String, api_key: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_url, api_key })
    }

    /// Send one prompt and return the first candidate's trimmed text.
    ///
    /// # Errors
    ///
    /// Returns a classified [`LlmError`] for HTTP, transport, and parse failures.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = build_request(prompt);
        debug!(prompt_len = prompt.len(), "gemini: sending request");

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify_transport(&e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "gemini: non-success response");
            return Err(classify_status(status.as_u16(), &text));
        }

        parse_response(&text)
    }
}

/// Classify a reqwest transport failure. Timeouts win over connect errors so
/// a connect timeout reports as a timeout.
pub(crate) fn classify_transport(err: &reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else if err.is_connect() {
        LlmError::Unreachable(err.to_string())
    } else {
        LlmError::Unknown(err.to_string())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn build_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [RequestContent { parts: [RequestPart { text: prompt }] }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
        safety_settings: SAFETY_CATEGORIES
            .into_iter()
            .map(|category| SafetySetting { category, threshold: SAFETY_THRESHOLD })
            .collect(),
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_response(json: &str) -> Result<String, LlmError> {
    let api: GenerateResponse =
        serde_json::from_str(json).map_err(|e| LlmError::Unknown(format!("invalid response body: {e}")))?;

    let text = api
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        warn!("gemini: response carried no candidate text");
        return Err(LlmError::Unknown("response contained no candidate text".into()));
    }
    Ok(text)
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
