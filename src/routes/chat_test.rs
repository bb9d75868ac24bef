use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::{AppConfig, Environment, RateWindow};
use crate::llm::LlmClient;
use crate::llm::config::{LlmConfig, LlmProviderKind, LlmTimeouts, RetryPolicy};
use crate::llm::types::LlmError;
use crate::routes::test_support::spawn_app;
use crate::state::test_helpers::{MockLlm, test_app_state, test_app_state_with};

async fn post_chat(base: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(url: String) -> serde_json::Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

// =============================================================================
// resolve_limit
// =============================================================================

#[test]
fn resolve_limit_falls_back_and_caps() {
    assert_eq!(resolve_limit(None, 50), 50);
    assert_eq!(resolve_limit(Some("abc"), 50), 50);
    assert_eq!(resolve_limit(Some("0"), 50), 50);
    assert_eq!(resolve_limit(Some("-3"), 50), 50);
    assert_eq!(resolve_limit(Some(" 7 "), 50), 7);
    assert_eq!(resolve_limit(Some("5000"), 50), MAX_HISTORY_LIMIT);
}

// =============================================================================
// POST /api/chat validation
// =============================================================================

#[tokio::test]
async fn whitespace_message_is_400() {
    let base = spawn_app(test_app_state()).await;
    let (status, body) = post_chat(&base, serde_json::json!({ "message": "   " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["field"], "message");
    assert_eq!(body["code"], "E_VALIDATION");
    assert_eq!(body["error"], "Message cannot be empty");
}

#[tokio::test]
async fn oversized_message_reports_lengths() {
    let base = spawn_app(test_app_state()).await;
    let (status, body) = post_chat(&base, serde_json::json!({ "message": "x".repeat(4001) })).await;
    assert_eq!(status, 400);
    assert_eq!(body["maxLength"], 4000);
    assert_eq!(body["currentLength"], 4001);
}

#[tokio::test]
async fn malformed_json_is_400_on_body_field() {
    let base = spawn_app(test_app_state()).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["field"], "body");
    assert!(body.get("details").is_none());
}

// =============================================================================
// POST /api/chat relay errors
// =============================================================================

#[tokio::test]
async fn upstream_busy_maps_to_polite_500() {
    let llm = Arc::new(MockLlm::new(vec![Err(LlmError::RateLimited { body: "quota".into() })]));
    let base = spawn_app(test_app_state_with(AppConfig::default(), llm)).await;

    let (status, body) = post_chat(&base, serde_json::json!({ "message": "hi" })).await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "E_UPSTREAM_RATE_LIMITED");
    assert!(body["error"].as_str().unwrap().contains("busy"));
    assert!(body.get("details").is_none(), "details hidden outside development");
}

#[tokio::test]
async fn development_mode_exposes_details() {
    let llm = Arc::new(MockLlm::new(vec![Err(LlmError::Timeout)]));
    let config = AppConfig { environment: Environment::Development, ..AppConfig::default() };
    let base = spawn_app(test_app_state_with(config, llm)).await;

    let (status, body) = post_chat(&base, serde_json::json!({ "message": "hi" })).await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "E_UPSTREAM_TIMEOUT");
    assert!(body["details"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn gemini_429_is_called_exactly_once_end_to_end() {
    use axum::routing::post;

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let upstream = axum::Router::new().route(
        "/generate",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let llm_config = LlmConfig {
        provider: LlmProviderKind::Gemini,
        api_key: Some("test-key".into()),
        api_url: format!("http://{upstream_addr}/generate"),
        timeouts: LlmTimeouts { request_secs: 5, connect_secs: 1 },
        retry: RetryPolicy::default(),
        startup_check: false,
    };
    let llm = Arc::new(LlmClient::from_config(&llm_config).unwrap());
    let base = spawn_app(test_app_state_with(AppConfig::default(), llm)).await;

    let (status, body) = post_chat(&base, serde_json::json!({ "message": "What is my score?" })).await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("busy"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let status_body = get_json(format!("{base}/api/chat/status")).await;
    assert_eq!(status_body["service"], "Gemini AI");
}

#[tokio::test]
async fn chat_limiter_returns_429_with_chat_message() {
    let config = AppConfig {
        chat_rate: RateWindow { limit: 1, window: Duration::from_secs(60) },
        ..AppConfig::default()
    };
    let base = spawn_app(test_app_state_with(config, Arc::new(MockLlm::new(Vec::new())))).await;

    let (status, _) = post_chat(&base, serde_json::json!({ "message": "one" })).await;
    assert_eq!(status, 200);
    let (status, body) = post_chat(&base, serde_json::json!({ "message": "two" })).await;
    assert_eq!(status, 429);
    assert_eq!(body["error"], CHAT_RATE_LIMIT_MESSAGE);
    assert!(body["retryAfter"].as_u64().unwrap() <= 60);
}

#[tokio::test]
async fn rotating_forwarded_for_from_one_socket_shares_chat_budget() {
    let config = AppConfig {
        chat_rate: RateWindow { limit: 1, window: Duration::from_secs(60) },
        ..AppConfig::default()
    };
    let base = spawn_app(test_app_state_with(config, Arc::new(MockLlm::new(Vec::new())))).await;
    let client = reqwest::Client::new();

    let mut statuses = Vec::new();
    for i in 1..=5 {
        let resp = client
            .post(format!("{base}/api/chat"))
            .header("x-forwarded-for", format!("10.0.0.{i}"))
            .json(&serde_json::json!({ "message": "hi" }))
            .send()
            .await
            .unwrap();
        statuses.push(resp.status().as_u16());
    }
    assert_eq!(statuses, [200, 429, 429, 429, 429]);
}

// =============================================================================
// round trip
// =============================================================================

#[tokio::test]
async fn exchange_is_visible_in_history() {
    let base = spawn_app(test_app_state()).await;

    let (status, reply) = post_chat(
        &base,
        serde_json::json!({ "message": "How do I apply?", "userId": "u-42", "conversationId": "conv_abc" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(reply["success"], true);
    assert_eq!(reply["response"], "echo: How do I apply?");
    assert_eq!(reply["conversationId"], "conv_abc");
    let message_id = reply["messageId"].as_str().unwrap().to_string();

    post_chat(&base, serde_json::json!({ "message": "other user", "userId": "u-7" })).await;

    let by_user = get_json(format!("{base}/api/chat/history?userId=u-42")).await;
    assert_eq!(by_user["success"], true);
    assert_eq!(by_user["count"], 1);
    assert_eq!(by_user["total"], 1);
    let entry = &by_user["history"][0];
    assert_eq!(entry["id"], message_id.as_str());
    assert_eq!(entry["userMessage"], "How do I apply?");
    assert_eq!(entry["aiResponse"], "echo: How do I apply?");
    assert!(entry.get("clientIp").is_none());

    let by_conversation = get_json(format!("{base}/api/chat/history?conversationId=conv_abc&limit=junk")).await;
    assert_eq!(by_conversation["count"], 1);

    let everything = get_json(format!("{base}/api/chat/history?limit=1")).await;
    assert_eq!(everything["count"], 1);
    assert_eq!(everything["total"], 2);
    assert_eq!(everything["history"][0]["userMessage"], "other user");
}

#[tokio::test]
async fn long_user_id_is_accepted_and_queryable() {
    let base = spawn_app(test_app_state()).await;
    let user_id = "u".repeat(129);

    let (status, _) = post_chat(&base, serde_json::json!({ "message": "hi", "userId": user_id })).await;
    assert_eq!(status, 200);

    let body = get_json(format!("{base}/api/chat/history?userId={user_id}")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["history"][0]["userId"], user_id.as_str());
}

#[tokio::test]
async fn status_names_the_relay() {
    let base = spawn_app(test_app_state()).await;
    let body = get_json(format!("{base}/api/chat/status")).await;
    assert_eq!(body["status"], "online");
    assert_eq!(body["service"], "mock");
}
