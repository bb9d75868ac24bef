//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the chat API under `/api/chat` plus the health and welcome
//! endpoints. Every `/api` route passes through the per-IP API limiter;
//! `POST /api/chat` is additionally metered by the chat limiter inside the
//! chat service. Security headers, CORS, gzip compression and request
//! tracing wrap everything.

pub mod chat;

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::now_rfc3339;
use crate::rate_limit::RateLimitError;
use crate::state::AppState;

/// Baseline hardening headers, set only when a handler has not already.
const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (header::STRICT_TRANSPORT_SECURITY, "max-age=15552000; includeSubDomains"),
];

const API_RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat", axum::routing::post(chat::send_message))
        .route("/chat/history", get(chat::history))
        .route("/chat/status", get(chat::status))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_rate_limit));

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found);
    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value)));
    }

    router
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "cors: ignoring invalid origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

// =============================================================================
// CLIENT IP
// =============================================================================

/// Client address used as the rate-limit key.
///
/// The socket peer by default. With `TRUST_PROXY` set, the first
/// `X-Forwarded-For` hop wins when it parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl<S> FromRequestParts<S> for ClientIp
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy = AppState::from_ref(state).config.trust_proxy;
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self(resolve_client_ip(&parts.headers, peer, trust_proxy)))
    }
}

fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    trust_proxy
        .then(|| forwarded_for(headers))
        .flatten()
        .or(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

// =============================================================================
// RATE LIMITING
// =============================================================================

async fn api_rate_limit(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    match state.api_limiter.check_and_record(ip) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(%ip, limit = e.limit, window_secs = e.window_secs, "api: rate limited");
            rate_limited_response(&e, API_RATE_LIMIT_MESSAGE)
        }
    }
}

/// 429 body shared by both limiters, with a `Retry-After` header.
pub(crate) fn rate_limited_response(err: &RateLimitError, message: &str) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message,
        "retryAfter": err.retry_after_secs,
    }));
    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(err.retry_after_secs));
    response
}

// =============================================================================
// MISC ENDPOINTS
// =============================================================================

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to the HEVA Chat API!",
        "endpoints": {
            "health": "/health",
            "chat": "/api/chat",
            "history": "/api/chat/history",
            "status": "/api/chat/status",
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": now_rfc3339(),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "environment": state.config.environment.as_str(),
        "historyBackend": state.history.backend_name(),
    }))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": format!("Not Found - {}", uri.path()),
        })),
    )
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
