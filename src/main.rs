mod config;
mod db;
mod error;
mod llm;
mod logging;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use llm::config::{LlmConfig, RetryPolicy};
use llm::{LlmChat, LlmClient};
use services::history::{HistoryStore, MemoryHistory};
use services::history_db::PgHistory;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = config::AppConfig::from_env();
    let _log_guard = logging::init(config.log_dir.as_deref());

    let port = config.port;

    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgHistory::new(pool))
        }
        None => {
            tracing::warn!(capacity = config.history_capacity, "DATABASE_URL not set, using in-memory chat history");
            Arc::new(MemoryHistory::new(config.history_capacity))
        }
    };

    // Relay setup is non-fatal: a missing key or bad provider falls back to canned replies.
    let (client, retry, startup_check) = match LlmConfig::from_env() {
        Ok(llm_config) => {
            let client = LlmClient::from_config(&llm_config).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "LLM relay not configured, using canned responses");
                LlmClient::canned()
            });
            (client, llm_config.retry, llm_config.startup_check)
        }
        Err(e) => {
            tracing::warn!(error = %e, "invalid LLM config, using canned responses");
            (LlmClient::canned(), RetryPolicy::default(), false)
        }
    };
    let llm: Arc<dyn LlmChat> = Arc::new(client);
    tracing::info!(service = llm.service_name(), max_retries = retry.max_retries, "LLM relay initialized");

    if startup_check {
        if let Err(e) = services::chat::check_relay(llm.as_ref()).await {
            tracing::warn!(error = %e, "LLM relay check failed");
        }
    }

    tracing::info!(
        environment = config.environment.as_str(),
        history_backend = history.backend_name(),
        "heva-chat starting"
    );

    let state = state::AppState::new(config, history, llm, retry);
    tracing::info!(
        chat_limit = state.chat_limiter.limit(),
        chat_window_secs = state.chat_limiter.window().as_secs(),
        api_limit = state.api_limiter.limit(),
        api_window_secs = state.api_limiter.window().as_secs(),
        "rate limits configured"
    );
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "heva-chat listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
    tracing::info!("heva-chat stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
