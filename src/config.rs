//! Process configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default so the service boots with an empty
//! environment. Numeric values that fail to parse fall back to the default
//! rather than aborting startup. LLM provider settings live separately in
//! `llm::config` because they are only read when building the relay.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_CONTEXT_WINDOW: usize = 3;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 1000;

pub const DEFAULT_CHAT_RATE_LIMIT: usize = 20;
pub const DEFAULT_CHAT_RATE_WINDOW_SECS: u64 = 60;
pub const DEFAULT_API_RATE_LIMIT: usize = 100;
pub const DEFAULT_API_RATE_WINDOW_SECS: u64 = 15 * 60;

/// Deployment environment. Development exposes error details to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// A sliding-window request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub limit: usize,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Maximum exchanges retained by the in-memory history store.
    pub history_capacity: usize,
    /// Prior exchanges of the same conversation folded into the prompt.
    pub context_window: usize,
    pub history_default_limit: usize,
    pub chat_rate: RateWindow,
    pub api_rate: RateWindow,
    /// Take the client address from `X-Forwarded-For`. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_proxy: bool,
    /// Directory for daily-rotated log files; stdout only when unset.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Build the process config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            environment: Environment::parse(std::env::var("APP_ENV").ok().as_deref()),
            allowed_origins,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            history_capacity: env_parse("CHAT_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY).max(1),
            context_window: env_parse("CHAT_CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW),
            history_default_limit: env_parse("CHAT_HISTORY_DEFAULT_LIMIT", DEFAULT_HISTORY_LIMIT)
                .clamp(1, MAX_HISTORY_LIMIT),
            chat_rate: RateWindow {
                limit: env_parse("CHAT_RATE_LIMIT", DEFAULT_CHAT_RATE_LIMIT),
                window: Duration::from_secs(env_parse("CHAT_RATE_LIMIT_WINDOW_SECS", DEFAULT_CHAT_RATE_WINDOW_SECS)),
            },
            api_rate: RateWindow {
                limit: env_parse("RATE_LIMIT_MAX_REQUESTS", DEFAULT_API_RATE_LIMIT),
                window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", DEFAULT_API_RATE_WINDOW_SECS)),
            },
            trust_proxy: env_bool("TRUST_PROXY").unwrap_or(false),
            log_dir: std::env::var("LOG_DIR")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Production,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            context_window: DEFAULT_CONTEXT_WINDOW,
            history_default_limit: DEFAULT_HISTORY_LIMIT,
            chat_rate: RateWindow {
                limit: DEFAULT_CHAT_RATE_LIMIT,
                window: Duration::from_secs(DEFAULT_CHAT_RATE_WINDOW_SECS),
            },
            api_rate: RateWindow {
                limit: DEFAULT_API_RATE_LIMIT,
                window: Duration::from_secs(DEFAULT_API_RATE_WINDOW_SECS),
            },
            trust_proxy: false,
            log_dir: None,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
