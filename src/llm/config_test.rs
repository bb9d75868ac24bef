use super::*;

/// # Safety
/// Tests must run with `--test-threads=1` to avoid env races.
unsafe fn clear_llm_env() {
    unsafe {
        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("GEMINI_API_URL");
        std::env::remove_var("LLM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("LLM_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("LLM_MAX_RETRIES");
        std::env::remove_var("LLM_RETRY_BASE_MS");
        std::env::remove_var("LLM_STARTUP_CHECK");
    }
}

#[test]
fn parse_provider_defaults_to_gemini() {
    assert_eq!(parse_provider(None).unwrap(), LlmProviderKind::Gemini);
    assert_eq!(parse_provider(Some(" canned ")).unwrap(), LlmProviderKind::Canned);
}

#[test]
fn parse_provider_unknown_errors() {
    let err = parse_provider(Some("bard")).unwrap_err().to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));
}

#[test]
fn retry_policy_default_disables_retries() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 0);
    assert_eq!(policy.base_delay_ms, DEFAULT_LLM_RETRY_BASE_MS);
}

#[test]
fn from_env_defaults_and_overrides() {
    unsafe {
        clear_llm_env();
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Gemini);
    assert_eq!(cfg.api_key, None);
    assert_eq!(cfg.api_url, DEFAULT_GEMINI_API_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.retry, RetryPolicy::default());
    assert!(!cfg.startup_check);

    unsafe {
        std::env::set_var("GEMINI_API_KEY", "  secret ");
        std::env::set_var("GEMINI_API_URL", "http://localhost:9999/generate");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "12");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "0");
        std::env::set_var("LLM_MAX_RETRIES", "2");
        std::env::set_var("LLM_RETRY_BASE_MS", "50");
        std::env::set_var("LLM_STARTUP_CHECK", "yes");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.api_key.as_deref(), Some("secret"));
    assert_eq!(cfg.api_url, "http://localhost:9999/generate");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 12, connect_secs: 1 });
    assert_eq!(cfg.retry, RetryPolicy { max_retries: 2, base_delay_ms: 50 });
    assert!(cfg.startup_check);

    unsafe {
        std::env::set_var("GEMINI_API_KEY", "   ");
    }
    assert_eq!(LlmConfig::from_env().unwrap().api_key, None);

    unsafe { clear_llm_env() };
}
