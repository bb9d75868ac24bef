use super::*;

// =============================================================================
// env_parse / env_bool. Each test uses its own env var names.
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__TEST_HEVA_NONEXISTENT_KEY_4411__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid_is_trimmed() {
    unsafe { std::env::set_var("__TEST_HEVA_EP_VALID__", " 99 ") };
    let val: usize = env_parse("__TEST_HEVA_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEST_HEVA_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEST_HEVA_EP_INVALID__", "lots") };
    let val: u64 = env_parse("__TEST_HEVA_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEST_HEVA_EP_INVALID__") };
}

#[test]
fn env_bool_variants() {
    for (i, (raw, expected)) in [("1", true), ("TRUE", true), (" on ", true), ("no", false), ("0", false)]
        .iter()
        .enumerate()
    {
        let key = format!("__TEST_HEVA_EB_{i}__");
        unsafe { std::env::set_var(&key, raw) };
        assert_eq!(env_bool(&key), Some(*expected), "unexpected result for {raw:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_returns_none() {
    let key = "__TEST_HEVA_EB_INVALID__";
    unsafe { std::env::set_var(key, "sometimes") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool(key), None);
}

// =============================================================================
// parsing helpers
// =============================================================================

#[test]
fn environment_parse_recognises_development() {
    assert_eq!(Environment::parse(Some("development")), Environment::Development);
    assert_eq!(Environment::parse(Some(" DEV ")), Environment::Development);
    assert_eq!(Environment::parse(Some("staging")), Environment::Production);
    assert_eq!(Environment::parse(None), Environment::Production);
}

#[test]
fn parse_origins_splits_and_trims() {
    let origins = parse_origins(" http://a.test/ ,https://b.test,, ");
    assert_eq!(origins, vec!["http://a.test".to_string(), "https://b.test".to_string()]);
}

#[test]
fn default_config_matches_constants() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.history_capacity, 1000);
    assert_eq!(cfg.context_window, 3);
    assert_eq!(cfg.chat_rate.limit, 20);
    assert_eq!(cfg.chat_rate.window, Duration::from_secs(60));
    assert_eq!(cfg.api_rate.limit, 100);
    assert_eq!(cfg.api_rate.window, Duration::from_secs(900));
    assert!(cfg.database_url.is_none());
    assert!(!cfg.environment.is_development());
    assert!(!cfg.trust_proxy, "forwarded headers are ignored unless opted in");
    assert!(cfg.log_dir.is_none());
}
