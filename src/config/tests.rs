use super::*;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_rerank_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("RERANK_BATCH_SIZE");
        env::remove_var("RERANK_MAX_LENGTH");
        env::remove_var("RERANK_COMPILE_MODEL");
        env::remove_var("RERANK_WARM_UP");
        env::remove_var("RERANK_CACHE_SIZE");
        env::remove_var("RERANK_BATCH_POLICY");
        env::remove_var("RERANK_DEADLINE_MS");
        env::remove_var("RERANK_MODEL_PATH");
        env::remove_var("RERANK_SCORER");
    }
}

#[test]
fn test_default_config() {
    let config = EngineConfig::default();

    assert_eq!(config.batch_size, None);
    assert_eq!(config.max_length, 512);
    assert!(config.compile_model);
    assert!(config.warm_up);
    assert_eq!(config.cache_size, 1000);
    assert_eq!(config.batch_size_policy, BatchSizePolicy::Persist);
    assert!(config.deadline().is_none());
    assert!(config.model_path.is_none());
    assert_eq!(config.scorer, ScorerKind::CrossEncoder);
    assert!(config.caching_enabled());
}

#[test]
fn test_builder_methods() {
    let config = EngineConfig::default()
        .with_batch_size(8)
        .with_cache_size(0)
        .with_compile_model(false)
        .with_warm_up(false)
        .with_batch_size_policy(BatchSizePolicy::ResetPerRequest)
        .with_deadline(Duration::from_millis(250));

    assert_eq!(config.batch_size, Some(8));
    assert!(!config.caching_enabled());
    assert!(!config.compile_model);
    assert!(!config.warm_up);
    assert_eq!(config.batch_size_policy, BatchSizePolicy::ResetPerRequest);
    assert_eq!(config.deadline(), Some(Duration::from_millis(250)));
}

#[test]
fn test_policy_parse() {
    assert_eq!(BatchSizePolicy::parse("persist"), Some(BatchSizePolicy::Persist));
    assert_eq!(
        BatchSizePolicy::parse(" RESET "),
        Some(BatchSizePolicy::ResetPerRequest)
    );
    assert_eq!(
        BatchSizePolicy::parse("reset_per_request"),
        Some(BatchSizePolicy::ResetPerRequest)
    );
    assert_eq!(BatchSizePolicy::parse("grow"), None);
}

#[test]
fn test_scorer_kind_parse() {
    assert_eq!(ScorerKind::parse("cross_encoder"), Some(ScorerKind::CrossEncoder));
    assert_eq!(ScorerKind::parse(" Bi-Encoder "), Some(ScorerKind::BiEncoder));
    assert_eq!(ScorerKind::parse("bi"), Some(ScorerKind::BiEncoder));
    assert_eq!(ScorerKind::parse("colbert"), None);
}

#[test]
fn test_validate_rejects_zero_batch_size() {
    let config = EngineConfig::default().with_batch_size(0);
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            name: "batch_size",
            ..
        }
    ));
}

#[test]
fn test_validate_rejects_zero_max_length() {
    let config = EngineConfig {
        max_length: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_deadline() {
    let config = EngineConfig {
        deadline_ms: Some(0),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_missing_model_path() {
    let config = EngineConfig {
        model_path: Some(PathBuf::from("/nonexistent/reranker")),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));
}

#[test]
fn test_validate_model_path_must_be_directory() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let config = EngineConfig {
        model_path: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_from_json_partial_document() {
    let config =
        EngineConfig::from_json_str(
            r#"{"batch_size": 32, "batch_size_policy": "reset_per_request", "scorer": "bi_encoder"}"#,
        )
        .expect("should parse");

    assert_eq!(config.batch_size, Some(32));
    assert_eq!(config.scorer, ScorerKind::BiEncoder);
    assert_eq!(config.batch_size_policy, BatchSizePolicy::ResetPerRequest);
    assert_eq!(config.cache_size, 1000);
    assert!(config.warm_up);
}

#[test]
fn test_from_json_null_batch_size_means_auto() {
    let config = EngineConfig::from_json_str(r#"{"batch_size": null}"#).expect("should parse");
    assert_eq!(config.batch_size, None);
}

#[test]
fn test_from_json_invalid() {
    assert!(matches!(
        EngineConfig::from_json_str("{not json"),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        EngineConfig::from_json_str(r#"{"batch_size": 0}"#),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(br#"{"cache_size": 0, "compile_model": false}"#)
        .expect("write");
    file.flush().expect("flush");

    let config = EngineConfig::from_json_file(file.path()).expect("should load");
    assert_eq!(config.cache_size, 0);
    assert!(!config.compile_model);

    assert!(matches!(
        EngineConfig::from_json_file("/nonexistent/rerank.json"),
        Err(ConfigError::ReadFailed { .. })
    ));
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_rerank_env();

    let config = EngineConfig::from_env().expect("should parse with defaults");
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_rerank_env();

    let config = with_env_vars(
        &[
            ("RERANK_BATCH_SIZE", "24"),
            ("RERANK_MAX_LENGTH", "256"),
            ("RERANK_COMPILE_MODEL", "false"),
            ("RERANK_WARM_UP", "0"),
            ("RERANK_CACHE_SIZE", "50"),
            ("RERANK_BATCH_POLICY", "reset"),
            ("RERANK_DEADLINE_MS", "1500"),
            ("RERANK_SCORER", "bi_encoder"),
        ],
        EngineConfig::from_env,
    )
    .expect("should parse overrides");

    assert_eq!(config.batch_size, Some(24));
    assert_eq!(config.max_length, 256);
    assert!(!config.compile_model);
    assert!(!config.warm_up);
    assert_eq!(config.cache_size, 50);
    assert_eq!(config.batch_size_policy, BatchSizePolicy::ResetPerRequest);
    assert_eq!(config.deadline_ms, Some(1500));
    assert_eq!(config.scorer, ScorerKind::BiEncoder);
}

#[test]
#[serial]
fn test_from_env_empty_batch_size_means_auto() {
    clear_rerank_env();

    let config = with_env_vars(&[("RERANK_BATCH_SIZE", "  ")], EngineConfig::from_env)
        .expect("should parse");
    assert_eq!(config.batch_size, None);
}

#[test]
#[serial]
fn test_from_env_invalid_values() {
    clear_rerank_env();

    let result = with_env_vars(&[("RERANK_BATCH_SIZE", "lots")], EngineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::IntParseError { .. })));

    let result = with_env_vars(&[("RERANK_WARM_UP", "maybe")], EngineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    let result = with_env_vars(&[("RERANK_BATCH_POLICY", "grow")], EngineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    let result = with_env_vars(&[("RERANK_SCORER", "colbert")], EngineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    let result = with_env_vars(&[("RERANK_BATCH_SIZE", "0")], EngineConfig::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
