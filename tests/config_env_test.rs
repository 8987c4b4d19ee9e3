//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy when one is present, so each test sets what it asserts on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use mcp_thought_graph::config::{Config, LogFormat, DEFAULT_AVAILABLE_TOOLS};
use mcp_thought_graph::AppError;
use serial_test::serial;
use std::env;

const VARS: &[&str] = &[
    "LOG_LEVEL",
    "LOG_FORMAT",
    "VECTOR_DIMENSION",
    "VECTOR_CACHE_SIZE",
    "PRETRAINED_VECTORS_PATH",
    "DRIFT_THRESHOLD",
    "CONTRADICTION_SIMILARITY",
    "CLUSTER_SIMILARITY",
    "AVAILABLE_TOOLS",
];

fn clear_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_config_from_env_defaults() {
    clear_vars();

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.vectors.dimension, 128);
    assert_eq!(config.vectors.cache_size, 2048);
    assert!(config.vectors.pretrained_path.is_none());
    assert_eq!(config.analysis.drift_threshold, 0.55);
    assert_eq!(config.analysis.contradiction_similarity, 0.5);
    assert_eq!(config.analysis.cluster_similarity, 0.6);
    assert_eq!(config.session.available_tools, DEFAULT_AVAILABLE_TOOLS);
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    clear_vars();
    env::set_var("LOG_FORMAT", "JSON");
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_vector_settings() {
    clear_vars();
    env::set_var("VECTOR_DIMENSION", "32");
    env::set_var("VECTOR_CACHE_SIZE", "16");
    env::set_var("PRETRAINED_VECTORS_PATH", "/tmp/glove.txt");

    let config = Config::from_env().unwrap();
    assert_eq!(config.vectors.dimension, 32);
    assert_eq!(config.vectors.cache_size, 16);
    assert_eq!(
        config.vectors.pretrained_path.unwrap().to_str().unwrap(),
        "/tmp/glove.txt"
    );

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_clamps_and_falls_back() {
    clear_vars();
    env::set_var("VECTOR_DIMENSION", "2");
    env::set_var("VECTOR_CACHE_SIZE", "not-a-number");
    env::set_var("PRETRAINED_VECTORS_PATH", "   ");

    let config = Config::from_env().unwrap();
    assert_eq!(config.vectors.dimension, 8);
    assert_eq!(config.vectors.cache_size, 2048);
    assert!(config.vectors.pretrained_path.is_none());

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_thresholds() {
    clear_vars();
    env::set_var("DRIFT_THRESHOLD", "0.7");
    env::set_var("CLUSTER_SIMILARITY", "0.45");

    let config = Config::from_env().unwrap();
    assert_eq!(config.analysis.drift_threshold, 0.7);
    assert_eq!(config.analysis.cluster_similarity, 0.45);
    assert_eq!(config.analysis.contradiction_similarity, 0.5);

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_threshold_out_of_range() {
    clear_vars();
    env::set_var("CONTRADICTION_SIMILARITY", "1.5");

    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config { .. }));
    assert!(err.to_string().contains("CONTRADICTION_SIMILARITY"));

    clear_vars();
}

#[test]
#[serial]
fn test_config_from_env_available_tools() {
    clear_vars();
    env::set_var("AVAILABLE_TOOLS", " search , , shell ");

    let config = Config::from_env().unwrap();
    assert_eq!(config.session.available_tools, vec!["search", "shell"]);

    env::set_var("AVAILABLE_TOOLS", " , ");
    let config = Config::from_env().unwrap();
    assert_eq!(config.session.available_tools.len(), DEFAULT_AVAILABLE_TOOLS.len());

    clear_vars();
}
