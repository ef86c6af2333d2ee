// Config loading and validation tests

use std::time::Duration;
use syspulse::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[monitoring]
cpu_sample_window_ms = 1000
collector_timeout_ms = 5000
default_interval_secs = 2
min_interval_ms = 500
max_interval_secs = 3600
default_top_n = 10
max_top_n = 100

[publishing]
ws_send_timeout_ms = 10000
ws_ping_interval_secs = 30
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.monitoring.cpu_sample_window_ms, 1000);
    assert_eq!(config.monitoring.default_top_n, 10);
    assert_eq!(config.publishing.ws_ping_interval_secs, 30);
}

#[test]
fn test_config_sections_default_when_omitted() {
    let config = AppConfig::load_from_str("[server]\nport = 9000\n").expect("valid");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.monitoring.default_interval_secs, 2);
    assert_eq!(config.monitoring.collector_timeout_ms, 5000);
    assert_eq!(config.publishing.ws_send_timeout_ms, 10_000);
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_timeout_not_above_cpu_window() {
    let bad = VALID_CONFIG.replace("collector_timeout_ms = 5000", "collector_timeout_ms = 1000");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("collector_timeout_ms"));
}

#[test]
fn test_config_validation_rejects_cpu_window_zero() {
    let bad = VALID_CONFIG.replace("cpu_sample_window_ms = 1000", "cpu_sample_window_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("cpu_sample_window_ms"));
}

#[test]
fn test_config_validation_rejects_default_interval_outside_bounds() {
    let bad = VALID_CONFIG.replace("default_interval_secs = 2", "default_interval_secs = 7200");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("default_interval_secs"));
}

#[test]
fn test_config_validation_rejects_default_top_n_above_max() {
    let bad = VALID_CONFIG.replace("default_top_n = 10", "default_top_n = 500");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("default_top_n"));
}

#[test]
fn test_config_validation_rejects_ws_ping_interval_zero() {
    let bad = VALID_CONFIG.replace("ws_ping_interval_secs = 30", "ws_ping_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("ws_ping_interval_secs"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG.replace("port = 8081", "port = 8082")).unwrap();
    let config = AppConfig::load_from_path(path.to_str().unwrap()).expect("load from file");
    assert_eq!(config.server.port, 8082);
}

#[test]
fn test_config_missing_file_means_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let config = AppConfig::load_from_path(path.to_str().unwrap()).expect("defaults");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.monitoring.max_top_n, 100);
}

#[test]
fn test_stream_request_fills_defaults() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let req = config.stream_request(None, None);
    assert_eq!(req.interval, Duration::from_secs(2));
    assert_eq!(req.top_n, 10);

    let req = config.stream_request(Some(0.5), Some(3));
    assert_eq!(req.interval, Duration::from_millis(500));
    assert_eq!(req.top_n, 3);

    // non-positive intervals pass through as zero and fail validation later
    let req = config.stream_request(Some(-1.0), None);
    assert_eq!(req.interval, Duration::ZERO);
    assert!(req.validate(&config.stream_limits()).is_err());
}

#[test]
fn test_collect_settings_follow_monitoring_section() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let settings = config.collect_settings();
    assert_eq!(settings.cpu_window, Duration::from_secs(1));
    assert_eq!(settings.collector_timeout, Duration::from_secs(5));
}
