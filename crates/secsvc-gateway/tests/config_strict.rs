#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use secsvc_gateway::config::{self, GatewayConfig, LogFormat};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  otlp:
    endpiont: "http://collector:4317" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8000");
    assert_eq!(cfg.logging.format, LogFormat::Text);
    assert_eq!(cfg.metrics.exposition_path, "/metrics");
    assert_eq!(cfg.metrics.slow_request_ms, 1000);
    assert!(cfg.metrics.otlp.enabled);
    assert_eq!(cfg.metrics.otlp.endpoint, "http://localhost:4317");
    assert_eq!(cfg.metrics.otlp.service_name, "security-service");
    assert_eq!(cfg.metrics.otlp.service_version, "1.0.0");
    assert_eq!(cfg.metrics.otlp.export_interval_ms, 5000);
}

#[test]
fn full_config_parses() {
    let ok = r#"
version: 1
gateway:
  listen: "127.0.0.1:9000"
  shutdown_grace_ms: 0
logging:
  format: json
  filter: "secsvc_gateway=debug,info"
metrics:
  exposition_path: "/internal/metrics"
  slow_request_ms: 250
  otlp:
    enabled: false
    export_interval_ms: 15000
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.gateway.listen, "127.0.0.1:9000");
    assert_eq!(cfg.logging.format, LogFormat::Json);
    assert_eq!(cfg.metrics.exposition_path, "/internal/metrics");
    assert!(!cfg.metrics.otlp.enabled);
    assert_eq!(cfg.metrics.otlp.export_interval_ms, 15000);
}

#[test]
fn unsupported_version_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn out_of_range_values_are_rejected() {
    for bad in [
        "version: 1\nmetrics:\n  otlp:\n    export_interval_ms: 10\n",
        "version: 1\nmetrics:\n  slow_request_ms: 0\n",
        "version: 1\nmetrics:\n  exposition_path: metrics\n",
        "version: 1\nmetrics:\n  exposition_path: /health/scrape\n",
        "version: 1\nmetrics:\n  exposition_path: \"/metrics/:shard\"\n",
        "version: 1\nmetrics:\n  exposition_path: \"/*rest\"\n",
        "version: 1\nmetrics:\n  exposition_path: \"/metrics/{shard}\"\n",
        "version: 1\ngateway:\n  listen: not-an-address\n",
        "version: 1\nlogging:\n  format: xml\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{bad}");
    }
}

#[test]
fn exposition_path_must_be_literal() {
    for path in ["/metrics/:shard", "/*rest", "/metrics/{shard}"] {
        let mut cfg = GatewayConfig::default();
        cfg.metrics.exposition_path = path.into();
        let err = cfg.validate().expect_err(path);
        assert!(err.to_string().contains("without captures or wildcards"), "{path}: {err}");
    }

    let mut cfg = GatewayConfig::default();
    cfg.metrics.exposition_path = "/internal/metrics-v2".into();
    cfg.validate().unwrap();
}

#[test]
fn env_overrides_replace_file_values() {
    let mut cfg = GatewayConfig::default();
    cfg.apply_overrides(env(&[
        ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
        ("OTEL_SERVICE_NAME", "security-service-canary"),
        ("OTEL_SERVICE_VERSION", "1.2.3"),
        ("SECSVC_LISTEN", "127.0.0.1:8100"),
    ]));

    assert_eq!(cfg.metrics.otlp.endpoint, "http://collector:4317");
    assert_eq!(cfg.metrics.otlp.service_name, "security-service-canary");
    assert_eq!(cfg.metrics.otlp.service_version, "1.2.3");
    assert_eq!(cfg.gateway.listen, "127.0.0.1:8100");
    cfg.validate().unwrap();
}

#[test]
fn blank_env_values_are_ignored() {
    let mut cfg = GatewayConfig::default();
    cfg.apply_overrides(env(&[("OTEL_SERVICE_NAME", "  ")]));
    assert_eq!(cfg.metrics.otlp.service_name, "security-service");
}

#[test]
fn missing_file_falls_back_to_defaults_with_overrides() {
    let cfg = config::load(
        "/nonexistent/secsvc-test.yaml",
        env(&[("OTEL_SERVICE_NAME", "from-env")]),
    )
    .expect("defaults must validate");

    assert_eq!(cfg.gateway.listen, "0.0.0.0:8000");
    assert_eq!(cfg.metrics.otlp.service_name, "from-env");
}

#[test]
fn overrides_are_validated() {
    let err = config::load("/nonexistent/secsvc-test.yaml", env(&[("SECSVC_LISTEN", "nowhere")]))
        .expect_err("bad listen override must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}
