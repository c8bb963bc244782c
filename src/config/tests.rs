// src/config/tests.rs

use std::time::Duration;

use super::*;
use crate::resilience::RetryOn;

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert!(settings.probes.is_empty());
    assert_eq!(settings.gate.open_circuit_delay, Duration::from_secs(5));
    assert_eq!(settings.gate.retry_exhausted_delay, Duration::from_secs(2));
    assert_eq!(settings.gate.probe_timeout, Some(Duration::from_secs(10)));
    assert_eq!(settings.gate.pipeline.retry.retry_on, RetryOn::AnyFailure);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_empty_document_uses_defaults() {
    let settings = Settings::from_json_str("{}").unwrap();

    assert!(settings.probes.is_empty());
    assert_eq!(settings.gate.pipeline.timeout, None);
    assert_eq!(
        settings.gate.pipeline.circuit_breaker.sampling_duration,
        Duration::from_secs(10)
    );
}

#[test]
fn test_full_document() {
    let raw = r#"{
        "gate": {
            "open_circuit_delay": 1500,
            "retry_exhausted_delay": 250,
            "probe_timeout": null,
            "pipeline": {
                "retry": { "max_attempts": 2, "backoff": [100, 200], "retry_on": "transient" },
                "circuit_breaker": { "name": "deps", "minimum_throughput": 3 }
            }
        },
        "probes": [
            { "kind": "tcp", "name": "db", "address": "localhost:5432" },
            { "kind": "http", "name": "api", "url": "http://localhost:8080/health", "timeout": 750 },
            { "kind": "redis", "name": "cache", "url": "redis://127.0.0.1:6379" }
        ]
    }"#;

    let settings = Settings::from_json_str(raw).unwrap();
    let gate = &settings.gate;

    assert_eq!(gate.open_circuit_delay, Duration::from_millis(1500));
    assert_eq!(gate.retry_exhausted_delay, Duration::from_millis(250));
    assert_eq!(gate.probe_timeout, None);
    assert_eq!(gate.pipeline.retry.max_attempts, 2);
    assert_eq!(
        gate.pipeline.retry.backoff.delays(),
        &[Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert_eq!(gate.pipeline.retry.retry_on, RetryOn::Transient);
    assert_eq!(gate.pipeline.circuit_breaker.name, "deps");
    assert_eq!(gate.pipeline.circuit_breaker.minimum_throughput, 3);
    assert_eq!(gate.pipeline.circuit_breaker.failure_ratio, 1.0);

    let names: Vec<&str> = settings.probes.iter().map(ProbeConfig::name).collect();
    assert_eq!(names, vec!["db", "api", "cache"]);
    assert_eq!(settings.probes[0].kind(), "tcp");
    assert_eq!(settings.probes[0].target(), "localhost:5432");
    assert_eq!(
        settings.probes[1],
        ProbeConfig::Http {
            name: "api".to_string(),
            url: "http://localhost:8080/health".to_string(),
            timeout: Duration::from_millis(750),
        }
    );
    // probe timeout falls back to 5s
    assert!(matches!(
        settings.probes[2],
        ProbeConfig::Redis { timeout, .. } if timeout == Duration::from_secs(5)
    ));
}

#[test]
fn test_malformed_document() {
    let err = Settings::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, GateError::Serialization(_)));

    let err = Settings::from_json_str(r#"{"probes": [{"kind": "amqp", "name": "bus"}]}"#)
        .unwrap_err();
    assert!(matches!(err, GateError::Serialization(_)));
}

#[test]
fn test_duplicate_probe_names_rejected() {
    let raw = r#"{"probes": [
        { "kind": "tcp", "name": "db", "address": "a:1" },
        { "kind": "tcp", "name": "db", "address": "b:2" }
    ]}"#;

    let err = Settings::from_json_str(raw).unwrap_err();
    assert!(matches!(err, GateError::Config(msg) if msg.contains("duplicate")));
}

#[test]
fn test_empty_probe_name_rejected() {
    let raw = r#"{"probes": [{ "kind": "tcp", "name": "", "address": "a:1" }]}"#;
    assert!(matches!(Settings::from_json_str(raw), Err(GateError::Config(_))));
}

#[test]
fn test_invalid_breaker_values_rejected() {
    let mut settings = Settings::default();
    settings.gate.pipeline.circuit_breaker.failure_ratio = 0.0;
    assert!(matches!(settings.validate(), Err(GateError::Config(_))));

    let mut settings = Settings::default();
    settings.gate.pipeline.circuit_breaker.failure_ratio = 1.5;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.gate.pipeline.circuit_breaker.minimum_throughput = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.gate.pipeline.circuit_breaker.break_duration = Duration::ZERO;
    assert!(settings.validate().is_err());
}

#[test]
fn test_zero_timeouts_rejected() {
    let mut settings = Settings::default();
    settings.gate.probe_timeout = Some(Duration::ZERO);
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.gate.pipeline.timeout = Some(Duration::ZERO);
    assert!(settings.validate().is_err());
}

#[test]
fn test_parse_named_and_bare_entries() {
    let probes = parse_probe_list("tcp", "db=localhost:5432, cache:6379 ,").unwrap();

    assert_eq!(probes.len(), 2);
    assert_eq!(probes[0].name(), "db");
    assert_eq!(probes[0].target(), "localhost:5432");
    assert_eq!(probes[1].name(), "cache:6379");
    assert_eq!(probes[1].target(), "cache:6379");
}

#[test]
fn test_parse_url_with_query() {
    let probes = parse_probe_list("http", "http://svc/health?verbose=1").unwrap();
    assert_eq!(probes[0].name(), "http://svc/health?verbose=1");
    assert_eq!(probes[0].target(), "http://svc/health?verbose=1");

    let probes = parse_probe_list("http", "svc=http://svc/health?verbose=1").unwrap();
    assert_eq!(probes[0].name(), "svc");
    assert_eq!(probes[0].target(), "http://svc/health?verbose=1");
}

#[test]
fn test_parse_unknown_kind() {
    assert!(matches!(
        parse_probe_list("amqp", "bus=amqp://localhost"),
        Err(GateError::Config(_))
    ));
}

#[test]
fn test_build_probes_keeps_order() {
    let settings = Settings {
        probes: vec![
            ProbeConfig::Redis {
                name: "cache".to_string(),
                url: "redis://127.0.0.1:6379".to_string(),
                timeout: Duration::from_secs(1),
            },
            ProbeConfig::Tcp {
                name: "db".to_string(),
                address: "127.0.0.1:5432".to_string(),
                timeout: Duration::from_secs(1),
            },
        ],
        ..Settings::default()
    };

    let probes = settings.build_probes().unwrap();
    let names: Vec<&str> = probes.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["cache", "db"]);
}

#[test]
fn test_invalid_redis_url_fails_to_build() {
    let probe = ProbeConfig::Redis {
        name: "cache".to_string(),
        url: "not a url".to_string(),
        timeout: Duration::from_secs(1),
    };
    assert!(matches!(probe.build(), Err(GateError::Config(_))));
}

#[test]
fn test_load_from_env_lists() {
    // only test touching these variables
    env::remove_var(CONFIG_PATH_ENV);
    env::set_var(TCP_PROBES_ENV, "db=127.0.0.1:5432");
    env::set_var(HTTP_PROBES_ENV, "api=http://127.0.0.1:8080/ready");

    let settings = Settings::load();

    env::remove_var(TCP_PROBES_ENV);
    env::remove_var(HTTP_PROBES_ENV);

    let settings = settings.unwrap();
    let names: Vec<&str> = settings.probes.iter().map(ProbeConfig::name).collect();
    assert_eq!(names, vec!["db", "api"]);
}

#[test]
fn test_load_from_missing_file() {
    let err = Settings::from_file(Path::new("/nonexistent/readiness_gate.json")).unwrap_err();
    assert!(matches!(err, GateError::Config(msg) if msg.contains("cannot read")));
}
