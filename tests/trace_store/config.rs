//! Configuration Tests
//!
//! Service construction from TOML files on disk.

use crate::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_service_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("edgetrace.toml");
    fs::write(
        &path,
        r#"
        [backend]
        kind = "memory"
        timeout_ms = 5000

        [identity]
        node_id = "02-42-ac-11-00-02"
        instance_id = 7

        [limits]
        default_limit = 3
        "#,
    )
    .unwrap();

    let config = ServiceConfig::load(&path).unwrap();
    assert_eq!(config.backend.timeout(), Duration::from_secs(5));

    let service = TraceService::from_config(&config).unwrap();
    assert_eq!(service.id_generator().node(), NODE);
    assert_eq!(service.id_generator().instance(), 7);

    let ids = ingest_n(&service, "d1", "a1", 5);
    assert!(ids.iter().all(|id| id.instance() == 7));

    let page = search(&service, service.query_builder().account("a1"));
    assert_eq!(page.limit, 3);
    assert_eq!(page.data.len(), 3);
    assert!(page.has_more);

    let ctx = service.context("req-1", "a1");
    let remaining = ctx.remaining().unwrap();
    assert!(remaining <= Duration::from_secs(5));
}

#[test]
fn test_invalid_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("edgetrace.toml");
    fs::write(&path, "[backend]\nkind = \"elastic\"\n").unwrap();

    let err = ServiceConfig::load(&path).unwrap_err();
    assert!(matches!(err, edgetrace::ConfigError::Invalid(_)));
}

#[test]
fn test_config_error_converts() {
    let err: Error = ServiceConfig::from_toml_str("[identity]\ninstance_id = 99")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Config(_)));
}
