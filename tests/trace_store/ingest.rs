//! Ingestion Tests
//!
//! - Scenario: one record in, one record out with a total count
//! - Round trip of every caller-supplied field
//! - Id assignment order
//! - Validation failures never reach the backend

use crate::*;

#[test]
fn test_single_record_scenario() {
    let (_backend, service) = memory_service();
    let ctx = service.context("req-1", "a1");
    let records = parse_batch(r#"[{"timestamp":"2023-01-01T00:00:00Z","type":"x","trace":{"a":1}}]"#)
        .unwrap();
    service.ingest(&ctx, "d1", "a1", &records).unwrap();

    let page = search(
        &service,
        service.query_builder().account("a1").include_total_count(true),
    );
    assert_eq!(page.total_count, Some(1));
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].device_id, "d1");
    assert!(!page.has_more);
}

#[test]
fn test_round_trip_preserves_fields() {
    let (_backend, service) = memory_service();
    let document = json!({
        "nested": {"list": [1, 2.5, "three", null, true]},
        "unicode": "dévice ✓",
        "empty": {},
    });
    let ctx = service.context("req-1", "a1");
    let ids = service
        .ingest(
            &ctx,
            "gw-0001",
            "a1",
            &[IngestRecord::new("2023-06-15T12:30:45.123Z", "boot", document.clone())],
        )
        .unwrap();

    let page = search(&service, service.query_builder().account("a1"));
    let entry = &page.data[0];
    assert_eq!(entry.id, ids[0].to_string());
    assert_eq!(entry.device_id, "gw-0001");
    assert_eq!(entry.account_id, "a1");
    assert_eq!(entry.trace_type, "boot");
    assert_eq!(entry.trace, document);
    assert_eq!(entry.object, "device-trace");
    assert_eq!(entry.timestamp, "2023-06-15T12:30:45.123Z");
    assert_eq!(entry.etag, entry.created_at);
}

#[test]
fn test_created_at_comes_from_id() {
    let (_backend, service) = memory_service();
    let ids = ingest_n(&service, "d1", "a1", 1);
    let page = search(&service, service.query_builder().account("a1"));

    let expected = edgetrace::edgetrace_core::time::display_millis(ids[0].millis() as i64).unwrap();
    assert_eq!(page.data[0].created_at, expected);
}

#[test]
fn test_ids_increase_within_batch() {
    let (_backend, service) = memory_service();
    let ids = ingest_n(&service, "d1", "a1", 50);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(ids.windows(2).all(|w| w[0].to_string() < w[1].to_string()));
}

#[test]
fn test_stored_document_shape() {
    let (backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 1);

    let ctx = CallContext::background();
    let request = edgetrace::edgetrace_search::SearchRequest::new(
        Default::default(),
        SortOrder::Asc,
        10,
    );
    let response = backend.search(&ctx, SEARCH_ALIAS, &request).unwrap();
    let doc = &response.hits[0].source;
    for field in [
        "account_id", "device_id", "id", "timestamp", "timestring", "trace", "type",
        "@timestamp", "created_at",
    ] {
        assert!(doc.get(field).is_some(), "missing {field}");
    }
    assert_eq!(doc["timestamp"], 1_672_531_200_000i64);
    assert_eq!(doc["timestring"], "2023-01-01T00:00:00.000Z");
}

#[test]
fn test_invalid_records_never_reach_backend() {
    let (backend, service) = memory_service();
    let ctx = service.context("req-1", "a1");

    let err = service.ingest(&ctx, "", "a1", &[record(0, "x", json!({}))]).unwrap_err();
    assert!(err.is_validation());

    let records = vec![
        record(0, "x", json!({})),
        IngestRecord::new("1969-12-31T23:59:59Z", "x", json!({})),
    ];
    let err = service.ingest(&ctx, "d1", "a1", &records).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidRequest(edgetrace::QueryError::InvalidTimestamp { index: 1, .. })
    ));

    assert_eq!(backend.bulk_calls(), 0);
    assert_eq!(backend.document_count(SEARCH_ALIAS), 0);
}

#[test]
fn test_empty_batch_makes_no_call() {
    let (backend, service) = memory_service();
    let ctx = service.context("req-1", "a1");
    let records = parse_batch("[]").unwrap();
    assert!(service.ingest(&ctx, "d1", "a1", &records).unwrap().is_empty());
    assert_eq!(backend.bulk_calls(), 0);
}

#[test]
fn test_writes_go_to_active_index_reads_span_aliases() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_alias(ACTIVE_ALIAS, ["trace-000002"])
            .with_alias(SEARCH_ALIAS, ["trace-000001", "trace-000002"]),
    );
    let service = service_over(backend.clone());

    let old = TemporalIdGenerator::with_clock(NODE, 1, Arc::new(edgetrace::edgetrace_core::SystemClock))
        .unwrap();
    let trace = Trace::new(old.next_id(), "d1", "a1", 0, "x", json!({}));
    let stored = edgetrace::edgetrace_core::StoredTrace::derive(&trace).unwrap();
    backend.insert_raw("trace-000001", serde_json::to_value(stored).unwrap());

    ingest_n(&service, "d1", "a1", 2);

    assert_eq!(backend.document_count("trace-000001"), 1);
    assert_eq!(backend.document_count("trace-000002"), 2);

    let page = search(&service, service.query_builder().account("a1").include_total_count(true));
    assert_eq!(page.total_count, Some(3));
    assert_eq!(page.data.len(), 3);
}
