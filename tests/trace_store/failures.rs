//! Failure Tests
//!
//! - BatchCountMismatch: nothing sent
//! - BulkWriteFailed: accepted items stay written
//! - DecodeFailed: one bad hit fails the page
//! - QueryExecutionFailed: backend errors surface as storage failures

use crate::*;
use edgetrace::edgetrace_search::{
    BackendError, BulkResponse, SearchRequest, SearchResponse, WriteIntent,
};

fn trace(generator: &TemporalIdGenerator, timestamp: i64, trace_type: &str) -> Trace {
    Trace::new(generator.next_id(), "d1", "a1", timestamp, trace_type, json!({}))
}

fn generator() -> TemporalIdGenerator {
    TemporalIdGenerator::with_clock(NODE, 2, Arc::new(edgetrace::edgetrace_core::SystemClock))
        .unwrap()
}

#[test]
fn test_unrepresentable_record_sends_nothing() {
    let (backend, service) = memory_service();
    let ids = generator();
    let batch = vec![trace(&ids, 0, "x"), trace(&ids, i64::MAX, "x"), trace(&ids, 5, "x")];

    let err = service.store().add(&CallContext::background(), &batch).unwrap_err();
    assert_eq!(err, StoreError::BatchCountMismatch { expected: 3, built: 2 });
    assert_eq!(backend.bulk_calls(), 0);
    assert_eq!(backend.document_count(SEARCH_ALIAS), 0);
}

#[test]
fn test_rejected_item_fails_batch_but_keeps_others() {
    let (backend, service) = memory_service();
    backend.reject_when("type", json!("poison"), "mapper_parsing_exception");

    let ctx = service.context("req-1", "a1");
    let records = vec![
        record(0, "ok", json!({})),
        record(1, "poison", json!({})),
        record(2, "ok", json!({})),
    ];
    let err = service.ingest(&ctx, "d1", "a1", &records).unwrap_err();
    assert!(err.is_storage_failure());
    assert!(matches!(err, Error::Storage(StoreError::BulkWriteFailed { .. })));
    assert_eq!(backend.bulk_calls(), 1);

    let page = search(&service, service.query_builder().account("a1"));
    assert_eq!(page.data.len(), 2);
    assert!(page.data.iter().all(|t| t.trace_type == "ok"));
}

#[test]
fn test_undecodable_hit_fails_page() {
    let (backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 3);
    backend.insert_raw(MEMORY_INDEX, json!({ "account_id": "a1", "id": "f".repeat(32) }));

    let parsed = service.query_builder().account("a1").build().unwrap();
    let err = service.search(&service.context("req-1", "a1"), &parsed).unwrap_err();
    assert!(matches!(err, Error::Storage(StoreError::DecodeFailed { index: 0, .. })));
}

#[test]
fn test_undecodable_extra_hit_is_ignored() {
    let (backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 2);
    // sorts after every real id, so ascending it is the over-fetched hit
    backend.insert_raw(MEMORY_INDEX, json!({ "account_id": "a1", "id": "f".repeat(32) }));

    let page = search(
        &service,
        service.query_builder().account("a1").order(SortOrder::Asc).limit(2),
    );
    assert_eq!(page.data.len(), 2);
    assert!(page.has_more);
}

struct Broken;

impl SearchBackend for Broken {
    fn bulk_write(
        &self,
        _ctx: &CallContext,
        _target: &str,
        _intents: &[WriteIntent],
    ) -> std::result::Result<BulkResponse, BackendError> {
        Err(BackendError::Transport("connection reset by peer".into()))
    }

    fn search(
        &self,
        _ctx: &CallContext,
        _target: &str,
        _request: &SearchRequest,
    ) -> std::result::Result<SearchResponse, BackendError> {
        Err(BackendError::Status { status: 503, body: "no shards available".into() })
    }
}

#[test]
fn test_backend_errors_are_storage_failures() {
    let service = service_over(Arc::new(Broken));
    let ctx = service.context("req-1", "a1");

    let err = service.ingest(&ctx, "d1", "a1", &[record(0, "x", json!({}))]).unwrap_err();
    assert!(matches!(err, Error::Storage(StoreError::BulkWriteFailed { .. })));

    let parsed = service.query_builder().account("a1").build().unwrap();
    let err = service.search(&ctx, &parsed).unwrap_err();
    assert!(matches!(err, Error::Storage(StoreError::QueryExecutionFailed(_))));
    assert!(err.is_storage_failure());
    assert!(!err.is_validation());
}
