//! TraceStore integration suite
//!
//! Drives the service end to end over the in-memory backend:
//! - Ingestion and round trip
//! - Filtered search
//! - Cursor pagination
//! - Failure kinds and their side effects
//! - Concurrency and call contexts
//! - Configuration files

use std::sync::Arc;

pub use edgetrace::prelude::*;
pub use edgetrace::{
    MemoryBackend, SearchBackend, StoreError, TemporalIdGenerator, Trace, TraceStore,
    MEMORY_INDEX,
};

mod config;
mod failures;
mod ingest;
mod pagination;
mod search;

pub const NODE: NodeId = NodeId::from_bytes([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
pub const SEARCH_ALIAS: &str = "trace-search";
pub const ACTIVE_ALIAS: &str = "trace-active";

/// Memory backend with both aliases on one index, plus a service over it.
pub fn memory_service() -> (Arc<MemoryBackend>, TraceService) {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_alias(SEARCH_ALIAS, [MEMORY_INDEX])
            .with_alias(ACTIVE_ALIAS, [MEMORY_INDEX]),
    );
    let service = service_over(backend.clone());
    (backend, service)
}

pub fn service_over(backend: Arc<dyn SearchBackend>) -> TraceService {
    TraceService::builder()
        .backend(backend)
        .aliases(SEARCH_ALIAS, ACTIVE_ALIAS)
        .node_id(NODE)
        .build()
        .unwrap()
}

pub fn record(second: u32, trace_type: &str, trace: serde_json::Value) -> IngestRecord {
    IngestRecord::new(
        format!("2023-01-01T00:{:02}:{:02}Z", second / 60, second % 60),
        trace_type,
        trace,
    )
}

/// Ingest `n` records for one device, one second apart.
pub fn ingest_n(service: &TraceService, device: &str, account: &str, n: u32) -> Vec<TemporalId> {
    let records: Vec<IngestRecord> = (0..n).map(|i| record(i, "x", json!({ "n": i }))).collect();
    let ctx = service.context("req-ingest", account);
    service.ingest(&ctx, device, account, &records).unwrap()
}

pub fn search(service: &TraceService, builder: edgetrace::TraceQueryBuilder) -> TracePage {
    let parsed = builder.build().unwrap();
    let ctx = service.context("req-search", "test");
    service.search(&ctx, &parsed).unwrap()
}

pub fn ids_of(page: &TracePage) -> Vec<String> {
    page.data.iter().map(|t| t.id.clone()).collect()
}
