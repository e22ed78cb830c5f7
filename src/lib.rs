//! # edgetrace
//!
//! Device trace store for edge gateways.
//!
//! Gateways submit batches of telemetry records ("traces"). Each record gets
//! a time-ordered 128-bit id, is written to a search backend in one bulk
//! request, and can later be listed with filters and cursor pagination.
//!
//! ## Quick Start
//!
//! ```ignore
//! use edgetrace::prelude::*;
//!
//! let service = TraceService::builder().memory().build()?;
//! let ctx = service.context("req-1", "acct-1");
//!
//! let records = parse_batch(r#"[{"timestamp":"2023-01-01T00:00:00Z","type":"boot","trace":{}}]"#)?;
//! service.ingest(&ctx, "device-1", "acct-1", &records)?;
//!
//! let parsed = service
//!     .query_builder()
//!     .account("acct-1")
//!     .params([("order", "asc"), ("include", "total_count")])?
//!     .build()?;
//! let page = service.search(&ctx, &parsed)?;
//! ```
//!
//! ## Layers
//!
//! - [`edgetrace_core`]: ids, record model, queries, call context
//! - [`edgetrace_search`]: query translation and the backend seam
//! - [`edgetrace_engine`]: [`TraceStore`] and page assembly
//! - this crate: [`TraceService`], configuration, ingestion records

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod ingest;
mod service;

pub mod prelude;

pub use config::{ConfigError, ServiceConfig};
pub use error::{Error, Result};
pub use ingest::{parse_batch, IngestRecord};
pub use service::{TraceService, TraceServiceBuilder, MEMORY_INDEX};

pub use edgetrace_core::{
    CallContext, CancelHandle, NodeId, NodeIdentity, ParsedQuery, QueryError, SortOrder,
    StoreError, TemporalId, TemporalIdGenerator, Trace, TracePage, TraceQuery, TraceQueryBuilder,
    TraceResponse,
};
pub use edgetrace_engine::TraceStore;
pub use edgetrace_search::{ElasticBackend, MemoryBackend, SearchBackend};

pub use edgetrace_core;
pub use edgetrace_engine;
pub use edgetrace_search;
