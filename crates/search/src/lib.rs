//! Search layer for the edge trace store
//!
//! This crate provides:
//! - [`translate`]: maps a [`TraceQuery`](edgetrace_core::TraceQuery) onto a
//!   backend-neutral [`BackendFilter`]
//! - [`SearchBackend`]: the `{bulk_write, search}` capability the store runs on
//! - [`MemoryBackend`]: in-process backend with indices and aliases
//! - [`ElasticBackend`]: HTTP backend for a search cluster

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod elastic;
pub mod filter;
pub mod memory;

pub use backend::{
    BackendError, BulkItem, BulkResponse, RawHit, SearchBackend, SearchRequest, SearchResponse,
    WriteIntent, SORT_FIELD,
};
pub use elastic::ElasticBackend;
pub use filter::{translate, BackendFilter, FilterTerm};
pub use memory::MemoryBackend;
