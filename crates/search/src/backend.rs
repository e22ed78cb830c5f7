//! Search backend capability
//!
//! The store needs exactly two operations from its backend: a batched write
//! and a filtered, sorted, seek-paginated search. Both take the caller's
//! [`CallContext`] and must give up once it is cancelled or past its
//! deadline. Neither retries.
//!
//! Targets are logical names (aliases). A backend may resolve one alias to
//! several physical indices for reads.

use edgetrace_core::{CallContext, Interrupted, SortOrder};
use serde_json::Value;
use thiserror::Error;

use crate::filter::BackendFilter;

/// Field every search sorts on
pub const SORT_FIELD: &str = "id";

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection or I/O failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with an error status
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Backend answered with something we cannot read
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// Request could not be encoded
    #[error("could not encode request: {0}")]
    Encode(String),

    /// The call context stopped the request
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// One document to index
#[derive(Debug, Clone, PartialEq)]
pub struct WriteIntent {
    /// Document body
    pub document: Value,
}

impl WriteIntent {
    /// Index `document` under a backend-assigned key.
    pub fn index(document: Value) -> Self {
        Self { document }
    }
}

/// Outcome of one bulk item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// Position of the intent in the request
    pub position: usize,
    /// Item status code
    pub status: u16,
    /// Rejection reason, if rejected
    pub reason: Option<String>,
}

impl BulkItem {
    /// Check if the item was rejected
    pub fn is_failed(&self) -> bool {
        self.reason.is_some() || self.status >= 300
    }
}

/// Result of a bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Per-item outcomes, in request order
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Rejected items
    pub fn failed(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|item| item.is_failed())
    }

    /// Check if any item was rejected
    pub fn has_errors(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// A sorted, size-bounded search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Documents must match every term
    pub filter: BackendFilter,
    /// Direction of the sort on [`SORT_FIELD`]
    pub order: SortOrder,
    /// Maximum hits to return
    pub size: usize,
    /// Return only hits sorting strictly after this sort value
    pub search_after: Option<String>,
    /// Count every match exactly
    pub track_total_hits: bool,
}

impl SearchRequest {
    /// Create a request with no cursor and no exact count.
    pub fn new(filter: BackendFilter, order: SortOrder, size: usize) -> Self {
        Self {
            filter,
            order,
            size,
            search_after: None,
            track_total_hits: false,
        }
    }

    /// Resume strictly past `cursor`.
    pub fn search_after(mut self, cursor: Option<String>) -> Self {
        self.search_after = cursor;
        self
    }

    /// Ask for an exact match count.
    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = track;
        self
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    /// Physical index the hit came from
    pub index: String,
    /// Stored document
    pub source: Value,
}

/// Result of a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Match count; exact only when requested
    pub total: Option<u64>,
    /// Hits in sort order
    pub hits: Vec<RawHit>,
}

/// The operations a trace store needs from its backend
pub trait SearchBackend: Send + Sync {
    /// Index every intent into `target` in one request.
    ///
    /// Item-level rejections are reported in the response, not as `Err`.
    fn bulk_write(
        &self,
        ctx: &CallContext,
        target: &str,
        intents: &[WriteIntent],
    ) -> Result<BulkResponse, BackendError>;

    /// Run `request` against `target`.
    fn search(
        &self,
        ctx: &CallContext,
        target: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, BackendError>;
}
