//! Trace record model
//!
//! - [`Trace`]: a record as handed to the store by the ingestion path
//! - [`StoredTrace`]: the persisted document, with derived display fields
//! - [`TraceResponse`]: one entry of a search page
//! - [`TracePage`]: a page of search results
//!
//! The `trace` document is an arbitrary JSON value and round-trips unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::TemporalId;
use crate::query::{SortOrder, TraceQuery};
use crate::time::display_millis;

/// Field names of the persisted document
pub mod fields {
    /// Trace id
    pub const ID: &str = "id";
    /// Device id
    pub const DEVICE_ID: &str = "device_id";
    /// Account id
    pub const ACCOUNT_ID: &str = "account_id";
    /// Trace type label
    pub const TYPE: &str = "type";
    /// Client timestamp (integer milliseconds)
    pub const TIMESTAMP: &str = "timestamp";
}

/// `object` value of a search page
pub const LIST_OBJECT: &str = "list";

/// `object` value of a page entry
pub const TRACE_OBJECT: &str = "device-trace";

/// One telemetry record submitted on behalf of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Temporal id assigned at ingestion
    pub id: TemporalId,
    /// Device the record belongs to
    pub device_id: String,
    /// Owning account
    pub account_id: String,
    /// Client-supplied time, milliseconds since the epoch
    pub timestamp: i64,
    /// Generation time embedded in `id`
    pub cloud_timestamp: i64,
    /// Free-form type label
    #[serde(rename = "type")]
    pub trace_type: String,
    /// Opaque application document
    pub trace: Value,
}

impl Trace {
    /// Create a record; `cloud_timestamp` is taken from the id.
    pub fn new(
        id: TemporalId,
        device_id: impl Into<String>,
        account_id: impl Into<String>,
        timestamp: i64,
        trace_type: impl Into<String>,
        trace: Value,
    ) -> Self {
        Self {
            id,
            device_id: device_id.into(),
            account_id: account_id.into(),
            timestamp,
            cloud_timestamp: id.millis() as i64,
            trace_type: trace_type.into(),
            trace,
        }
    }
}

/// Document persisted by the backend for each trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrace {
    /// Owning account
    pub account_id: String,
    /// Device the record belongs to
    pub device_id: String,
    /// Temporal id, hex form
    pub id: String,
    /// Client time, milliseconds since the epoch
    pub timestamp: i64,
    /// Display form of `timestamp`
    pub timestring: String,
    /// Opaque application document
    pub trace: Value,
    /// Free-form type label
    #[serde(rename = "type")]
    pub trace_type: String,
    /// Generation time, milliseconds since the epoch
    #[serde(rename = "@timestamp")]
    pub cloud_timestamp: i64,
    /// Display form of `cloud_timestamp`
    pub created_at: String,
}

impl StoredTrace {
    /// Derive the persisted document from a record.
    ///
    /// Returns `None` if either timestamp has no display form.
    pub fn derive(trace: &Trace) -> Option<Self> {
        Some(Self {
            account_id: trace.account_id.clone(),
            device_id: trace.device_id.clone(),
            id: trace.id.to_string(),
            timestamp: trace.timestamp,
            timestring: display_millis(trace.timestamp)?,
            trace: trace.trace.clone(),
            trace_type: trace.trace_type.clone(),
            cloud_timestamp: trace.cloud_timestamp,
            created_at: display_millis(trace.cloud_timestamp)?,
        })
    }
}

/// One entry of a [`TracePage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResponse {
    /// Owning account
    pub account_id: String,
    /// Device the record belongs to
    pub device_id: String,
    /// Temporal id, hex form
    pub id: String,
    /// Always `"device-trace"`
    pub object: String,
    /// Display form of the generation time
    pub created_at: String,
    /// Same as `created_at`
    pub etag: String,
    /// Display form of the client time
    pub timestamp: String,
    /// Opaque application document
    pub trace: Value,
    /// Free-form type label
    #[serde(rename = "type")]
    pub trace_type: String,
}

/// A page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePage {
    /// Always `"list"`
    pub object: String,
    /// Requested page size
    pub limit: u64,
    /// Cursor the page was requested with
    pub after: Option<String>,
    /// Sort direction
    pub order: SortOrder,
    /// More hits exist past this page
    pub has_more: bool,
    /// Page entries
    pub data: Vec<TraceResponse>,
    /// Exact match count, present only when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl TracePage {
    /// Empty page echoing the query's limit, order and cursor.
    pub fn empty(query: &TraceQuery, include_total_count: bool) -> Self {
        Self {
            object: LIST_OBJECT.to_string(),
            limit: query.limit,
            after: query.cursor.clone(),
            order: query.order,
            has_more: false,
            data: Vec::new(),
            total_count: include_total_count.then_some(0),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the page has no entries
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Id of the last entry, the cursor for the next page
    pub fn last_id(&self) -> Option<&str> {
        self.data.last().map(|t| t.id.as_str())
    }

    /// Check if the page is ascending
    pub fn is_ascending(&self) -> bool {
        self.order == SortOrder::Asc
    }
}
