//! Ingestion records.
//!
//! Devices submit a JSON array of records:
//!
//! ```json
//! [{"timestamp": "2023-01-01T00:00:00Z", "type": "boot", "trace": {"stage": 1}}]
//! ```
//!
//! Unknown fields are rejected. Device and account ids come from the calling
//! layer, not from the body.

use edgetrace_core::time::{is_supported, parse_rfc3339_millis};
use edgetrace_core::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One submitted record, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestRecord {
    /// Client time, RFC 3339
    #[serde(default)]
    pub timestamp: String,
    /// Opaque application document
    #[serde(default)]
    pub trace: Value,
    /// Free-form type label
    #[serde(default, rename = "type")]
    pub trace_type: String,
}

impl IngestRecord {
    /// Create a record.
    pub fn new(timestamp: impl Into<String>, trace_type: impl Into<String>, trace: Value) -> Self {
        Self {
            timestamp: timestamp.into(),
            trace,
            trace_type: trace_type.into(),
        }
    }

    /// Client time in milliseconds, checked against the supported range.
    ///
    /// `index` is the record's position in its batch, used in the error.
    pub fn timestamp_millis(&self, index: usize) -> Result<i64, QueryError> {
        let millis = parse_rfc3339_millis(&self.timestamp).map_err(|e| {
            QueryError::InvalidTimestamp {
                index,
                reason: format!("cannot parse '{}' as RFC 3339: {e}", self.timestamp),
            }
        })?;
        if !is_supported(millis) {
            return Err(QueryError::InvalidTimestamp {
                index,
                reason: format!("'{}' is outside the supported range", self.timestamp),
            });
        }
        Ok(millis)
    }
}

/// Decode a JSON array of records.
pub fn parse_batch(body: &str) -> Result<Vec<IngestRecord>, serde_json::Error> {
    serde_json::from_str(body)
}
