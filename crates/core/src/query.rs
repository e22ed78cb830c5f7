//! Trace query model and request validation
//!
//! [`TraceQuery`] holds the search criteria consumed by the store. The
//! store assumes it is already valid; [`TraceQueryBuilder`] is the
//! validating front door used by calling layers.
//!
//! ## Request parameters
//!
//! | Name | Meaning | Validation |
//! |------|---------|------------|
//! | `timestamp__gte` | lower time bound | RFC 3339 |
//! | `timestamp__lte` | upper time bound | RFC 3339, not before the lower bound |
//! | `type__eq` | type label | non-empty |
//! | `limit` | page size | 2..=1000 |
//! | `order` | sort direction | `asc` / `desc`, any case |
//! | `after` | cursor | 32 hex characters |
//! | `include` | `total_count` requests an exact count | non-empty |
//! | `device_id__in` | comma-separated device set, added to the builder's devices | at least one device |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::id::TemporalId;
use crate::time::parse_rfc3339_millis;

/// Smallest accepted page size
pub const MIN_LIMIT: u64 = 2;

/// Largest accepted page size
pub const MAX_LIMIT: u64 = 1000;

/// Page size when none is given
pub const DEFAULT_LIMIT: u64 = 100;

/// Sort direction over trace ids (and so over creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    #[serde(rename = "ASC")]
    Asc,
    /// Newest first
    #[default]
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// Check if ascending
    pub fn is_ascending(self) -> bool {
        self == SortOrder::Asc
    }

    /// Lowercase name used by search backends
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::field("order", "acceptable values [ASC|DESC]")),
        }
    }
}

/// Search criteria for traces
///
/// Populated fields combine with AND; `devices` matches any of its entries.
/// `None` time bounds are open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceQuery {
    /// Exact trace id
    pub id: Option<String>,
    /// Device ids, any of which may match
    pub devices: Vec<String>,
    /// Exact account id
    pub account: Option<String>,
    /// Inclusive lower bound on `timestamp`, milliseconds
    pub after: Option<i64>,
    /// Inclusive upper bound on `timestamp`, milliseconds
    pub before: Option<i64>,
    /// Exact type label
    pub trace_type: Option<String>,
    /// Page size
    pub limit: u64,
    /// Sort direction
    pub order: SortOrder,
    /// Resume strictly past this id
    pub cursor: Option<String>,
}

impl Default for TraceQuery {
    fn default() -> Self {
        Self {
            id: None,
            devices: Vec::new(),
            account: None,
            after: None,
            before: None,
            trace_type: None,
            limit: DEFAULT_LIMIT,
            order: SortOrder::Desc,
            cursor: None,
        }
    }
}

impl TraceQuery {
    /// Start a validating builder.
    pub fn builder() -> TraceQueryBuilder {
        TraceQueryBuilder::default()
    }
}

/// A validated query plus the total-count opt-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// The search criteria
    pub query: TraceQuery,
    /// Request an exact match count
    pub include_total_count: bool,
}

/// Validating builder for [`TraceQuery`]
///
/// Typed setters take values as-is; [`param`](Self::param) parses one
/// request parameter. Range checks run in [`build`](Self::build).
///
/// ```ignore
/// let parsed = TraceQuery::builder()
///     .account("a1")
///     .device("d1")
///     .params([("limit", "50"), ("order", "asc")])?
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TraceQueryBuilder {
    query: TraceQuery,
    include_total_count: bool,
}

impl TraceQueryBuilder {
    /// Restrict to one account.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.query.account = Some(account.into());
        self
    }

    /// Add one device to the device set.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.query.devices.push(device.into());
        self
    }

    /// Add several devices to the device set.
    pub fn devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.devices.extend(devices.into_iter().map(Into::into));
        self
    }

    /// Restrict to one trace id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.query.id = Some(id.into());
        self
    }

    /// Inclusive lower time bound, milliseconds.
    pub fn after(mut self, millis: i64) -> Self {
        self.query.after = Some(millis);
        self
    }

    /// Inclusive upper time bound, milliseconds.
    pub fn before(mut self, millis: i64) -> Self {
        self.query.before = Some(millis);
        self
    }

    /// Restrict to one type label.
    pub fn trace_type(mut self, trace_type: impl Into<String>) -> Self {
        self.query.trace_type = Some(trace_type.into());
        self
    }

    /// Page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = limit;
        self
    }

    /// Sort direction.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.query.order = order;
        self
    }

    /// Resume past a previously returned id.
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.query.cursor = Some(cursor.into());
        self
    }

    /// Request an exact match count.
    pub fn include_total_count(mut self, include: bool) -> Self {
        self.include_total_count = include;
        self
    }

    /// Apply one request parameter.
    ///
    /// # Errors
    ///
    /// - `UnknownParameter` for names outside the table in the module docs
    /// - `InvalidField` for unparseable or empty values
    pub fn param(mut self, name: &str, value: &str) -> Result<Self, QueryError> {
        if value.is_empty() {
            return Err(QueryError::field(name, "invalid field value ''"));
        }
        match name {
            "timestamp__gte" => {
                self.query.after = Some(parse_bound(name, value)?);
            }
            "timestamp__lte" => {
                self.query.before = Some(parse_bound(name, value)?);
            }
            "type__eq" => {
                self.query.trace_type = Some(value.to_string());
            }
            "limit" => {
                let limit = value
                    .parse::<u64>()
                    .map_err(|e| QueryError::field(name, e.to_string()))?;
                self.query.limit = limit;
            }
            "order" => {
                self.query.order = value.parse()?;
            }
            "after" => {
                self.query.cursor = Some(value.to_string());
            }
            "include" => {
                if value == "total_count" {
                    self.include_total_count = true;
                }
            }
            "device_id__in" => {
                let before = self.query.devices.len();
                self.query.devices.extend(
                    value
                        .split(',')
                        .filter(|device| !device.is_empty())
                        .map(str::to_string),
                );
                if self.query.devices.len() == before {
                    return Err(QueryError::field(name, format!("invalid field value '{value}'")));
                }
            }
            other => return Err(QueryError::UnknownParameter(other.to_string())),
        }
        Ok(self)
    }

    /// Apply request parameters in order, stopping at the first error.
    pub fn params<I, K, V>(self, params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        params
            .into_iter()
            .try_fold(self, |builder, (k, v)| builder.param(k.as_ref(), v.as_ref()))
    }

    /// Validate and finish.
    ///
    /// # Errors
    ///
    /// - `InvalidField` for `limit` outside 2..=1000, an empty type, or a
    ///   cursor that is not a 32-character hex id
    /// - `InvalidTimeRange` when the upper bound precedes the lower bound
    pub fn build(mut self) -> Result<ParsedQuery, QueryError> {
        let q = &mut self.query;
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&q.limit) {
            return Err(QueryError::field(
                "limit",
                format!("acceptable value is {}-{}", MIN_LIMIT, MAX_LIMIT),
            ));
        }
        if matches!(&q.trace_type, Some(t) if t.is_empty()) {
            return Err(QueryError::field("type__eq", "invalid field value ''"));
        }
        if let Some(cursor) = q.cursor.as_mut() {
            if cursor.parse::<TemporalId>().is_err() {
                return Err(QueryError::field("after", "invalid after cursor"));
            }
            *cursor = cursor.to_ascii_lowercase();
        }
        if let (Some(after), Some(before)) = (q.after, q.before) {
            if before < after {
                return Err(QueryError::InvalidTimeRange);
            }
        }
        Ok(ParsedQuery {
            query: self.query,
            include_total_count: self.include_total_count,
        })
    }
}

fn parse_bound(name: &str, value: &str) -> Result<i64, QueryError> {
    parse_rfc3339_millis(value)
        .map_err(|_| QueryError::field(name, "could not parse as RFC3339 format"))
}
