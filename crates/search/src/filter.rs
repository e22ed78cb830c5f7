//! Query translation
//!
//! [`translate`] turns a [`TraceQuery`] into a [`BackendFilter`]: the AND of
//! one term per populated field.
//!
//! | Query field | Term |
//! |-------------|------|
//! | `devices` (non-empty) | `Terms` on `device_id` (any of) |
//! | `account` | `Term` on `account_id` |
//! | `trace_type` | `Match` on `type` |
//! | `after` / `before` | one `Range` on `timestamp`, open on absent sides |
//! | `id` | `Term` on `id` |
//!
//! Absent time bounds emit nothing. The translator does not check that
//! `after <= before`; an inverted range simply matches nothing.

use edgetrace_core::{fields, TraceQuery};
use serde_json::{json, Map, Value};

/// One filter clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTerm {
    /// Field equals any of the values
    Terms {
        /// Field name
        field: &'static str,
        /// Accepted values
        values: Vec<String>,
    },
    /// Field equals the value exactly
    Term {
        /// Field name
        field: &'static str,
        /// Required value
        value: String,
    },
    /// Field matches the value; backends without text analysis compare exactly
    Match {
        /// Field name
        field: &'static str,
        /// Required value
        value: String,
    },
    /// Integer field within inclusive bounds
    Range {
        /// Field name
        field: &'static str,
        /// Lower bound
        gte: Option<i64>,
        /// Upper bound
        lte: Option<i64>,
    },
}

impl FilterTerm {
    /// Check if `doc` satisfies this clause.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            FilterTerm::Terms { field, values } => doc
                .get(field)
                .and_then(Value::as_str)
                .map_or(false, |v| values.iter().any(|want| want == v)),
            FilterTerm::Term { field, value } | FilterTerm::Match { field, value } => {
                doc.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
            FilterTerm::Range { field, gte, lte } => match doc.get(field).and_then(Value::as_i64) {
                Some(v) => gte.map_or(true, |g| v >= g) && lte.map_or(true, |l| v <= l),
                None => false,
            },
        }
    }

    /// Query DSL form of this clause.
    pub fn to_dsl(&self) -> Value {
        match self {
            FilterTerm::Terms { field, values } => json!({ "terms": { *field: values } }),
            FilterTerm::Term { field, value } => json!({ "term": { *field: value } }),
            FilterTerm::Match { field, value } => json!({ "match": { *field: value } }),
            FilterTerm::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(g) = gte {
                    bounds.insert("gte".to_string(), json!(g));
                }
                if let Some(l) = lte {
                    bounds.insert("lte".to_string(), json!(l));
                }
                json!({ "range": { *field: bounds } })
            }
        }
    }
}

/// Conjunction of scoring (`must`) and non-scoring (`filter`) clauses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendFilter {
    /// Clauses that must match
    pub must: Vec<FilterTerm>,
    /// Clauses that must match, without scoring
    pub filter: Vec<FilterTerm>,
}

impl BackendFilter {
    /// Every clause, `must` first
    pub fn terms(&self) -> impl Iterator<Item = &FilterTerm> {
        self.must.iter().chain(self.filter.iter())
    }

    /// Check if the filter matches every document
    pub fn is_match_all(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty()
    }

    /// Check if `doc` satisfies every clause.
    pub fn matches(&self, doc: &Value) -> bool {
        self.terms().all(|term| term.matches(doc))
    }

    /// Query DSL form: a `bool` query.
    pub fn to_dsl(&self) -> Value {
        let mut clauses = Map::new();
        if !self.must.is_empty() {
            clauses.insert(
                "must".to_string(),
                Value::Array(self.must.iter().map(FilterTerm::to_dsl).collect()),
            );
        }
        if !self.filter.is_empty() {
            clauses.insert(
                "filter".to_string(),
                Value::Array(self.filter.iter().map(FilterTerm::to_dsl).collect()),
            );
        }
        json!({ "bool": clauses })
    }
}

/// Translate a query into backend criteria.
pub fn translate(query: &TraceQuery) -> BackendFilter {
    let mut filter = BackendFilter::default();

    if !query.devices.is_empty() {
        filter.must.push(FilterTerm::Terms {
            field: fields::DEVICE_ID,
            values: query.devices.clone(),
        });
    }

    if let Some(account) = &query.account {
        filter.must.push(FilterTerm::Term {
            field: fields::ACCOUNT_ID,
            value: account.clone(),
        });
    }

    if let Some(trace_type) = &query.trace_type {
        filter.must.push(FilterTerm::Match {
            field: fields::TYPE,
            value: trace_type.clone(),
        });
    }

    if query.after.is_some() || query.before.is_some() {
        filter.filter.push(FilterTerm::Range {
            field: fields::TIMESTAMP,
            gte: query.after,
            lte: query.before,
        });
    }

    if let Some(id) = &query.id {
        filter.must.push(FilterTerm::Term {
            field: fields::ID,
            value: id.clone(),
        });
    }

    filter
}
