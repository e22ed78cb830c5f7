//! In-process search backend
//!
//! Holds documents per physical index in a [`DashMap`]. Aliases map a
//! logical name onto one or more indices: reads fan out over all of them,
//! writes go to the first. A name that is not an alias is its own index.
//!
//! Rejection rules make individual bulk items fail, which lets callers
//! exercise partial-failure paths without a real cluster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use edgetrace_core::{CallContext, SortOrder};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::backend::{
    BackendError, BulkItem, BulkResponse, RawHit, SearchBackend, SearchRequest, SearchResponse,
    WriteIntent, SORT_FIELD,
};

#[derive(Debug, Clone)]
struct RejectRule {
    field: String,
    value: Value,
    reason: String,
}

/// In-memory [`SearchBackend`]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: DashMap<String, Vec<Value>>,
    aliases: HashMap<String, Vec<String>>,
    reject: RwLock<Vec<RejectRule>>,
    bulk_calls: AtomicU64,
    search_calls: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend with no aliases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `alias` at `indices`. The first index receives writes.
    pub fn with_alias<I, S>(mut self, alias: impl Into<String>, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let indices: Vec<String> = indices.into_iter().map(Into::into).collect();
        for index in &indices {
            self.indices.entry(index.clone()).or_default();
        }
        self.aliases.insert(alias.into(), indices);
        self
    }

    /// Reject every bulk item whose `field` equals `value`.
    pub fn reject_when(&self, field: impl Into<String>, value: Value, reason: impl Into<String>) {
        self.reject.write().push(RejectRule {
            field: field.into(),
            value,
            reason: reason.into(),
        });
    }

    /// Drop every rejection rule.
    pub fn clear_rejections(&self) {
        self.reject.write().clear();
    }

    /// Store `document` in `index` directly, bypassing rejection rules.
    pub fn insert_raw(&self, index: &str, document: Value) {
        self.indices.entry(index.to_string()).or_default().push(document);
    }

    /// Number of documents readable through `target`.
    pub fn document_count(&self, target: &str) -> usize {
        self.read_indices(target)
            .iter()
            .filter_map(|index| self.indices.get(index).map(|docs| docs.len()))
            .sum()
    }

    /// Bulk requests served so far
    pub fn bulk_calls(&self) -> u64 {
        self.bulk_calls.load(Ordering::Relaxed)
    }

    /// Search requests served so far
    pub fn search_calls(&self) -> u64 {
        self.search_calls.load(Ordering::Relaxed)
    }

    fn read_indices(&self, target: &str) -> Vec<String> {
        self.aliases
            .get(target)
            .cloned()
            .unwrap_or_else(|| vec![target.to_string()])
    }

    fn write_index(&self, target: &str) -> String {
        self.aliases
            .get(target)
            .and_then(|indices| indices.first().cloned())
            .unwrap_or_else(|| target.to_string())
    }

    fn rejection(&self, document: &Value) -> Option<String> {
        self.reject
            .read()
            .iter()
            .find(|rule| document.get(&rule.field) == Some(&rule.value))
            .map(|rule| rule.reason.clone())
    }
}

fn sort_key(document: &Value) -> &str {
    document.get(SORT_FIELD).and_then(Value::as_str).unwrap_or_default()
}

fn past_cursor(key: &str, cursor: &str, order: SortOrder) -> bool {
    match order {
        SortOrder::Asc => key > cursor,
        SortOrder::Desc => key < cursor,
    }
}

impl SearchBackend for MemoryBackend {
    fn bulk_write(
        &self,
        ctx: &CallContext,
        target: &str,
        intents: &[WriteIntent],
    ) -> Result<BulkResponse, BackendError> {
        ctx.check()?;
        self.bulk_calls.fetch_add(1, Ordering::Relaxed);

        let index = self.write_index(target);
        let mut items = Vec::with_capacity(intents.len());
        let mut accepted = Vec::with_capacity(intents.len());

        for (position, intent) in intents.iter().enumerate() {
            match self.rejection(&intent.document) {
                Some(reason) => items.push(BulkItem {
                    position,
                    status: 400,
                    reason: Some(reason),
                }),
                None => {
                    accepted.push(intent.document.clone());
                    items.push(BulkItem {
                        position,
                        status: 201,
                        reason: None,
                    });
                }
            }
        }

        debug!(
            target: "edgetrace::memory",
            index = %index,
            accepted = accepted.len(),
            rejected = intents.len() - accepted.len(),
            "bulk write"
        );
        self.indices.entry(index).or_default().extend(accepted);

        Ok(BulkResponse { items })
    }

    fn search(
        &self,
        ctx: &CallContext,
        target: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        ctx.check()?;
        self.search_calls.fetch_add(1, Ordering::Relaxed);

        let mut matched: Vec<RawHit> = Vec::new();
        for index in self.read_indices(target) {
            if let Some(docs) = self.indices.get(&index) {
                matched.extend(
                    docs.iter()
                        .filter(|doc| request.filter.matches(doc))
                        .map(|doc| RawHit {
                            index: index.clone(),
                            source: doc.clone(),
                        }),
                );
            }
        }

        let total = request.track_total_hits.then_some(matched.len() as u64);

        matched.sort_by(|a, b| {
            let ord = sort_key(&a.source).cmp(sort_key(&b.source));
            match request.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let hits: Vec<RawHit> = matched
            .into_iter()
            .filter(|hit| match &request.search_after {
                Some(cursor) => past_cursor(sort_key(&hit.source), cursor, request.order),
                None => true,
            })
            .take(request.size)
            .collect();

        Ok(SearchResponse { total, hits })
    }
}
