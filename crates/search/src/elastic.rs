//! HTTP backend for an Elasticsearch-compatible cluster
//!
//! - bulk writes: `POST {url}/{target}/_bulk`, NDJSON, one `index` action
//!   per document with a cluster-assigned `_id`
//! - searches: `POST {url}/{target}/_search` with a `bool` query, a sort on
//!   [`SORT_FIELD`] and `search_after` for seek pagination
//!
//! Each request is bounded by the smaller of the configured timeout and the
//! time left on the call context. The blocking call runs on a worker thread
//! so a cancelled context returns within [`CANCEL_POLL`] instead of waiting
//! out the socket timeout.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use edgetrace_core::{CallContext, SortOrder};
use serde_json::{json, Value};
use tracing::{debug, warn};
use ureq::{Agent, AgentBuilder};

use crate::backend::{
    BackendError, BulkItem, BulkResponse, RawHit, SearchBackend, SearchRequest, SearchResponse,
    WriteIntent, SORT_FIELD,
};

const NDJSON: &str = "application/x-ndjson";
const JSON: &str = "application/json";
const MAX_ERROR_BODY: usize = 512;

/// How often a waiting request re-checks its call context
pub const CANCEL_POLL: Duration = Duration::from_millis(20);

/// [`SearchBackend`] over HTTP
#[derive(Debug)]
pub struct ElasticBackend {
    agent: Agent,
    base_url: String,
    timeout: Duration,
}

impl ElasticBackend {
    /// Connect to the cluster at `url` and check that it answers.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let backend = Self::unchecked(url, timeout);
        backend.ping()?;
        debug!(target: "edgetrace::elastic", url = %backend.base_url, "cluster reachable");
        Ok(backend)
    }

    /// Create a client without contacting the cluster.
    pub fn unchecked(url: &str, timeout: Duration) -> Self {
        let agent = AgentBuilder::new().timeout_connect(timeout).build();
        Self {
            agent,
            base_url: url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Base URL of the cluster
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ping(&self) -> Result<(), BackendError> {
        self.agent
            .get(&self.base_url)
            .timeout(self.timeout)
            .call()
            .map_err(map_ureq_error)?;
        Ok(())
    }

    fn request_timeout(&self, ctx: &CallContext) -> Result<Duration, BackendError> {
        ctx.check()?;
        Ok(match ctx.remaining() {
            Some(left) => left.min(self.timeout),
            None => self.timeout,
        })
    }

    fn post(
        &self,
        ctx: &CallContext,
        path: &str,
        content_type: &'static str,
        body: String,
    ) -> Result<Value, BackendError> {
        let timeout = self.request_timeout(ctx)?;
        let url = format!("{}/{}", self.base_url, path);
        let agent = self.agent.clone();

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("edgetrace-http".to_string())
            .spawn(move || {
                let result = agent
                    .post(&url)
                    .timeout(timeout)
                    .set("Content-Type", content_type)
                    .send_string(&body)
                    .map_err(map_ureq_error)
                    .and_then(|response| {
                        response
                            .into_string()
                            .map_err(|e| BackendError::Transport(e.to_string()))
                    });
                // The receiver is gone once the caller gave up.
                let _ = tx.send(result);
            })
            .map_err(|e| BackendError::Transport(format!("cannot start request: {e}")))?;

        let text = loop {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(result) => break result.map_err(|e| interrupted_or(ctx, e))?,
                Err(mpsc::RecvTimeoutError::Timeout) => ctx.check()?,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(interrupted_or(
                        ctx,
                        BackendError::Transport("request worker exited".to_string()),
                    ))
                }
            }
        };

        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

/// Report a failure as a deadline overrun when the context ran out meanwhile.
fn interrupted_or(ctx: &CallContext, err: BackendError) -> BackendError {
    match ctx.check() {
        Err(interrupted) => BackendError::Interrupted(interrupted),
        Ok(()) => err,
    }
}

fn map_ureq_error(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(status, response) => {
            let mut body = response.into_string().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            BackendError::Status { status, body }
        }
        ureq::Error::Transport(transport) => BackendError::Transport(transport.to_string()),
    }
}

/// NDJSON body of a bulk request.
pub fn bulk_body(intents: &[WriteIntent]) -> Result<String, BackendError> {
    let mut body = String::new();
    for intent in intents {
        body.push_str("{\"index\":{}}\n");
        let doc = serde_json::to_string(&intent.document)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        body.push_str(&doc);
        body.push('\n');
    }
    Ok(body)
}

/// JSON body of a search request.
pub fn search_body(request: &SearchRequest) -> Value {
    let order = match request.order {
        SortOrder::Asc => "asc",
        SortOrder::Desc => "desc",
    };
    let mut body = json!({
        "query": request.filter.to_dsl(),
        "sort": [ { SORT_FIELD: { "order": order } } ],
        "from": 0,
        "size": request.size,
    });
    if request.track_total_hits {
        body["track_total_hits"] = Value::Bool(true);
    }
    if let Some(cursor) = &request.search_after {
        body["search_after"] = json!([cursor]);
    }
    body
}

/// Read per-item outcomes from a bulk response.
///
/// A response flagged `"errors": true` with no failed item is reported as
/// [`BackendError::Malformed`].
pub fn parse_bulk_response(body: &Value) -> Result<BulkResponse, BackendError> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::Malformed("bulk response has no items".to_string()))?;

    let items = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            // Each item is keyed by its action name.
            let outcome = item
                .as_object()
                .and_then(|actions| actions.values().next())
                .ok_or_else(|| {
                    BackendError::Malformed(format!("bulk item {position} has no action"))
                })?;
            let status = outcome
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .ok_or_else(|| {
                    BackendError::Malformed(format!("bulk item {position} has no status"))
                })?;
            let reason = outcome.get("error").map(|error| match error {
                Value::String(s) => s.clone(),
                other => other
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            });
            Ok(BulkItem { position, status, reason })
        })
        .collect::<Result<Vec<_>, BackendError>>()?;

    let response = BulkResponse { items };
    let flagged = body.get("errors").and_then(Value::as_bool).unwrap_or(false);
    if flagged && !response.has_errors() {
        return Err(BackendError::Malformed(
            "bulk response reports errors but no failed item".to_string(),
        ));
    }
    Ok(response)
}

/// Fail unless the bulk response accounts for every item sent.
pub fn check_item_count(response: &BulkResponse, sent: usize) -> Result<(), BackendError> {
    if response.items.len() == sent {
        return Ok(());
    }
    warn!(
        target: "edgetrace::elastic",
        sent,
        reported = response.items.len(),
        "bulk response item count differs from request"
    );
    Err(BackendError::Malformed(format!(
        "bulk response reports {} items for {} sent",
        response.items.len(),
        sent
    )))
}

/// Read hits and the match count from a search response.
pub fn parse_search_response(body: &Value) -> Result<SearchResponse, BackendError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| BackendError::Malformed("search response has no hits".to_string()))?;

    // Older clusters report the count as a bare number.
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(total) => total.get("value").and_then(Value::as_u64),
        None => None,
    };

    let hits = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|raw| {
            raw.iter()
                .map(|hit| RawHit {
                    index: hit
                        .get("_index")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    source: hit.get("_source").cloned().unwrap_or(Value::Null),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SearchResponse { total, hits })
}

impl SearchBackend for ElasticBackend {
    fn bulk_write(
        &self,
        ctx: &CallContext,
        target: &str,
        intents: &[WriteIntent],
    ) -> Result<BulkResponse, BackendError> {
        let body = bulk_body(intents)?;
        let response = self.post(ctx, &format!("{target}/_bulk"), NDJSON, body)?;
        let parsed = parse_bulk_response(&response)?;
        check_item_count(&parsed, intents.len())?;
        Ok(parsed)
    }

    fn search(
        &self,
        ctx: &CallContext,
        target: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, BackendError> {
        let body = search_body(request).to_string();
        let response = self.post(ctx, &format!("{target}/_search"), JSON, body)?;
        parse_search_response(&response)
    }
}
