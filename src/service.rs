//! Trace service entry point.
//!
//! [`TraceService`] wires an id generator to a [`TraceStore`] and carries
//! the calling-layer rules: ingestion assigns ids and validates timestamps,
//! searches run validated queries. Create one with [`TraceService::builder`]
//! or [`TraceService::from_config`] and share it across threads.

use std::sync::Arc;
use std::time::Duration;

use edgetrace_core::{
    CallContext, Clock, NodeId, NodeIdentity, ParsedQuery, QueryError, StoreError, SystemClock,
    TemporalId, TemporalIdGenerator, Trace, TracePage, TraceQuery, TraceQueryBuilder,
    DEFAULT_LIMIT,
};
use edgetrace_engine::TraceStore;
use edgetrace_search::{ElasticBackend, MemoryBackend, SearchBackend};
use tracing::{debug, info};

use crate::config::{
    BackendKind, ServiceConfig, DEFAULT_ACTIVE_ALIAS, DEFAULT_INTERFACE, DEFAULT_SEARCH_ALIAS,
    DEFAULT_TIMEOUT_MS,
};
use crate::error::Result;
use crate::ingest::IngestRecord;

/// Physical index behind both aliases of a default memory backend
pub const MEMORY_INDEX: &str = "trace-000001";

/// Ingestion and search over one trace store.
///
/// # Example
///
/// ```ignore
/// use edgetrace::prelude::*;
///
/// let service = TraceService::builder().memory().node_id(node).build()?;
/// let ctx = service.context("req-1", "acct-1");
/// let ids = service.ingest(&ctx, "device-1", "acct-1", &records)?;
///
/// let parsed = service.query_builder().account("acct-1").build()?;
/// let page = service.search(&ctx, &parsed)?;
/// ```
pub struct TraceService {
    store: TraceStore,
    ids: TemporalIdGenerator,
    timeout: Duration,
    default_limit: u64,
}

impl std::fmt::Debug for TraceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceService")
            .field("store", &self.store)
            .field("ids", &self.ids)
            .field("timeout", &self.timeout)
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

impl TraceService {
    /// Create a builder with default settings.
    pub fn builder() -> TraceServiceBuilder {
        TraceServiceBuilder::new()
    }

    /// Build a service from loaded configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder()
            .aliases(&config.backend.search_alias, &config.backend.active_alias)
            .timeout(config.backend.timeout())
            .identity(config.identity.identity()?)
            .instance(config.identity.instance_id)
            .default_limit(config.limits.default_limit);
        builder = match config.backend.kind {
            BackendKind::Memory => builder.memory(),
            // validate() guarantees the url
            BackendKind::Elastic => builder.elastic(config.backend.url.clone().unwrap_or_default()),
        };
        builder.build()
    }

    /// Context for one call, bounded by the configured timeout.
    pub fn context(&self, request_id: &str, account_id: &str) -> CallContext {
        CallContext::new(request_id, account_id).with_timeout(self.timeout)
    }

    /// Query builder preset with the configured default page size.
    pub fn query_builder(&self) -> TraceQueryBuilder {
        TraceQuery::builder().limit(self.default_limit)
    }

    /// The underlying store
    pub fn store(&self) -> &TraceStore {
        &self.store
    }

    /// The id generator
    pub fn id_generator(&self) -> &TemporalIdGenerator {
        &self.ids
    }

    /// Assign ids to `records` and store them for `device_id`.
    ///
    /// Returns the assigned ids in input order. An empty batch stores nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest(EmptyDeviceId)` if `device_id` is empty
    /// - `InvalidRequest(InvalidTimestamp)` naming the first bad record
    /// - `Storage(_)` if the store rejects the batch
    pub fn ingest(
        &self,
        ctx: &CallContext,
        device_id: &str,
        account_id: &str,
        records: &[IngestRecord],
    ) -> Result<Vec<TemporalId>> {
        if device_id.is_empty() {
            return Err(QueryError::EmptyDeviceId.into());
        }

        let timestamps = records
            .iter()
            .enumerate()
            .map(|(index, record)| record.timestamp_millis(index))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if records.is_empty() {
            debug!(device_id, "empty batch, nothing to store");
            return Ok(Vec::new());
        }

        let traces: Vec<Trace> = records
            .iter()
            .zip(timestamps)
            .map(|(record, timestamp)| {
                Trace::new(
                    self.ids.next_id(),
                    device_id,
                    account_id,
                    timestamp,
                    record.trace_type.clone(),
                    record.trace.clone(),
                )
            })
            .collect();

        self.store.add(ctx, &traces)?;
        info!(device_id, account_id, records = traces.len(), "stored traces");
        Ok(traces.into_iter().map(|t| t.id).collect())
    }

    /// Run a validated search.
    pub fn search(&self, ctx: &CallContext, parsed: &ParsedQuery) -> Result<TracePage> {
        Ok(self
            .store
            .search(ctx, &parsed.query, parsed.include_total_count)?)
    }
}

enum BackendChoice {
    Memory,
    Elastic(String),
    Custom(Arc<dyn SearchBackend>),
}

/// Builder for [`TraceService`].
///
/// Defaults: in-memory backend, `trace-search` / `trace-active` aliases,
/// 30 s timeout, node id from `eth0`, instance tag 1, page size 100.
pub struct TraceServiceBuilder {
    backend: BackendChoice,
    search_alias: String,
    active_alias: String,
    timeout: Duration,
    identity: NodeIdentity,
    instance: u8,
    default_limit: u64,
    clock: Arc<dyn Clock>,
}

impl TraceServiceBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            backend: BackendChoice::Memory,
            search_alias: DEFAULT_SEARCH_ALIAS.to_string(),
            active_alias: DEFAULT_ACTIVE_ALIAS.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            identity: NodeIdentity::Interface(DEFAULT_INTERFACE.to_string()),
            instance: 1,
            default_limit: DEFAULT_LIMIT,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a fresh in-memory backend with both aliases on one index.
    pub fn memory(mut self) -> Self {
        self.backend = BackendChoice::Memory;
        self
    }

    /// Use the search cluster at `url`.
    pub fn elastic(mut self, url: impl Into<String>) -> Self {
        self.backend = BackendChoice::Elastic(url.into());
        self
    }

    /// Use an existing backend.
    pub fn backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backend = BackendChoice::Custom(backend);
        self
    }

    /// Set the search and write aliases.
    pub fn aliases(mut self, search: impl Into<String>, active: impl Into<String>) -> Self {
        self.search_alias = search.into();
        self.active_alias = active.into();
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a fixed node id.
    pub fn node_id(mut self, node: NodeId) -> Self {
        self.identity = NodeIdentity::Fixed(node);
        self
    }

    /// Take the node id from a network interface.
    pub fn network_interface(mut self, name: impl Into<String>) -> Self {
        self.identity = NodeIdentity::Interface(name.into());
        self
    }

    /// Set the node identity source.
    pub fn identity(mut self, identity: NodeIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Set the instance tag (0-15).
    pub fn instance(mut self, instance: u8) -> Self {
        self.instance = instance;
        self
    }

    /// Set the page size used when a search does not set one.
    pub fn default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Use a custom clock for id generation.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve the identity, connect the backend and build the service.
    ///
    /// # Errors
    ///
    /// - `Identity(_)` if the node identity cannot be resolved
    /// - `Storage(Initialization)` if the search cluster is unreachable
    pub fn build(self) -> Result<TraceService> {
        let node = self.identity.resolve()?;
        let ids = TemporalIdGenerator::with_clock(node, self.instance, self.clock)?;

        let backend: Arc<dyn SearchBackend> = match self.backend {
            BackendChoice::Memory => Arc::new(
                MemoryBackend::new()
                    .with_alias(self.search_alias.clone(), [MEMORY_INDEX])
                    .with_alias(self.active_alias.clone(), [MEMORY_INDEX]),
            ),
            BackendChoice::Elastic(url) => Arc::new(
                ElasticBackend::connect(&url, self.timeout)
                    .map_err(|e| StoreError::Initialization(e.to_string()))?,
            ),
            BackendChoice::Custom(backend) => backend,
        };

        info!(
            node = %node,
            instance = self.instance,
            search_alias = %self.search_alias,
            active_alias = %self.active_alias,
            "trace service ready"
        );

        Ok(TraceService {
            store: TraceStore::new(backend, self.search_alias, self.active_alias),
            ids,
            timeout: self.timeout,
            default_limit: self.default_limit,
        })
    }
}

impl Default for TraceServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
