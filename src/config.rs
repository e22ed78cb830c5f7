//! Service configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [backend]
//! kind = "elastic"            # or "memory"
//! url = "http://localhost:9200"
//! search_alias = "trace-search"
//! active_alias = "trace-active"
//! timeout_ms = 30000
//!
//! [identity]
//! network_interface = "eth0"  # or node_id = "02:42:ac:11:00:02"
//! instance_id = 1
//!
//! [limits]
//! default_limit = 100
//! ```
//!
//! Every key is optional; missing keys take the defaults shown.

use std::path::{Path, PathBuf};
use std::time::Duration;

use edgetrace_core::{NodeId, NodeIdentity, MAX_INSTANCE_TAG, MAX_LIMIT, MIN_LIMIT};
use serde::Deserialize;
use thiserror::Error;

/// Default search alias
pub const DEFAULT_SEARCH_ALIAS: &str = "trace-search";
/// Default write alias
pub const DEFAULT_ACTIVE_ALIAS: &str = "trace-active";
/// Default per-call timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default network interface for the node identity
pub const DEFAULT_INTERFACE: &str = "eth0";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which search backend to run on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process backend
    #[default]
    Memory,
    /// HTTP search cluster
    Elastic,
}

/// `[backend]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Backend kind
    pub kind: BackendKind,
    /// Cluster URL, required for `elastic`
    pub url: Option<String>,
    /// Alias searched by queries
    pub search_alias: String,
    /// Alias receiving writes
    pub active_alias: String,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            url: None,
            search_alias: DEFAULT_SEARCH_ALIAS.to_string(),
            active_alias: DEFAULT_ACTIVE_ALIAS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BackendConfig {
    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `[identity]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Interface whose hardware address becomes the node id
    pub network_interface: String,
    /// Explicit node id; takes precedence over the interface
    pub node_id: Option<String>,
    /// Instance tag, 0-15
    pub instance_id: u8,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            network_interface: DEFAULT_INTERFACE.to_string(),
            node_id: None,
            instance_id: 1,
        }
    }
}

impl IdentityConfig {
    /// Node identity source described by this section.
    pub fn identity(&self) -> Result<NodeIdentity, ConfigError> {
        match &self.node_id {
            Some(raw) => raw
                .parse::<NodeId>()
                .map(NodeIdentity::Fixed)
                .map_err(|e| ConfigError::Invalid(format!("identity.node_id: {e}"))),
            None => Ok(NodeIdentity::Interface(self.network_interface.clone())),
        }
    }
}

/// `[limits]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Page size when a search does not set one
    pub default_limit: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: edgetrace_core::DEFAULT_LIMIT,
        }
    }
}

/// Full service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Backend settings
    pub backend: BackendConfig,
    /// Node identity settings
    pub identity: IdentityConfig,
    /// Request limits
    pub limits: LimitsConfig,
}

impl ServiceConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that the schema alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Elastic
            && self.backend.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "backend.url is required for the elastic backend".to_string(),
            ));
        }
        if let (BackendKind::Elastic, Some(url)) = (self.backend.kind, self.backend.url.as_deref()) {
            if !url.starts_with("http://") {
                return Err(ConfigError::Invalid(format!(
                    "backend.url must be an http:// URL, got '{url}' (TLS is not supported)"
                )));
            }
        }
        if self.backend.search_alias.is_empty() || self.backend.active_alias.is_empty() {
            return Err(ConfigError::Invalid("backend aliases must not be empty".to_string()));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid("backend.timeout_ms must be positive".to_string()));
        }
        if self.identity.instance_id > MAX_INSTANCE_TAG {
            return Err(ConfigError::Invalid(format!(
                "identity.instance_id must be at most {MAX_INSTANCE_TAG}"
            )));
        }
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&self.limits.default_limit) {
            return Err(ConfigError::Invalid(format!(
                "limits.default_limit must be within {MIN_LIMIT}..={MAX_LIMIT}"
            )));
        }
        self.identity.identity()?;
        Ok(())
    }
}
