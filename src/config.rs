use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SearchResult;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search engine backend configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Index queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Batch indexer configuration
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Query composition limits
    #[serde(default)]
    pub query: QueryConfig,

    /// Autocomplete configuration
    #[serde(default)]
    pub suggest: SuggestConfig,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> SearchResult<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        let config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: TRACKER_SEARCH)
            .add_source(
                config::Environment::with_prefix("TRACKER_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Search engine backend
    #[serde(default)]
    pub backend: EngineBackend,

    /// Index directory for embedded backends (tantivy)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    #[default]
    Memory,
    Tantivy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend
    #[serde(default)]
    pub backend: QueueBackend,

    /// Path for the embedded database (sled)
    pub path: Option<PathBuf>,

    /// Attempts before an entry is quarantined
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for the exponential retry backoff
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for the computed backoff
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// How long a claimed entry stays invisible before it is
    /// handed out again
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            path: None,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            claim_lease_secs: default_claim_lease_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Entries claimed per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between ticks when the queue is drained
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Queue depth above which the indexer switches to catch-up
    /// pacing (larger batches, shorter pauses)
    #[serde(default = "default_high_watermark")]
    pub high_watermark: usize,

    /// Catalog page size for full reindex passes
    #[serde(default = "default_reindex_page_size")]
    pub reindex_page_size: usize,

    /// Stage full reindexes into a shadow index and swap on completion
    /// instead of clearing the live index first
    #[serde(default = "default_true")]
    pub swap_on_reindex: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            high_watermark: default_high_watermark(),
            reindex_page_size: default_reindex_page_size(),
            swap_on_reindex: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Hard cap on requested page size
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Page size when the request does not ask for one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Maximum query text length in bytes
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Engine query timeout; queries past it degrade to an
    /// empty result set
    #[serde(default = "default_query_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            max_query_length: default_max_query_length(),
            timeout_ms: default_query_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Prefixes shorter than this return no suggestions
    #[serde(default = "default_min_prefix_length")]
    pub min_prefix_length: usize,

    /// Suggestions returned after merging all sources
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Recent searches kept per user
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// TTL for the cached popular/trending read models
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            min_prefix_length: default_min_prefix_length(),
            max_suggestions: default_max_suggestions(),
            recent_limit: default_recent_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Days of search history kept before the retention job
    /// prunes it
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

// Default value functions
fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    300_000
}

fn default_claim_lease_secs() -> u64 {
    120
}

fn default_batch_size() -> usize {
    100
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_high_watermark() -> usize {
    1_000
}

fn default_reindex_page_size() -> usize {
    500
}

fn default_max_limit() -> usize {
    100
}

fn default_limit() -> usize {
    20
}

fn default_max_query_length() -> usize {
    500
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_min_prefix_length() -> usize {
    2
}

fn default_max_suggestions() -> usize {
    10
}

fn default_recent_limit() -> usize {
    20
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_retention_days() -> u32 {
    90
}

fn default_true() -> bool {
    true
}
