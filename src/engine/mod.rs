//! Search engine backends.
//!
//! Everything above this module talks to [`SearchEngine`]; the trait is
//! the seam between the platform and whichever index implementation is
//! configured. [`MemoryEngine`] evaluates queries exactly in process and
//! backs tests and development; [`TantivyEngine`] is the embedded
//! full-text backend for real deployments.

mod memory;
mod settings;
mod tantivy_engine;

pub use memory::MemoryEngine;
pub use settings::IndexSettings;
pub use tantivy_engine::TantivyEngine;

use crate::config::{EngineBackend, EngineConfig};
use crate::error::{SearchError, SearchResult};
use crate::models::TorrentDocument;
use crate::query::{ComposedQuery, SearchHit};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-document outcome of a bulk call.
///
/// Bulk upserts and deletes are not all-or-nothing; the indexer
/// acknowledges exactly the ids reported here as succeeded and retries
/// the rest.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
}

impl BulkOutcome {
    /// An outcome where every id succeeded
    pub fn success(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            succeeded: ids.into_iter().collect(),
            failed: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, id: Uuid, reason: impl Into<String>) {
        self.failed.push((id, reason.into()));
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: BulkOutcome) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Raw result page from an engine.
///
/// Facet counts are unnormalized; [`crate::facets::normalize_distribution`]
/// turns them into the stable client-facing shape.
#[derive(Debug, Clone)]
pub struct EngineResults {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    pub processing_time_ms: u64,
    pub facet_distribution: HashMap<String, HashMap<String, u64>>,
}

/// Index-level statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub number_of_documents: u64,
    pub is_indexing: bool,
}

/// The search index capability.
///
/// Bulk mutations report per-id outcomes. The rebuild trio stages a full
/// reindex into a fresh generation: `begin_rebuild` opens the staging
/// area, `stage_documents` fills it while the live index keeps serving,
/// and `commit_rebuild` promotes it atomically. `abort_rebuild` discards
/// the staging area and leaves the live index untouched.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Apply attribute settings; a failure here is fatal at startup
    async fn configure(&self, settings: &IndexSettings) -> SearchResult<()>;

    async fn upsert_documents(&self, documents: &[TorrentDocument]) -> SearchResult<BulkOutcome>;

    async fn delete_documents(&self, ids: &[Uuid]) -> SearchResult<BulkOutcome>;

    async fn query(&self, query: &ComposedQuery) -> SearchResult<EngineResults>;

    async fn get_document(&self, id: Uuid) -> SearchResult<Option<TorrentDocument>>;

    async fn stats(&self) -> SearchResult<IndexStats>;

    /// Remove every document from the live index
    async fn clear(&self) -> SearchResult<()>;

    async fn begin_rebuild(&self) -> SearchResult<()>;

    async fn stage_documents(&self, documents: &[TorrentDocument]) -> SearchResult<BulkOutcome>;

    async fn commit_rebuild(&self) -> SearchResult<()>;

    async fn abort_rebuild(&self) -> SearchResult<()>;

    /// Whether the engine can currently serve queries
    async fn health(&self) -> SearchResult<bool>;
}

/// Build the configured engine backend
pub fn create_engine(config: &EngineConfig) -> SearchResult<Arc<dyn SearchEngine>> {
    match config.backend {
        EngineBackend::Memory => {
            tracing::info!("Using in-memory search engine");
            Ok(Arc::new(MemoryEngine::new()))
        }
        EngineBackend::Tantivy => {
            let path = config.path.as_ref().ok_or_else(|| {
                SearchError::Configuration(
                    "Tantivy engine backend requires a path".to_string(),
                )
            })?;
            tracing::info!(path = ?path, "Using tantivy search engine");
            Ok(Arc::new(TantivyEngine::open(path)?))
        }
    }
}
