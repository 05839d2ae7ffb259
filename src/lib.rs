//! Denormalized search for a torrent catalog.
//!
//! The crate keeps a search index synchronized with a transactional
//! catalog through an outbox queue: every catalog mutation enqueues a
//! coalesced index operation, and a batch indexer drains the queue into
//! the engine with per-entry retry and quarantine. On top of the index
//! sit a validating query composer with facet presets, a multi-source
//! suggestion engine, and analytics fed by recorded searches and clicks.
//!
//! ```text
//! CatalogWriter ──► IndexQueue ──► BatchIndexer ──► SearchEngine
//!                                                        ▲
//! SearchService ── compose ── query ─────────────────────┘
//!       │
//!       ├──► SuggestionService (names, facets, history, popular)
//!       └──► SearchAnalytics   (CTR, trends, performance, A/B)
//! ```
//!
//! [`SearchService`](service::SearchService) assembles the whole stack;
//! the pieces stay usable on their own behind the
//! [`SearchEngine`](engine::SearchEngine),
//! [`IndexQueue`](queue::IndexQueue),
//! [`CatalogStore`](catalog::CatalogStore) and
//! [`HistoryStore`](history::HistoryStore) traits.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod facets;
pub mod history;
pub mod indexer;
pub mod maintenance;
pub mod mapper;
pub mod models;
pub mod query;
pub mod queue;
pub mod service;
pub mod suggest;

pub use catalog::{CatalogStore, CatalogWriter};
pub use config::Config;
pub use engine::SearchEngine;
pub use error::{SearchError, SearchResult};
pub use history::HistoryStore;
pub use indexer::BatchIndexer;
pub use queue::IndexQueue;
pub use service::{SearchOutcome, SearchService};
