//! Batch indexer draining the outbox queue into the search engine.
//!
//! Each tick claims a batch of pending entries, re-reads the catalog for
//! upserts, and applies one bulk upsert and one bulk delete. Entries are
//! acknowledged per id, so a partial engine failure retries only the ids
//! that actually failed while the rest of the batch lands. `full_reindex`
//! rebuilds the whole index from the catalog, staging into a fresh
//! generation when swap is enabled so queries never observe a half-built
//! index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogStore;
use crate::config::IndexerConfig;
use crate::engine::{BulkOutcome, SearchEngine};
use crate::error::{SearchError, SearchResult};
use crate::mapper::map_record;
use crate::models::{IndexOperation, TorrentDocument, TorrentRecord};
use crate::queue::IndexQueue;

/// Multiplier applied to the batch size while the queue sits above the
/// high watermark.
const CATCHUP_BATCH_FACTOR: usize = 4;

/// Pause between ticks while working down a deep queue.
const CATCHUP_PAUSE: Duration = Duration::from_millis(100);

/// Pause between catalog pages during a full reindex.
const REINDEX_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Outcome of a single indexer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Entries claimed from the queue this tick.
    pub claimed: usize,
    /// Entries removed from the queue after the engine accepted them.
    pub acknowledged: usize,
    /// Entries released back for retry or quarantine.
    pub released: usize,
}

/// Background worker that keeps the search index converged with the catalog.
pub struct BatchIndexer {
    queue: Arc<dyn IndexQueue>,
    catalog: Arc<dyn CatalogStore>,
    engine: Arc<dyn SearchEngine>,
    config: IndexerConfig,
    stopped: AtomicBool,
}

impl BatchIndexer {
    pub fn new(
        queue: Arc<dyn IndexQueue>,
        catalog: Arc<dyn CatalogStore>,
        engine: Arc<dyn SearchEngine>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            queue,
            catalog,
            engine,
            config,
            stopped: AtomicBool::new(false),
        }
    }

    /// Claim and apply one batch of queue entries.
    ///
    /// Upserts re-read the catalog first; a record deleted since enqueue is
    /// demoted to a delete of the stale document. Documents that fail
    /// validation are released with a permanent error so the queue
    /// quarantines them without holding up the rest of the batch.
    pub async fn tick(&self) -> SearchResult<TickSummary> {
        let batch_size = self.effective_batch_size().await?;
        let entries = self.queue.claim_batch(batch_size).await?;
        if entries.is_empty() {
            return Ok(TickSummary::default());
        }

        let mut summary = TickSummary {
            claimed: entries.len(),
            ..TickSummary::default()
        };
        tracing::debug!(claimed = summary.claimed, "Processing claimed queue entries");

        // Entry ids keyed by subject, for acknowledgement bookkeeping. The
        // queue coalesces per subject, so a claim holds each subject once.
        let mut entry_ids: HashMap<Uuid, Uuid> = HashMap::with_capacity(entries.len());
        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        for entry in &entries {
            entry_ids.insert(entry.subject_id, entry.id);
            match entry.operation {
                IndexOperation::Upsert => upserts.push(entry.subject_id),
                IndexOperation::Delete => deletes.push(entry.subject_id),
            }
        }

        let mut documents = Vec::with_capacity(upserts.len());
        for subject_id in upserts {
            match self.catalog.get(subject_id).await {
                Ok(Some(record)) => {
                    let document = map_record(&record);
                    if let Err(errors) = document.validate() {
                        let error = SearchError::from(errors);
                        tracing::warn!(
                            subject = %subject_id,
                            error = %error,
                            "Document failed validation; quarantining entry"
                        );
                        self.release_subject(&entry_ids, subject_id, &error).await?;
                        summary.released += 1;
                    } else {
                        documents.push(document);
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        subject = %subject_id,
                        "Record gone from catalog; demoting upsert to delete"
                    );
                    deletes.push(subject_id);
                }
                Err(error) => {
                    self.release_subject(&entry_ids, subject_id, &error).await?;
                    summary.released += 1;
                }
            }
        }

        let mut to_ack: Vec<Uuid> = Vec::new();

        if !documents.is_empty() {
            match self.engine.upsert_documents(&documents).await {
                Ok(outcome) => {
                    self.settle(&entry_ids, outcome, &mut to_ack, &mut summary)
                        .await?;
                }
                Err(error) => {
                    tracing::error!(error = %error, "Bulk upsert failed; releasing batch");
                    for document in &documents {
                        self.release_subject(&entry_ids, document.id, &error).await?;
                        summary.released += 1;
                    }
                }
            }
        }

        if !deletes.is_empty() {
            match self.engine.delete_documents(&deletes).await {
                Ok(outcome) => {
                    self.settle(&entry_ids, outcome, &mut to_ack, &mut summary)
                        .await?;
                }
                Err(error) => {
                    tracing::error!(error = %error, "Bulk delete failed; releasing batch");
                    for subject_id in &deletes {
                        self.release_subject(&entry_ids, *subject_id, &error).await?;
                        summary.released += 1;
                    }
                }
            }
        }

        if !to_ack.is_empty() {
            summary.acknowledged = self.queue.acknowledge(&to_ack).await?;
        }
        Ok(summary)
    }

    /// Rebuild the entire index from the catalog.
    ///
    /// With `swap_on_reindex` the catalog is staged into a fresh index that
    /// replaces the live one only on commit; otherwise records are upserted
    /// into the live index page by page. Returns the number of documents
    /// indexed. Records whose mapped document fails validation are skipped
    /// with a warning.
    pub async fn full_reindex(&self) -> SearchResult<u64> {
        tracing::info!(swap = self.config.swap_on_reindex, "Starting full reindex");
        if !self.config.swap_on_reindex {
            let total = self.walk_catalog(false).await?;
            tracing::info!(total, "Full reindex completed in place");
            return Ok(total);
        }

        self.engine.begin_rebuild().await?;
        match self.walk_catalog(true).await {
            Ok(total) => {
                self.engine.commit_rebuild().await?;
                tracing::info!(total, "Full reindex committed");
                Ok(total)
            }
            Err(error) => {
                tracing::error!(error = %error, "Full reindex failed; keeping live index");
                if let Err(abort_error) = self.engine.abort_rebuild().await {
                    tracing::warn!(error = %abort_error, "Failed to discard staged index");
                }
                Err(error)
            }
        }
    }

    /// Remove every document from the live index.
    pub async fn clear_index(&self) -> SearchResult<()> {
        self.engine.clear().await?;
        tracing::info!("Cleared search index");
        Ok(())
    }

    /// Drive ticks until [`stop`](Self::stop) is called.
    ///
    /// Tick failures are logged and the loop keeps going. A queue deeper
    /// than the high watermark shortens the pause between ticks and grows
    /// the claim batch until the backlog drains.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            batch_size = self.config.batch_size,
            poll_interval_secs = self.config.poll_interval_secs,
            "Batch indexer started"
        );
        while !self.stopped.load(Ordering::SeqCst) {
            match self.tick().await {
                Ok(summary) if summary.claimed > 0 => {
                    tracing::debug!(
                        claimed = summary.claimed,
                        acknowledged = summary.acknowledged,
                        released = summary.released,
                        "Indexer tick finished"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(error = %error, "Indexer tick failed");
                }
            }
            tokio::time::sleep(self.pause_duration().await).await;
        }
        tracing::info!("Batch indexer stopped");
    }

    /// Ask the run loop to exit after its current tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Map a bulk outcome back onto queue entries: succeeded subjects are
    /// queued for acknowledgement, failed ones released for retry.
    async fn settle(
        &self,
        entry_ids: &HashMap<Uuid, Uuid>,
        outcome: BulkOutcome,
        to_ack: &mut Vec<Uuid>,
        summary: &mut TickSummary,
    ) -> SearchResult<()> {
        for subject_id in outcome.succeeded {
            if let Some(entry_id) = entry_ids.get(&subject_id) {
                to_ack.push(*entry_id);
            }
        }
        for (subject_id, reason) in outcome.failed {
            tracing::warn!(
                subject = %subject_id,
                reason = %reason,
                "Engine rejected document; leaving entry queued"
            );
            let error = SearchError::EngineUnavailable(reason);
            self.release_subject(entry_ids, subject_id, &error).await?;
            summary.released += 1;
        }
        Ok(())
    }

    async fn release_subject(
        &self,
        entry_ids: &HashMap<Uuid, Uuid>,
        subject_id: Uuid,
        error: &SearchError,
    ) -> SearchResult<()> {
        if let Some(entry_id) = entry_ids.get(&subject_id) {
            self.queue.release(*entry_id, error).await?;
        }
        Ok(())
    }

    async fn walk_catalog(&self, staged: bool) -> SearchResult<u64> {
        let page_size = self.config.reindex_page_size.max(1);
        let mut offset = 0;
        let mut total = 0u64;
        loop {
            let records = self.catalog.page(offset, page_size).await?;
            if records.is_empty() {
                break;
            }
            offset += records.len();
            let documents = valid_documents(&records);
            let outcome = if staged {
                self.engine.stage_documents(&documents).await?
            } else {
                self.engine.upsert_documents(&documents).await?
            };
            total += outcome.succeeded.len() as u64;
            for (subject_id, reason) in &outcome.failed {
                tracing::warn!(
                    subject = %subject_id,
                    reason = %reason,
                    "Engine rejected document during reindex"
                );
            }
            tracing::info!(indexed = total, "Reindex progress");
            tokio::time::sleep(REINDEX_PAGE_DELAY).await;
        }
        Ok(total)
    }

    async fn effective_batch_size(&self) -> SearchResult<usize> {
        let depth = self.queue.depth().await?;
        let batch_size = self.config.batch_size.max(1);
        if depth > self.config.high_watermark {
            Ok(batch_size.saturating_mul(CATCHUP_BATCH_FACTOR))
        } else {
            Ok(batch_size)
        }
    }

    async fn pause_duration(&self) -> Duration {
        match self.queue.depth().await {
            Ok(depth) if depth > self.config.high_watermark => CATCHUP_PAUSE,
            Ok(_) => Duration::from_secs(self.config.poll_interval_secs),
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read queue depth");
                Duration::from_secs(self.config.poll_interval_secs)
            }
        }
    }
}

fn valid_documents(records: &[TorrentRecord]) -> Vec<TorrentDocument> {
    records
        .iter()
        .filter_map(|record| {
            let document = map_record(record);
            match document.validate() {
                Ok(()) => Some(document),
                Err(errors) => {
                    tracing::warn!(
                        subject = %record.id,
                        error = %errors,
                        "Skipping invalid record during reindex"
                    );
                    None
                }
            }
        })
        .collect()
}
