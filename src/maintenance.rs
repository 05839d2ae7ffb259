//! Scheduled maintenance jobs.
//!
//! Two cron jobs run alongside the indexer loop: a daily history
//! retention sweep and a periodic refresh of the popular and trending
//! suggestion read models. Job failures are logged and retried on the
//! next firing.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::config::AnalyticsConfig;
use crate::error::{SearchError, SearchResult};
use crate::history::HistoryStore;
use crate::suggest::SuggestionService;

/// Retention sweep fires daily at 03:00 UTC.
const RETENTION_SCHEDULE: &str = "0 0 3 * * *";

/// Suggestion read models refresh every 15 minutes.
const REWARM_SCHEDULE: &str = "0 */15 * * * *";

/// Cron-driven maintenance for the search platform.
pub struct MaintenanceScheduler {
    scheduler: JobScheduler,
    running: Arc<tokio::sync::RwLock<bool>>,
}

impl MaintenanceScheduler {
    /// Create the scheduler and register both maintenance jobs.
    pub async fn new(
        history: Arc<dyn HistoryStore>,
        suggestions: Arc<SuggestionService>,
        config: AnalyticsConfig,
    ) -> SearchResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SearchError::Configuration(e.to_string()))?;

        let retention_days = i64::from(config.retention_days);
        let retention_history = history.clone();
        let retention_job = Job::new_async(RETENTION_SCHEDULE, move |_uuid, _l| {
            let history = retention_history.clone();
            Box::pin(async move {
                let cutoff = Utc::now() - ChronoDuration::days(retention_days);
                debug!(cutoff = %cutoff, "Running history retention sweep");
                match history.prune_before(cutoff).await {
                    Ok(removed) => {
                        info!(removed, "History retention sweep finished");
                    }
                    Err(e) => {
                        error!(error = %e, "History retention sweep failed");
                    }
                }
            })
        })
        .map_err(|e| SearchError::Configuration(e.to_string()))?;
        scheduler
            .add(retention_job)
            .await
            .map_err(|e| SearchError::Configuration(e.to_string()))?;

        let rewarm_job = Job::new_async(REWARM_SCHEDULE, move |_uuid, _l| {
            let suggestions = suggestions.clone();
            Box::pin(async move {
                debug!("Rewarming suggestion read models");
                if let Err(e) = suggestions.rewarm().await {
                    error!(error = %e, "Suggestion rewarm failed");
                }
            })
        })
        .map_err(|e| SearchError::Configuration(e.to_string()))?;
        scheduler
            .add(rewarm_job)
            .await
            .map_err(|e| SearchError::Configuration(e.to_string()))?;

        Ok(Self {
            scheduler,
            running: Arc::new(tokio::sync::RwLock::new(false)),
        })
    }

    /// Start firing the registered jobs.
    pub async fn start(&mut self) -> SearchResult<()> {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Maintenance scheduler is already running");
                return Ok(());
            }
            *running = true;
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| SearchError::Configuration(e.to_string()))?;
        info!("Maintenance scheduler started");
        Ok(())
    }

    /// Stop firing jobs. Safe to call when not running.
    pub async fn shutdown(&mut self) -> SearchResult<()> {
        {
            let mut running = self.running.write().await;
            if !*running {
                warn!("Maintenance scheduler is not running");
                return Ok(());
            }
            *running = false;
        }

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| SearchError::Configuration(e.to_string()))?;
        info!("Maintenance scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuggestConfig;
    use crate::engine::{MemoryEngine, SearchEngine};
    use crate::history::InMemoryHistory;

    #[tokio::test]
    async fn test_scheduler_lifecycle_is_idempotent() {
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
        let engine: Arc<dyn SearchEngine> = Arc::new(MemoryEngine::new());
        let suggestions = Arc::new(SuggestionService::new(
            engine,
            history.clone(),
            SuggestConfig::default(),
        ));

        let mut scheduler =
            MaintenanceScheduler::new(history, suggestions, AnalyticsConfig::default())
                .await
                .unwrap();

        scheduler.start().await.unwrap();
        // A second start is a warning, not an error.
        scheduler.start().await.unwrap();
        scheduler.shutdown().await.unwrap();
        scheduler.shutdown().await.unwrap();
    }
}
