//! Crawl manager - end-to-end orchestration of discovery runs
//!
//! The manager owns the crawl engine, the data processor and the history
//! store. A global crawl runs the engine, processes every raw record, builds a
//! summary and appends the run's results to history. The manager can also
//! schedule recurring crawls on a cancellable background task.

mod history;
mod schedule;
mod summary;

pub use history::{HistoryError, HistoryResult, HistoryStore, MemoryHistory, SqliteHistory};
pub use schedule::{delay_until_hour, ScheduleHandle};
pub use summary::{RunSummary, SourceCount};

use crate::config::{Config, ScheduleConfig};
use crate::crawler::{CrawlEngine, CrawlResult};
use crate::processor::{DataProcessor, ValidatedGrant};
use crate::registry::{Selectors, SourceRegistry};
use crate::DiscoveryError;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Outcome of one global crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    /// False when the run aborted
    pub success: bool,
    /// Raw records produced across all phases
    pub total_grants: usize,
    pub processed_grants: Vec<ValidatedGrant>,
    /// Per-item crawl errors, then dropped-record errors
    pub errors: Vec<String>,
    pub summary: RunSummary,
}

/// Snapshot of the manager's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlerStatus {
    pub is_running: bool,
    pub is_scheduled: bool,
    pub total_crawls: u64,
    pub last_crawl: Option<DateTime<Utc>>,
}

/// Orchestrates discovery runs, history and scheduling
pub struct CrawlManager {
    engine: CrawlEngine,
    processor: DataProcessor,
    history: Mutex<Box<dyn HistoryStore>>,
    schedule: ScheduleConfig,
    scheduled: Mutex<Option<ScheduleHandle>>,
}

impl CrawlManager {
    /// Builds a manager from configuration
    ///
    /// The registry is seeded from the configured sources, or the built-in
    /// defaults when none are declared. History goes to SQLite when a
    /// database path is configured and to memory otherwise.
    pub fn new(config: &Config) -> Result<Self, DiscoveryError> {
        let registry = SourceRegistry::from_targets(config.sources.clone());
        let engine = CrawlEngine::from_config(config, Arc::new(RwLock::new(registry)))?;

        let history: Box<dyn HistoryStore> = match &config.history.database_path {
            Some(path) => Box::new(SqliteHistory::open(Path::new(path), config.history.capacity)?),
            None => Box::new(MemoryHistory::new(config.history.capacity)),
        };

        Ok(Self::with_parts(
            engine,
            DataProcessor::from_config(&config.processor),
            history,
            config.schedule.clone(),
        ))
    }

    pub fn with_parts(
        engine: CrawlEngine,
        processor: DataProcessor,
        history: Box<dyn HistoryStore>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            engine,
            processor,
            history: Mutex::new(history),
            schedule,
            scheduled: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &CrawlEngine {
        &self.engine
    }

    /// Runs one full discovery run and processes its output
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The run finished or aborted; an aborted run has
    ///   `success == false` and its error in `errors`
    /// * `Err(DiscoveryError::AlreadyRunning)` - Another run is in progress
    pub async fn start_global_crawl(&self) -> Result<CrawlOutcome, DiscoveryError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let results = match self.engine.run().await {
            Ok(results) => results,
            Err(DiscoveryError::AlreadyRunning) => {
                tracing::warn!("Crawl requested while another run is active");
                return Err(DiscoveryError::AlreadyRunning);
            }
            Err(e) => {
                tracing::error!("Discovery run aborted: {}", e);
                let message = e.to_string();
                return Ok(CrawlOutcome {
                    success: false,
                    total_grants: 0,
                    processed_grants: Vec::new(),
                    errors: vec![message.clone()],
                    summary: RunSummary::failed(started_at, elapsed_ms(started), &message),
                });
            }
        };

        let batch = self.processor.process(&results);
        let summary = RunSummary::build(&results, &batch, started_at, elapsed_ms(started));

        let mut errors: Vec<String> = results
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| format!("{}: {}", r.source, e)))
            .collect();
        errors.extend(batch.errors.iter().cloned());

        if let Err(e) = self.record_history(started_at, &results) {
            tracing::warn!("Failed to record crawl history: {}", e);
            errors.push(format!("History not recorded: {}", e));
        }

        tracing::info!(
            "Global crawl finished: {} raw, {} processed, {} errors",
            batch.total_raw,
            batch.grants.len(),
            errors.len()
        );

        Ok(CrawlOutcome {
            success: true,
            total_grants: batch.total_raw,
            processed_grants: batch.grants,
            errors,
            summary,
        })
    }

    /// Starts recurring crawls on a background task
    ///
    /// The first crawl fires at the next configured hour in local time, then
    /// every `interval-hours`. A tick that collides with a running crawl is
    /// skipped. Calling this again replaces the existing schedule. Must be
    /// called from within a tokio runtime.
    pub fn schedule_regular_crawls(self: &Arc<Self>) -> Result<(), DiscoveryError> {
        let first = delay_until_hour(&Local::now(), self.schedule.hour);
        let period = Duration::from_secs(self.schedule.interval_hours.max(1) * 3600);
        let weak: Weak<Self> = Arc::downgrade(self);

        tracing::info!(
            "Scheduling crawls every {}h, first in {} minutes",
            self.schedule.interval_hours,
            first.as_secs() / 60
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                // Detached so cancelling the schedule never interrupts a run
                let run = tokio::spawn(async move { manager.start_global_crawl().await });
                match run.await {
                    Ok(Ok(outcome)) => tracing::info!("Scheduled crawl finished\n{}", outcome.summary),
                    Ok(Err(DiscoveryError::AlreadyRunning)) => {
                        tracing::info!("Skipping scheduled crawl: a run is already active")
                    }
                    Ok(Err(e)) => tracing::error!("Scheduled crawl failed: {}", e),
                    Err(e) => tracing::error!("Scheduled crawl task failed: {}", e),
                }
            }
        });

        *self.lock_schedule()? = Some(ScheduleHandle::new(task));
        Ok(())
    }

    /// Cancels the recurring crawl task; a run already in progress completes
    pub fn stop_scheduled_crawls(&self) -> Result<(), DiscoveryError> {
        if let Some(handle) = self.lock_schedule()?.take() {
            handle.cancel();
            tracing::info!("Scheduled crawls stopped");
        }
        Ok(())
    }

    /// Retained crawl results, oldest first
    pub fn get_crawl_history(&self) -> Result<Vec<CrawlResult>, DiscoveryError> {
        Ok(self.lock_history()?.results()?)
    }

    pub fn get_crawler_status(&self) -> Result<CrawlerStatus, DiscoveryError> {
        let is_scheduled = self
            .lock_schedule()?
            .as_ref()
            .map_or(false, ScheduleHandle::is_active);
        let history = self.lock_history()?;

        Ok(CrawlerStatus {
            is_running: self.engine.is_running(),
            is_scheduled,
            total_crawls: history.run_count()?,
            last_crawl: history.last_run()?,
        })
    }

    /// Registers a private source in the engine's registry
    ///
    /// # Returns
    ///
    /// The id assigned to the new source
    pub fn add_custom_source(
        &self,
        name: &str,
        url: &str,
        selectors: Selectors,
    ) -> Result<String, DiscoveryError> {
        let registry = self.engine.registry();
        let mut registry = registry
            .write()
            .map_err(|_| DiscoveryError::Registry("source registry lock poisoned".to_string()))?;
        let id = registry.add_custom_source(name, url, selectors)?;
        tracing::info!("Added custom source {} ({})", name, id);
        Ok(id)
    }

    fn record_history(
        &self,
        started_at: DateTime<Utc>,
        results: &[CrawlResult],
    ) -> Result<(), DiscoveryError> {
        self.lock_history()?.record_run(started_at, results)?;
        Ok(())
    }

    fn lock_history(&self) -> Result<MutexGuard<'_, Box<dyn HistoryStore>>, DiscoveryError> {
        self.history
            .lock()
            .map_err(|_| DiscoveryError::Registry("history lock poisoned".to_string()))
    }

    fn lock_schedule(&self) -> Result<MutexGuard<'_, Option<ScheduleHandle>>, DiscoveryError> {
        self.scheduled
            .lock()
            .map_err(|_| DiscoveryError::Registry("schedule lock poisoned".to_string()))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{EngineSettings, MockSource, SourceFetcher};
    use crate::registry::{CrawlTarget, SourceType};

    fn manager(targets: Vec<CrawlTarget>) -> CrawlManager {
        let mut registry = SourceRegistry::new();
        for target in targets {
            registry.add(target.with_rate_limit(0)).unwrap();
        }
        let engine = CrawlEngine::new(
            Arc::new(RwLock::new(registry)),
            SourceFetcher::Mock(MockSource::default()),
            EngineSettings {
                deep_crawl_limit: 100,
                default_rate_limit_ms: 0,
                search_results_per_query: 4,
            },
        );
        CrawlManager::with_parts(
            engine,
            DataProcessor::default(),
            Box::new(MemoryHistory::new(1000)),
            ScheduleConfig::default(),
        )
    }

    fn gov(id: &str) -> CrawlTarget {
        CrawlTarget::new(
            id,
            &format!("{} Agency", id),
            &format!("https://{}.example.gov/grants", id),
            SourceType::Government,
            Selectors::default(),
        )
    }

    #[tokio::test]
    async fn test_global_crawl_records_history() {
        let manager = manager(vec![gov("alpha"), gov("beta")]);

        let outcome = manager.start_global_crawl().await.unwrap();
        assert!(outcome.success);
        assert!(outcome.total_grants > 0);
        assert!(!outcome.processed_grants.is_empty());
        assert!(outcome.processed_grants.len() <= outcome.total_grants);

        let history = manager.get_crawl_history().unwrap();
        let known = history
            .iter()
            .filter(|r| r.phase == crate::crawler::CrawlPhase::KnownSource)
            .count();
        assert_eq!(known, 2);

        let status = manager.get_crawler_status().unwrap();
        assert_eq!(status.total_crawls, 1);
        assert_eq!(status.last_crawl, Some(outcome.summary.started_at));
        assert!(!status.is_running);
        assert!(!status.is_scheduled);
    }

    #[tokio::test]
    async fn test_history_is_appended_per_run() {
        let manager = manager(vec![gov("alpha")]);

        manager.start_global_crawl().await.unwrap();
        let first = manager.get_crawl_history().unwrap().len();
        manager.start_global_crawl().await.unwrap();

        assert_eq!(manager.get_crawl_history().unwrap().len(), first * 2);
        assert_eq!(manager.get_crawler_status().unwrap().total_crawls, 2);
    }

    #[tokio::test]
    async fn test_aborted_run_returns_failure_outcome() {
        let manager = manager(vec![gov("alpha")]);
        let registry = manager.engine().registry();
        let _ = std::thread::spawn(move || {
            let _guard = registry.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();

        let outcome = manager.start_global_crawl().await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.total_grants, 0);
        assert!(outcome.processed_grants.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("poisoned"));
        assert!(outcome.summary.failure.is_some());
        assert!(!manager.engine().is_running());

        let status = manager.get_crawler_status().unwrap();
        assert!(!status.is_running);
        assert_eq!(status.total_crawls, 0);
    }

    #[tokio::test]
    async fn test_schedule_and_stop() {
        let manager = Arc::new(manager(vec![gov("alpha")]));

        manager.schedule_regular_crawls().unwrap();
        assert!(manager.get_crawler_status().unwrap().is_scheduled);

        manager.stop_scheduled_crawls().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!manager.get_crawler_status().unwrap().is_scheduled);
    }

    #[test]
    fn test_add_custom_source() {
        let manager = manager(vec![gov("alpha")]);
        let id = manager
            .add_custom_source("River Trust", "https://rivertrust.org/grants", Selectors::default())
            .unwrap();

        assert_eq!(id, "custom-river-trust");
        let registry = manager.engine().registry();
        assert!(registry.read().unwrap().get(&id).is_some());

        assert!(manager
            .add_custom_source("Bad", "ftp://rivertrust.org", Selectors::default())
            .is_err());
    }
}
