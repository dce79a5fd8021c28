//! Crawl engine - three-phase discovery run
//!
//! A run proceeds through three sequential phases:
//! 1. Known-source crawl: every active non-search target produces one result
//!    and seeds auxiliary URLs from its own domain
//! 2. Search discovery: every query of every active search target; relevant
//!    hits join the discovered-URL set
//! 3. Deep crawl: up to `deep_crawl_limit` discovered URLs not yet crawled in
//!    this run
//!
//! Requests inside a phase are awaited one at a time, so the run-local URL
//! sets need no locking. Only one run may be active per engine.

use crate::config::{Config, CrawlMode, CrawlerConfig};
use crate::crawler::live::LiveSource;
use crate::crawler::mock::MockSource;
use crate::crawler::relevance::is_relevant;
use crate::crawler::source::SourceFetcher;
use crate::crawler::{CrawlPhase, CrawlResult};
use crate::fetch::FallbackClient;
use crate::registry::{CrawlTarget, SourceRegistry};
use crate::url::{extract_domain, url_key};
use crate::DiscoveryError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub deep_crawl_limit: usize,
    pub default_rate_limit_ms: u64,
    pub search_results_per_query: usize,
}

impl From<&CrawlerConfig> for EngineSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            deep_crawl_limit: config.deep_crawl_limit,
            default_rate_limit_ms: config.default_rate_limit_ms,
            search_results_per_query: config.search_results_per_query,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

/// URL bookkeeping for one run
#[derive(Debug, Default)]
struct RunState {
    /// Discovered URLs in discovery order
    discovered: Vec<String>,
    discovered_keys: HashSet<String>,
    crawled_keys: HashSet<String>,
}

impl RunState {
    /// Adds a URL to the discovered set unless it is known or already crawled
    fn discover(&mut self, url: &str) -> bool {
        let Some(key) = url_key(url) else {
            tracing::debug!("Ignoring unnormalizable URL {}", url);
            return false;
        };
        if self.crawled_keys.contains(&key) || !self.discovered_keys.insert(key) {
            return false;
        }
        self.discovered.push(url.to_string());
        true
    }

    fn mark_crawled(&mut self, url: &str) {
        if let Some(key) = url_key(url) {
            self.crawled_keys.insert(key);
        }
    }

    /// Discovered URLs not yet crawled, in discovery order, capped at `limit`
    fn pending(&self, limit: usize) -> Vec<String> {
        self.discovered
            .iter()
            .filter(|url| url_key(url).map_or(false, |k| !self.crawled_keys.contains(&k)))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Clears the running flag when a run ends, including on early return
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, DiscoveryError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DiscoveryError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs discovery over the sources in a shared registry
pub struct CrawlEngine {
    registry: Arc<RwLock<SourceRegistry>>,
    fetcher: SourceFetcher,
    settings: EngineSettings,
    running: AtomicBool,
}

impl CrawlEngine {
    pub fn new(
        registry: Arc<RwLock<SourceRegistry>>,
        fetcher: SourceFetcher,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            settings,
            running: AtomicBool::new(false),
        }
    }

    /// Creates an engine from configuration, selecting the mock or live fetcher
    pub fn from_config(
        config: &Config,
        registry: Arc<RwLock<SourceRegistry>>,
    ) -> Result<Self, DiscoveryError> {
        let fetcher = match config.crawler.mode {
            CrawlMode::Mock => SourceFetcher::Mock(MockSource::default()),
            CrawlMode::Live => SourceFetcher::Live(LiveSource::new(FallbackClient::from_config(config)?)),
        };
        Ok(Self::new(registry, fetcher, EngineSettings::from(&config.crawler)))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> Arc<RwLock<SourceRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs all three phases and returns every crawl result produced
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawlResult>)` - Results in phase order; per-item failures are
    ///   recorded inside the results
    /// * `Err(DiscoveryError::AlreadyRunning)` - Another run is active; returned
    ///   before any work starts
    /// * `Err(DiscoveryError)` - A phase failed outright and the run was aborted
    pub async fn run(&self) -> Result<Vec<CrawlResult>, DiscoveryError> {
        let _guard = RunGuard::acquire(&self.running)?;
        let started = Instant::now();
        let mut state = RunState::default();

        tracing::info!("Phase 1: crawling known sources");
        let mut results = self.crawl_known_sources(&mut state).await?;

        tracing::info!("Phase 2: search-engine discovery");
        results.extend(self.discover_via_search(&mut state).await?);

        tracing::info!(
            "Phase 3: deep crawl of {} discovered URLs (limit {})",
            state.discovered.len(),
            self.settings.deep_crawl_limit
        );
        results.extend(self.deep_crawl(&mut state).await?);

        tracing::info!(
            "Discovery run finished: {} results in {:?}",
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    async fn crawl_known_sources(
        &self,
        state: &mut RunState,
    ) -> Result<Vec<CrawlResult>, DiscoveryError> {
        let targets = self.read_registry(SourceRegistry::active_known_sources)?;
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            let started = Instant::now();
            // The listing itself is never deep-crawled again this run
            state.mark_crawled(&target.base_url);

            let mut result = empty_result(&target.name, Some(&target.id), CrawlPhase::KnownSource, &target.base_url);
            match self.fetcher.crawl_source(&target).await {
                Ok(page) => {
                    let seeded = page.aux_urls.iter().filter(|u| state.discover(u)).count();
                    tracing::info!(
                        "{}: {} opportunities, {} auxiliary URLs seeded",
                        target.name,
                        page.grants.len(),
                        seeded
                    );
                    result.total_found = page.grants.len();
                    result.grants = page.grants;
                    result.errors = page.errors;
                }
                Err(e) => {
                    tracing::warn!("Failed to crawl {}: {}", target.name, e);
                    result.errors.push(format!("Failed to crawl {}: {}", target.name, e));
                }
            }
            result.processing_time_ms = elapsed_ms(started);
            result.timestamp = Utc::now();

            self.write_registry(|r| r.mark_crawled(&target.id, result.timestamp))?;
            results.push(result);
            politeness_delay(target.rate_limit_ms).await;
        }

        Ok(results)
    }

    async fn discover_via_search(
        &self,
        state: &mut RunState,
    ) -> Result<Vec<CrawlResult>, DiscoveryError> {
        let targets = self.read_registry(SourceRegistry::active_search_targets)?;
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            let started = Instant::now();
            let mut result = empty_result(&target.name, Some(&target.id), CrawlPhase::Search, &target.base_url);

            for query in &target.search_queries {
                match self
                    .fetcher
                    .search(&target, query, self.settings.search_results_per_query)
                    .await
                {
                    Ok(hits) => {
                        let relevant: Vec<_> = hits
                            .iter()
                            .filter(|h| is_relevant(&h.title, &h.description))
                            .collect();
                        tracing::debug!(
                            "{} '{}': {} hits, {} relevant",
                            target.name,
                            query,
                            hits.len(),
                            relevant.len()
                        );
                        result.total_found += relevant.len();
                        for hit in relevant {
                            state.discover(&hit.url);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Search '{}' on {} failed: {}", query, target.name, e);
                        result.errors.push(format!("Search '{}' failed: {}", query, e));
                    }
                }
                politeness_delay(target.rate_limit_ms).await;
            }

            result.processing_time_ms = elapsed_ms(started);
            result.timestamp = Utc::now();
            results.push(result);
        }

        Ok(results)
    }

    async fn deep_crawl(&self, state: &mut RunState) -> Result<Vec<CrawlResult>, DiscoveryError> {
        let pending = state.pending(self.settings.deep_crawl_limit);
        let mut results = Vec::with_capacity(pending.len());

        for url in pending {
            // Marked before fetching so a failing URL is never revisited
            state.mark_crawled(&url);
            let started = Instant::now();
            let source = ::url::Url::parse(&url)
                .ok()
                .and_then(|u| extract_domain(&u))
                .unwrap_or_else(|| url.clone());

            let mut result = empty_result(&source, None, CrawlPhase::DeepCrawl, &url);
            match self.fetcher.extract_page(&url).await {
                Ok(grants) => {
                    result.total_found = grants.len();
                    result.grants = grants;
                }
                Err(e) => {
                    tracing::warn!("Deep crawl of {} failed: {}", url, e);
                    result.errors.push(format!("Failed to extract {}: {}", url, e));
                }
            }
            result.processing_time_ms = elapsed_ms(started);
            result.timestamp = Utc::now();
            results.push(result);

            politeness_delay(self.settings.default_rate_limit_ms).await;
        }

        Ok(results)
    }

    fn read_registry<T>(&self, f: impl FnOnce(&SourceRegistry) -> T) -> Result<T, DiscoveryError> {
        let registry = self
            .registry
            .read()
            .map_err(|_| DiscoveryError::Registry("source registry lock poisoned".to_string()))?;
        Ok(f(&registry))
    }

    fn write_registry(&self, f: impl FnOnce(&mut SourceRegistry)) -> Result<(), DiscoveryError> {
        let mut registry = self
            .registry
            .write()
            .map_err(|_| DiscoveryError::Registry("source registry lock poisoned".to_string()))?;
        f(&mut registry);
        Ok(())
    }
}

fn empty_result(source: &str, source_id: Option<&str>, phase: CrawlPhase, url: &str) -> CrawlResult {
    CrawlResult {
        source: source.to_string(),
        source_id: source_id.map(str::to_string),
        phase,
        url: url.to_string(),
        grants: Vec::new(),
        errors: Vec::new(),
        timestamp: Utc::now(),
        total_found: 0,
        processing_time_ms: 0,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

async fn politeness_delay(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
