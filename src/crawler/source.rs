use crate::crawler::live::LiveSource;
use crate::crawler::mock::MockSource;
use crate::crawler::RawOpportunity;
use crate::registry::CrawlTarget;
use crate::DiscoveryError;

/// A link returned by a search target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub description: String,
}

/// What crawling one known source produced
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub grants: Vec<RawOpportunity>,
    /// Same-domain URLs worth deep-crawling later in the run
    pub aux_urls: Vec<String>,
    /// Non-fatal problems (e.g. a failed pagination page)
    pub errors: Vec<String>,
}

/// How the engine talks to sources
///
/// `Mock` produces deterministic templated records without touching the
/// network; `Live` fetches pages through the fallback client and parses them
/// with each target's selectors.
#[derive(Debug, Clone)]
pub enum SourceFetcher {
    Mock(MockSource),
    Live(LiveSource),
}

impl SourceFetcher {
    /// Crawls a known source's listing
    pub async fn crawl_source(&self, target: &CrawlTarget) -> Result<SourcePage, DiscoveryError> {
        match self {
            Self::Mock(mock) => Ok(mock.crawl_source(target)),
            Self::Live(live) => live.crawl_source(target).await,
        }
    }

    /// Runs one query against a search target
    pub async fn search(
        &self,
        target: &CrawlTarget,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, DiscoveryError> {
        match self {
            Self::Mock(mock) => Ok(mock.search(target, query, limit)),
            Self::Live(live) => live.search(target, query, limit).await,
        }
    }

    /// Extracts candidate opportunities from an arbitrary discovered page
    pub async fn extract_page(&self, url: &str) -> Result<Vec<RawOpportunity>, DiscoveryError> {
        match self {
            Self::Mock(mock) => mock.extract_page(url),
            Self::Live(live) => live.extract_page(url).await,
        }
    }
}
