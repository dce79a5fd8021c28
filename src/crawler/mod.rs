//! Crawl engine for funding-opportunity discovery
//!
//! This module contains the discovery logic, including:
//! - The three-phase run (known sources, search discovery, deep crawl)
//! - Mock and live source fetchers behind one `SourceFetcher` capability
//! - Selector-driven HTML parsing of listings and search results
//! - The relevance heuristic applied to search hits

mod engine;
mod live;
mod mock;
mod parser;
mod relevance;
mod source;

pub use engine::{CrawlEngine, EngineSettings};
pub use live::LiveSource;
pub use mock::MockSource;
pub use parser::{
    extract_links, generic_selectors, next_page_url, page_fallback_opportunity, parse_listing,
    parse_search_hits, Link,
};
pub use relevance::{is_relevant, looks_like_funding_link};
pub use source::{SearchHit, SourceFetcher, SourcePage};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely-typed candidate grant record produced by crawling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOpportunity {
    pub title: String,
    pub description: String,
    pub funder: String,
    pub source_url: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub eligibility: Vec<String>,
}

/// Discovery phase that produced a crawl result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    KnownSource,
    Search,
    DeepCrawl,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::KnownSource => "known-source",
            Self::Search => "search",
            Self::DeepCrawl => "deep-crawl",
        };
        f.write_str(label)
    }
}

/// One source's crawl outcome; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Source name (target name, or the host for deep-crawled pages)
    pub source: String,
    /// Registry id, when the result belongs to a declared target
    pub source_id: Option<String>,
    pub phase: CrawlPhase,
    pub url: String,
    pub grants: Vec<RawOpportunity>,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub total_found: usize,
    pub processing_time_ms: u64,
}
