//! Grant Scout: a funding-opportunity discovery pipeline
//!
//! This crate crawls known funding sources, expands the frontier through
//! search-engine discovery, deep-crawls what it finds, and normalizes the
//! resulting records into deduplicated grants. A companion extractor pulls
//! structured facts out of arbitrary funder or applicant websites.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod manager;
pub mod output;
pub mod processor;
pub mod registry;
pub mod url;

use thiserror::Error;

/// Main error type for Grant Scout operations
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("A crawl is already running")]
    AlreadyRunning,

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("History error: {0}")]
    History(#[from] manager::HistoryError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Grant Scout operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlResult, RawOpportunity, SourceFetcher};
pub use extract::{Role, WebsiteContext, WebsiteContextExtractor};
pub use fetch::FallbackClient;
pub use manager::{CrawlManager, CrawlOutcome, CrawlerStatus};
pub use processor::{DataProcessor, DedupStrategy, ValidatedGrant};
pub use registry::{CrawlTarget, SourceRegistry, SourceType};
pub use url::{extract_domain, infer_region, normalize_url};
