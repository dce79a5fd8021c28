//! Configuration module for Grant Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use grant_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("grant-scout.toml")).unwrap();
//! println!("Deep crawl limit: {}", config.crawler.deep_crawl_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_proxies, Config, CrawlMode, CrawlerConfig, DedupMode, EnvelopeKind, FetchConfig,
    HistoryConfig, OutputConfig, ProcessorConfig, ProxyConfig, ScheduleConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
