use crate::registry::CrawlTarget;
use serde::Deserialize;

/// Main configuration structure for Grant Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Declared sources; the built-in registry is used when empty
    #[serde(default, rename = "source")]
    pub sources: Vec<CrawlTarget>,
}

/// How known sources and search targets are queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Deterministic templated records, no network traffic
    #[default]
    Mock,
    /// Real fetching and selector-driven parsing
    Live,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    #[serde(default)]
    pub mode: CrawlMode,

    /// Maximum number of discovered URLs deep-crawled per run
    #[serde(default = "default_deep_crawl_limit")]
    pub deep_crawl_limit: usize,

    /// Declared for compatibility with source definitions; phases run sequentially
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: u32,

    /// Delay after each deep-crawl request (milliseconds)
    #[serde(default = "default_rate_limit_ms")]
    pub default_rate_limit_ms: u64,

    /// Upper bound on hits collected from a single search query
    #[serde(default = "default_search_results_per_query")]
    pub search_results_per_query: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::default(),
            deep_crawl_limit: default_deep_crawl_limit(),
            max_concurrent_requests: default_max_concurrent_requests(),
            default_rate_limit_ms: default_rate_limit_ms(),
            search_results_per_query: default_search_results_per_query(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,
    pub contact_url: String,
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Transport chain configuration for the fetch-fallback client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Try a direct request before any relay proxy
    #[serde(default = "default_true")]
    pub direct: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_proxies", rename = "proxy")]
    pub proxies: Vec<ProxyConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            direct: true,
            timeout_secs: default_timeout_secs(),
            proxies: default_proxies(),
        }
    }
}

/// Response envelope of a relay proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Body is the target page as-is
    Raw,
    /// Body is a JSON object carrying the page in one string field
    Json,
}

/// One relay proxy in the fallback chain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    pub name: String,

    /// Request URL with a `{url}` placeholder for the encoded target
    pub template: String,

    pub envelope: EnvelopeKind,

    /// Field holding the page for JSON envelopes
    #[serde(default)]
    pub json_field: Option<String>,
}

/// Deduplication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    #[default]
    Exact,
    Similarity,
}

/// Data processor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcessorConfig {
    #[serde(default)]
    pub dedup: DedupMode,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Never merge records whose funders differ
    #[serde(default = "default_true")]
    pub funder_aware: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            dedup: DedupMode::default(),
            similarity_threshold: default_similarity_threshold(),
            funder_aware: true,
        }
    }
}

/// Run history configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryConfig {
    /// Maximum number of crawl results retained
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,

    /// SQLite file backing the history; in-memory when absent
    #[serde(default)]
    pub database_path: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            database_path: None,
        }
    }
}

/// Periodic re-crawl configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Local hour of the first scheduled run
    #[serde(default = "default_schedule_hour")]
    pub hour: u32,

    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: default_schedule_hour(),
            interval_hours: default_interval_hours(),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the markdown run report
    #[serde(default)]
    pub summary_path: Option<String>,

    /// Path to the JSON export of processed grants
    #[serde(default)]
    pub grants_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_deep_crawl_limit() -> usize {
    100
}

fn default_max_concurrent_requests() -> u32 {
    3
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_search_results_per_query() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_history_capacity() -> usize {
    500
}

fn default_schedule_hour() -> u32 {
    2
}

fn default_interval_hours() -> u64 {
    24
}

/// Public relay proxies tried after the direct request, in order
pub fn default_proxies() -> Vec<ProxyConfig> {
    vec![
        ProxyConfig {
            name: "allorigins".to_string(),
            template: "https://api.allorigins.win/get?url={url}".to_string(),
            envelope: EnvelopeKind::Json,
            json_field: Some("contents".to_string()),
        },
        ProxyConfig {
            name: "corsproxy".to_string(),
            template: "https://corsproxy.io/?{url}".to_string(),
            envelope: EnvelopeKind::Raw,
            json_field: None,
        },
        ProxyConfig {
            name: "codetabs".to_string(),
            template: "https://api.codetabs.com/v1/proxy?quest={url}".to_string(),
            envelope: EnvelopeKind::Raw,
            json_field: None,
        },
    ]
}
