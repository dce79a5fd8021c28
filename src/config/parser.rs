use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stamped into run reports so results can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlMode, DedupMode, EnvelopeKind};
    use crate::registry::SourceType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "GrantScout"
crawler-version = "0.1"
contact-url = "https://example.org/about"
contact-email = "crawler@example.org"
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(USER_AGENT).unwrap();

        assert_eq!(config.crawler.mode, CrawlMode::Mock);
        assert_eq!(config.crawler.deep_crawl_limit, 100);
        assert_eq!(config.processor.dedup, DedupMode::Exact);
        assert_eq!(config.schedule.hour, 2);
        assert_eq!(config.schedule.interval_hours, 24);
        assert_eq!(config.fetch.proxies.len(), 3);
        assert_eq!(config.fetch.proxies[0].envelope, EnvelopeKind::Json);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let content = format!(
            r#"
[crawler]
mode = "live"
deep-crawl-limit = 25
default-rate-limit-ms = 250
search-results-per-query = 5
{USER_AGENT}
[fetch]
direct = false

[[fetch.proxy]]
name = "relay"
template = "https://relay.example.net/raw?url={{url}}"
envelope = "raw"

[processor]
dedup = "similarity"
similarity-threshold = 0.7

[history]
capacity = 20

[[source]]
id = "county-grants"
name = "County Grants Office"
base-url = "https://grants.county.gov/open"
source-type = "government"
rate-limit-ms = 500

[source.selectors]
container = ".grant"
title = "h3"
"#
        );

        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.mode, CrawlMode::Live);
        assert_eq!(config.crawler.deep_crawl_limit, 25);
        assert!(!config.fetch.direct);
        assert_eq!(config.fetch.proxies.len(), 1);
        assert_eq!(config.processor.dedup, DedupMode::Similarity);
        assert_eq!(config.history.capacity, 20);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].source_type, SourceType::Government);
        assert_eq!(config.sources[0].selectors.container.as_deref(), Some(".grant"));
        assert!(config.sources[0].is_active);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/grant-scout.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("[crawler]\ndeep-crawl-limit = 0\n{USER_AGENT}");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_hash_is_stable() {
        let file = create_temp_config(USER_AGENT);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
