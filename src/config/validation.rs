use crate::config::types::{
    Config, CrawlerConfig, EnvelopeKind, FetchConfig, ProcessorConfig, ScheduleConfig,
    UserAgentConfig,
};
use crate::registry::{CrawlTarget, SourceType};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_processor_config(&config.processor)?;
    validate_schedule_config(&config.schedule)?;
    validate_sources(&config.sources)?;

    if config.history.capacity < 1 {
        return Err(ConfigError::Validation(
            "history capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.deep_crawl_limit < 1 || config.deep_crawl_limit > 1000 {
        return Err(ConfigError::Validation(format!(
            "deep_crawl_limit must be between 1 and 1000, got {}",
            config.deep_crawl_limit
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.search_results_per_query < 1 || config.search_results_per_query > 50 {
        return Err(ConfigError::Validation(format!(
            "search_results_per_query must be between 1 and 50, got {}",
            config.search_results_per_query
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the transport chain
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if !config.direct && config.proxies.is_empty() {
        return Err(ConfigError::Validation(
            "fetch chain is empty: enable direct fetching or declare a proxy".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    for proxy in &config.proxies {
        if !proxy.template.contains("{url}") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' template must contain a {{url}} placeholder",
                proxy.name
            )));
        }

        Url::parse(&proxy.template.replace("{url}", "x")).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid template for proxy '{}': {}", proxy.name, e))
        })?;

        if proxy.envelope == EnvelopeKind::Json
            && proxy.json_field.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' uses a JSON envelope but declares no json-field",
                proxy.name
            )));
        }
    }

    Ok(())
}

fn validate_processor_config(config: &ProcessorConfig) -> Result<(), ConfigError> {
    if !(config.similarity_threshold > 0.0 && config.similarity_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "similarity_threshold must be in (0, 1], got {}",
            config.similarity_threshold
        )));
    }
    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.hour > 23 {
        return Err(ConfigError::Validation(format!(
            "schedule hour must be between 0 and 23, got {}",
            config.hour
        )));
    }

    if config.interval_hours < 1 {
        return Err(ConfigError::Validation(
            "schedule interval_hours must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates declared sources
fn validate_sources(sources: &[CrawlTarget]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in sources {
        if source.id.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have an id",
                source.name
            )));
        }

        if !seen.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source id '{}'",
                source.id
            )));
        }

        // Search templates may carry a {query} placeholder
        let sample_url = source.base_url.replace("{query}", "grants");
        let url = Url::parse(&sample_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url for '{}': {}", source.id, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must use http or https, got '{}'",
                source.id,
                url.scheme()
            )));
        }

        if source.source_type == SourceType::SearchEngine && source.search_queries.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Search source '{}' must declare at least one search query",
                source.id
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::registry::Selectors;

    fn target(id: &str, url: &str, source_type: SourceType) -> CrawlTarget {
        CrawlTarget::new(id, id, url, source_type, Selectors::default())
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_duplicate_source_ids_rejected() {
        let sources = vec![
            target("a", "https://a.example.org", SourceType::Foundation),
            target("a", "https://b.example.org", SourceType::Foundation),
        ];
        assert!(validate_sources(&sources).is_err());
    }

    #[test]
    fn test_search_source_needs_queries() {
        let sources = vec![target(
            "search",
            "https://search.example.com/?q={query}",
            SourceType::SearchEngine,
        )];
        assert!(validate_sources(&sources).is_err());

        let mut with_queries = sources;
        with_queries[0].search_queries = vec!["ngo grants".to_string()];
        assert!(validate_sources(&with_queries).is_ok());
    }

    #[test]
    fn test_non_http_source_rejected() {
        let sources = vec![target("ftp", "ftp://files.example.org", SourceType::Private)];
        assert!(validate_sources(&sources).is_err());
    }

    #[test]
    fn test_json_proxy_requires_field() {
        let config = FetchConfig {
            direct: true,
            timeout_secs: 10,
            proxies: vec![ProxyConfig {
                name: "wrapped".to_string(),
                template: "https://relay.example.net/get?url={url}".to_string(),
                envelope: EnvelopeKind::Json,
                json_field: None,
            }],
        };
        assert!(validate_fetch_config(&config).is_err());
    }

    #[test]
    fn test_empty_fetch_chain_rejected() {
        let config = FetchConfig {
            direct: false,
            timeout_secs: 10,
            proxies: vec![],
        };
        assert!(validate_fetch_config(&config).is_err());
    }

    #[test]
    fn test_schedule_hour_range() {
        let mut schedule = ScheduleConfig::default();
        assert!(validate_schedule_config(&schedule).is_ok());
        schedule.hour = 24;
        assert!(validate_schedule_config(&schedule).is_err());
    }
}
