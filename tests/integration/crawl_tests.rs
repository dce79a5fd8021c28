//! Integration tests for global crawls
//!
//! These tests drive the crawl manager through its public API, in mock mode
//! for deterministic phase counts and in live mode against wiremock servers.

use grant_scout::config::{parse_config, Config};
use grant_scout::crawler::{CrawlPhase, CrawlResult, RawOpportunity};
use grant_scout::processor::{DataProcessor, DedupStrategy};
use grant_scout::{CrawlManager, DiscoveryError};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#;

/// Creates a configuration from crawler settings and source tables
fn create_test_config(crawler: &str, sources: &str) -> Config {
    let toml = format!(
        "{}\n[crawler]\n{}\n\n[fetch]\ndirect = true\ntimeout-secs = 5\nproxy = []\n\n{}",
        USER_AGENT, crawler, sources
    );
    parse_config(&toml).expect("test config should be valid")
}

fn phase_count(history: &[CrawlResult], phase: CrawlPhase) -> usize {
    history.iter().filter(|r| r.phase == phase).count()
}

const MOCK_SOURCES: &str = r#"
[[source]]
id = "federal"
name = "Federal Grants Office"
base-url = "https://grants.example.gov/open"
source-type = "government"
rate-limit-ms = 0

[[source]]
id = "state"
name = "State Arts Agency"
base-url = "https://arts.state.example.gov/funding"
source-type = "government"
rate-limit-ms = 0

[[source]]
id = "search"
name = "Web Search"
base-url = "https://search.example.com/?q={query}"
source-type = "search_engine"
search-queries = ["community foundation grants", "nonprofit funding opportunities"]
rate-limit-ms = 0
"#;

#[tokio::test]
async fn test_mock_run_phase_counts() {
    let config = create_test_config(
        "mode = \"mock\"\ndefault-rate-limit-ms = 0\nsearch-results-per-query = 4",
        MOCK_SOURCES,
    );
    let manager = CrawlManager::new(&config).unwrap();

    let outcome = manager.start_global_crawl().await.unwrap();
    assert!(outcome.success);

    let history = manager.get_crawl_history().unwrap();
    assert_eq!(phase_count(&history, CrawlPhase::KnownSource), 2);

    let search: Vec<_> = history
        .iter()
        .filter(|r| r.phase == CrawlPhase::Search)
        .collect();
    assert_eq!(search.len(), 1);
    assert!(search[0].total_found <= 2 * 4);
    assert!(search[0].total_found > 0);

    // Every deep-crawled URL was discovered by phase 1 or 2
    let deep = phase_count(&history, CrawlPhase::DeepCrawl);
    let known_aux = 2 * 2;
    assert!(deep > 0);
    assert!(deep <= (known_aux + search[0].total_found).min(100));

    let deep_urls: std::collections::HashSet<_> = history
        .iter()
        .filter(|r| r.phase == CrawlPhase::DeepCrawl)
        .map(|r| r.url.as_str())
        .collect();
    assert_eq!(deep_urls.len(), deep);
    assert!(!deep_urls.contains("https://grants.example.gov/open"));
}

#[tokio::test]
async fn test_mock_run_respects_deep_crawl_limit() {
    let config = create_test_config(
        "mode = \"mock\"\ndefault-rate-limit-ms = 0\ndeep-crawl-limit = 3",
        MOCK_SOURCES,
    );
    let manager = CrawlManager::new(&config).unwrap();

    manager.start_global_crawl().await.unwrap();

    let history = manager.get_crawl_history().unwrap();
    assert_eq!(phase_count(&history, CrawlPhase::DeepCrawl), 3);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let sources = r#"
[[source]]
id = "slow"
name = "Slow Agency"
base-url = "https://slow.example.gov/grants"
source-type = "government"
rate-limit-ms = 300
"#;
    let config = create_test_config("mode = \"mock\"\ndefault-rate-limit-ms = 0", sources);
    let manager = Arc::new(CrawlManager::new(&config).unwrap());

    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.start_global_crawl().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(manager.get_crawler_status().unwrap().is_running);
    let second = manager.start_global_crawl().await;
    assert!(matches!(second, Err(DiscoveryError::AlreadyRunning)));

    let first = first.await.unwrap().unwrap();
    assert!(first.success);
    assert_eq!(manager.get_crawler_status().unwrap().total_crawls, 1);
}

fn listing_page(items: &[(&str, &str, &str)]) -> String {
    let cards: String = items
        .iter()
        .map(|(title, description, href)| {
            format!(
                r#"<div class="grant"><h3>{}</h3><p class="summary">{}</p><a href="{}">Details</a></div>"#,
                title, description, href
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

fn live_sources(base: &str) -> String {
    format!(
        r#"
[[source]]
id = "active"
name = "Active Fund"
base-url = "{base}/active"
source-type = "foundation"
rate-limit-ms = 0

[source.selectors]
container = ".grant"
title = "h3"
description = "p.summary"

[[source]]
id = "dormant"
name = "Dormant Fund"
base-url = "{base}/inactive"
source-type = "foundation"
rate-limit-ms = 0
active = false

[source.selectors]
container = ".grant"
title = "h3"
description = "p.summary"
"#
    )
}

#[tokio::test]
async fn test_inactive_target_is_never_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/active"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[(
            "Rural Libraries Grant",
            "Funding for rural library programs",
            "/active/rural-libraries",
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/inactive"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[(
            "Should Not Appear",
            "Never crawled",
            "/inactive/x",
        )])))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(
        "mode = \"live\"\ndefault-rate-limit-ms = 0",
        &live_sources(&server.uri()),
    );
    let manager = CrawlManager::new(&config).unwrap();

    let outcome = manager.start_global_crawl().await.unwrap();

    assert!(outcome.success);
    assert!(outcome
        .processed_grants
        .iter()
        .any(|g| g.title == "Rural Libraries Grant" && g.funder == "Active Fund"));
    assert!(outcome
        .processed_grants
        .iter()
        .all(|g| g.title != "Should Not Appear"));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| !r.url.path().starts_with("/inactive")));
}

#[tokio::test]
async fn test_empty_description_is_reported_not_processed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/active"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
            ("Youth Sports Grant", "Equipment for youth clubs", "/active/youth"),
            ("Mystery Grant", "", "/active/mystery"),
        ])))
        .mount(&server)
        .await;

    let config = create_test_config(
        "mode = \"live\"\ndefault-rate-limit-ms = 0",
        &live_sources(&server.uri()),
    );
    let manager = CrawlManager::new(&config).unwrap();

    let outcome = manager.start_global_crawl().await.unwrap();

    assert!(outcome
        .processed_grants
        .iter()
        .any(|g| g.title == "Youth Sports Grant"));
    assert!(outcome.processed_grants.iter().all(|g| g.title != "Mystery Grant"));
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("Mystery Grant") && e.contains("description is required")));
}

#[test]
fn test_exact_dedup_keeps_first_funder() {
    let raw = |funder: &str| RawOpportunity {
        title: "Community Grant".to_string(),
        description: "Support for local groups".to_string(),
        funder: funder.to_string(),
        source_url: "https://fund.org/community".to_string(),
        ..RawOpportunity::default()
    };
    let results = vec![CrawlResult {
        source: "Fund".to_string(),
        source_id: None,
        phase: CrawlPhase::KnownSource,
        url: "https://fund.org".to_string(),
        grants: vec![raw("City Foundation"), raw("County Trust")],
        errors: vec![],
        timestamp: chrono::Utc::now(),
        total_found: 2,
        processing_time_ms: 0,
    }];

    let batch = DataProcessor::new(DedupStrategy::ExactTitle).process(&results);

    assert_eq!(batch.grants.len(), 1);
    assert_eq!(batch.grants[0].funder, "City Foundation");
    assert_eq!(batch.duplicates[0].funder, "County Trust");
}
