//! Integration tests for website context extraction
//!
//! The extractor is exercised through the full fallback chain: a direct
//! request and a JSON-envelope proxy, both served by wiremock.

use grant_scout::extract::{Profile, Role, WebsiteContextExtractor, MIN_CONFIDENCE};
use grant_scout::fetch::{FallbackClient, ProxyEndpoint};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client should build")
}

const STALE_PAGE: &str = r#"
<html><head><title>Old Foundation</title></head>
<body>
  <h2>About us</h2>
  <p>Our mission is to support rural schools with library and science grants.</p>
  <img><img><img><img><img><img>
  <footer>© 2009-2012 Old Foundation</footer>
</body></html>
"#;

#[tokio::test]
async fn test_all_transports_failing_yields_fallback_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let proxy = ProxyEndpoint::json("relay", &format!("{}/get?url={{url}}", server.uri()), "contents");
    let client = FallbackClient::new(http_client(), true, vec![proxy]);
    let extractor = WebsiteContextExtractor::new(client);

    let context = extractor
        .extract_website_context(&format!("{}/foundation", server.uri()), Role::Funder)
        .await;

    assert!(!context.accessible);
    assert_eq!(context.confidence, MIN_CONFIDENCE);
    assert_eq!(context.profile, Profile::empty(Role::Funder));
    assert!(context.warnings[0].contains("relay"));
}

#[tokio::test]
async fn test_context_served_through_json_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .and(query_param("url", format!("{}/blocked", server.uri())))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "contents": STALE_PAGE })),
        )
        .mount(&server)
        .await;

    let proxy = ProxyEndpoint::json("relay", &format!("{}/get?url={{url}}", server.uri()), "contents");
    let client = FallbackClient::new(http_client(), true, vec![proxy]);
    let extractor = WebsiteContextExtractor::new(client).with_reference_year(2026);

    let context = extractor
        .extract_website_context(&format!("{}/blocked", server.uri()), Role::Funder)
        .await;

    assert!(context.accessible);
    assert_eq!(context.title, "Old Foundation");
    assert_eq!(context.warnings.len(), 2);
    assert!((0.1..=1.0).contains(&context.confidence));
    // base + about bucket + mission - two warnings
    assert!((context.confidence - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_one_failing_side_does_not_affect_the_other() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lab"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Marine Lab</title></head><body>\
             <h2>Research</h2><p>Our laboratory studies coastal erosion and sediment transport.</p>\
             </body></html>",
        ))
        .mount(&server)
        .await;

    let extractor = WebsiteContextExtractor::new(FallbackClient::new(http_client(), true, vec![]));
    let pair = extractor
        .extract_both_contexts(&format!("{}/gone", server.uri()), &format!("{}/lab", server.uri()))
        .await;

    assert!(!pair.funder.accessible);
    assert_eq!(pair.funder.confidence, MIN_CONFIDENCE);
    assert!(pair.applicant.accessible);
    assert_eq!(pair.applicant.title, "Marine Lab");
    assert_eq!(pair.applicant.profile.role(), Role::Applicant);
}
