//! Structured context extraction from funder and applicant websites
//!
//! This module fetches an arbitrary website through the fallback chain and
//! turns it into a [`WebsiteContext`]: title, mission, role-specific facts,
//! contact details, quality warnings and a confidence score. Extraction never
//! fails; an unreachable site yields a low-confidence placeholder context.

mod facts;
mod quality;

pub use facts::{looks_like_code, ExtractedFacts, FactExtractor, HeuristicFactExtractor};
pub use quality::{detect_warnings, score_confidence, BROKEN_IMAGE_THRESHOLD, MIN_CONFIDENCE};

use crate::config::Config;
use crate::fetch::FallbackClient;
use crate::url::extract_domain;
use crate::DiscoveryError;
use chrono::{DateTime, Datelike, Utc};
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which side of a funding relationship a website represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Funder,
    Applicant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Funder => f.write_str("funder"),
            Self::Applicant => f.write_str("applicant"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "funder" => Ok(Self::Funder),
            "applicant" => Ok(Self::Applicant),
            other => Err(format!("unknown role '{}', expected funder or applicant", other)),
        }
    }
}

/// Facts describing a funding organisation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunderInfo {
    pub about: Vec<String>,
    pub past_fundings: Vec<String>,
    pub funding_priorities: Vec<String>,
}

/// Facts describing an organisation seeking funding
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicantInfo {
    pub research_capabilities: Vec<String>,
    pub track_record: Vec<String>,
    pub resources: Vec<String>,
}

/// Role-specific part of a context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Funder(FunderInfo),
    Applicant(ApplicantInfo),
}

impl Profile {
    /// An empty profile for the given role
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Funder => Self::Funder(FunderInfo::default()),
            Role::Applicant => Self::Applicant(ApplicantInfo::default()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Funder(_) => Role::Funder,
            Self::Applicant(_) => Role::Applicant,
        }
    }

    /// Number of non-empty fact buckets
    pub fn populated_buckets(&self) -> usize {
        let buckets: [&Vec<String>; 3] = match self {
            Self::Funder(info) => [&info.about, &info.past_fundings, &info.funding_priorities],
            Self::Applicant(info) => [
                &info.research_capabilities,
                &info.track_record,
                &info.resources,
            ],
        };
        buckets.iter().filter(|b| !b.is_empty()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactInfo {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.address.is_none()
    }
}

/// Structured description of one website
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebsiteContext {
    pub url: String,
    /// False when no transport could retrieve the site
    pub accessible: bool,
    pub title: String,
    pub mission: Option<String>,
    pub key_info: Vec<String>,
    pub profile: Profile,
    pub contact_info: ContactInfo,
    pub warnings: Vec<String>,
    /// Heuristic score in [0.1, 1.0]
    pub confidence: f64,
    pub extracted_at: DateTime<Utc>,
}

/// Contexts for a funder and an applicant extracted side by side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPair {
    pub funder: WebsiteContext,
    pub applicant: WebsiteContext,
}

/// Fetches websites and extracts structured context from them
#[derive(Clone)]
pub struct WebsiteContextExtractor {
    client: FallbackClient,
    facts: Arc<dyn FactExtractor>,
    reference_year: Option<i32>,
}

impl fmt::Debug for WebsiteContextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebsiteContextExtractor")
            .field("client", &self.client)
            .field("reference_year", &self.reference_year)
            .finish_non_exhaustive()
    }
}

impl WebsiteContextExtractor {
    /// Creates an extractor using the keyword heuristics
    pub fn new(client: FallbackClient) -> Self {
        Self::with_fact_extractor(client, Arc::new(HeuristicFactExtractor))
    }

    /// Creates an extractor sharing the crawler's fetch configuration
    pub fn from_config(config: &Config) -> Result<Self, DiscoveryError> {
        Ok(Self::new(FallbackClient::from_config(config)?))
    }

    pub fn with_fact_extractor(client: FallbackClient, facts: Arc<dyn FactExtractor>) -> Self {
        Self {
            client,
            facts,
            reference_year: None,
        }
    }

    /// Pins the year stale copyright notices are measured against
    ///
    /// Defaults to the current UTC year.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Fetches a website and extracts its context
    ///
    /// A URL without a scheme is treated as `https://`. When every transport
    /// fails the returned context has `accessible == false`, a single warning
    /// carrying the fetch error and the minimum confidence.
    pub async fn extract_website_context(&self, url: &str, role: Role) -> WebsiteContext {
        let target = with_scheme(url);
        tracing::info!("Extracting {} context from {}", role, target);

        match self.client.fetch(&target).await {
            Ok(page) => self.analyze(&target, &page.content, role),
            Err(e) => {
                tracing::warn!("Could not fetch {} for context extraction: {}", target, e);
                fallback_context(&target, role, &e.to_string())
            }
        }
    }

    /// Extracts a funder and an applicant context concurrently
    pub async fn extract_both_contexts(&self, funder_url: &str, applicant_url: &str) -> ContextPair {
        let (funder, applicant) = tokio::join!(
            self.extract_website_context(funder_url, Role::Funder),
            self.extract_website_context(applicant_url, Role::Applicant),
        );
        ContextPair { funder, applicant }
    }

    /// Builds a context from already fetched HTML
    pub fn analyze(&self, url: &str, html: &str, role: Role) -> WebsiteContext {
        let document = Html::parse_document(html);
        let facts = self.facts.extract(&document, role);
        let reference_year = self.reference_year.unwrap_or_else(|| Utc::now().year());
        let warnings = detect_warnings(&document, reference_year);

        let confidence = score_confidence(
            facts.profile.populated_buckets(),
            facts.mission.is_some(),
            !facts.contact.is_empty(),
            warnings.len(),
        );

        tracing::debug!(
            "Context for {}: {} buckets, {} warnings, confidence {:.2}",
            url,
            facts.profile.populated_buckets(),
            warnings.len(),
            confidence
        );

        WebsiteContext {
            url: url.to_string(),
            accessible: true,
            title: facts.title.unwrap_or_else(|| host_label(url)),
            mission: facts.mission,
            key_info: facts.key_info,
            profile: facts.profile,
            contact_info: facts.contact,
            warnings,
            confidence,
            extracted_at: Utc::now(),
        }
    }
}

fn fallback_context(url: &str, role: Role, error: &str) -> WebsiteContext {
    WebsiteContext {
        url: url.to_string(),
        accessible: false,
        title: host_label(url),
        mission: None,
        key_info: Vec::new(),
        profile: Profile::empty(role),
        contact_info: ContactInfo::default(),
        warnings: vec![format!("Website could not be fetched: {}", error)],
        confidence: MIN_CONFIDENCE,
        extracted_at: Utc::now(),
    }
}

fn with_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn host_label(url: &str) -> String {
    ::url::Url::parse(url)
        .ok()
        .and_then(|u| extract_domain(&u))
        .map(|host| host.trim_start_matches("www.").to_string())
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ProxyEndpoint;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><head><title>Harbor Trust</title></head>
        <body>
          <h2>Our mission</h2>
          <p>Our mission is to fund maritime heritage projects along the coast.</p>
          <h2>Recent grantees</h2>
          <p>Awarded a restoration grant to the Lighthouse Keepers Society.</p>
          <a href="mailto:grants@harbortrust.org">Contact</a>
        </body></html>
    "#;

    fn client(direct: bool, proxies: Vec<ProxyEndpoint>) -> FallbackClient {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        FallbackClient::new(http, direct, proxies)
    }

    #[test]
    fn test_analyze_scores_populated_context() {
        let extractor = WebsiteContextExtractor::new(client(true, vec![])).with_reference_year(2026);
        let context = extractor.analyze("https://harbortrust.org", PAGE, Role::Funder);

        assert!(context.accessible);
        assert_eq!(context.title, "Harbor Trust");
        assert_eq!(context.profile.role(), Role::Funder);
        assert_eq!(context.profile.populated_buckets(), 2);
        assert_eq!(context.contact_info.emails, vec!["grants@harbortrust.org".to_string()]);
        assert!(context.warnings.is_empty());
        // base + two buckets + mission + contact
        assert!((context.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_title_falls_back_to_host() {
        let extractor = WebsiteContextExtractor::new(client(true, vec![]));
        let context = extractor.analyze("https://www.empty.org/", "<html><body></body></html>", Role::Applicant);
        assert_eq!(context.title, "empty.org");
        assert_eq!(context.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_extract_website_context_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let extractor = WebsiteContextExtractor::new(client(true, vec![])).with_reference_year(2026);
        let context = extractor
            .extract_website_context(&format!("{}/", server.uri()), Role::Funder)
            .await;

        assert!(context.accessible);
        assert_eq!(context.title, "Harbor Trust");
    }

    #[tokio::test]
    async fn test_unreachable_site_yields_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let extractor = WebsiteContextExtractor::new(client(true, vec![]));
        let context = extractor
            .extract_website_context(&format!("{}/down", server.uri()), Role::Applicant)
            .await;

        assert!(!context.accessible);
        assert_eq!(context.confidence, MIN_CONFIDENCE);
        assert_eq!(context.warnings.len(), 1);
        assert!(context.warnings[0].starts_with("Website could not be fetched"));
        assert_eq!(context.profile, Profile::empty(Role::Applicant));
    }

    #[tokio::test]
    async fn test_extract_both_contexts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/funder"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let extractor = WebsiteContextExtractor::new(client(true, vec![]));
        let pair = extractor
            .extract_both_contexts(
                &format!("{}/funder", server.uri()),
                &format!("{}/missing", server.uri()),
            )
            .await;

        assert!(pair.funder.accessible);
        assert_eq!(pair.funder.profile.role(), Role::Funder);
        assert!(!pair.applicant.accessible);
        assert_eq!(pair.applicant.profile.role(), Role::Applicant);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Funder".parse::<Role>(), Ok(Role::Funder));
        assert_eq!("applicant".parse::<Role>(), Ok(Role::Applicant));
        assert!("donor".parse::<Role>().is_err());
    }

    #[test]
    fn test_with_scheme() {
        assert_eq!(with_scheme("fund.org"), "https://fund.org");
        assert_eq!(with_scheme(" http://fund.org "), "http://fund.org");
    }
}
