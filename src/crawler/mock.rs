//! Deterministic stand-in for real scraping
//!
//! Generates templated opportunity records from target metadata so runs can
//! be demonstrated and tested without any network traffic. The same inputs
//! always produce the same records (deadlines are relative to today).

use crate::crawler::source::{SearchHit, SourcePage};
use crate::crawler::RawOpportunity;
use crate::registry::{CrawlTarget, SourceType};
use crate::url::extract_domain;
use crate::{DiscoveryError, UrlError};
use chrono::{Duration, Utc};
use url::Url;

const AMOUNTS: &[&str] = &["$25,000", "$50,000 - $150,000", "€100,000", "$5,000 - $20,000"];

/// Templated source fetcher
#[derive(Debug, Clone)]
pub struct MockSource {
    records_per_source: usize,
    aux_urls_per_source: usize,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            records_per_source: 3,
            aux_urls_per_source: 2,
        }
    }
}

impl MockSource {
    pub fn new(records_per_source: usize, aux_urls_per_source: usize) -> Self {
        Self {
            records_per_source,
            aux_urls_per_source,
        }
    }

    /// Produces sample records and auxiliary same-domain URLs for a target
    pub fn crawl_source(&self, target: &CrawlTarget) -> SourcePage {
        let themes = themes_for(target.source_type);
        let base = Url::parse(&target.base_url).ok();

        let grants = (0..self.records_per_source)
            .map(|i| {
                let theme = themes[i % themes.len()];
                let source_url = base
                    .as_ref()
                    .and_then(|b| b.join(&format!("opportunity/{}", i + 1)).ok())
                    .map(String::from)
                    .unwrap_or_else(|| target.base_url.clone());
                RawOpportunity {
                    title: format!("{} {}", target.name, theme.0),
                    description: format!(
                        "{} offers funding for {}. Registered nonprofit organizations are eligible to apply.",
                        target.name, theme.1
                    ),
                    funder: target.name.clone(),
                    source_url,
                    amount: Some(AMOUNTS[i % AMOUNTS.len()].to_string()),
                    deadline: Some(deadline_in_days(30 * (i as i64 + 1))),
                    categories: vec![theme.2.to_string()],
                    eligibility: vec!["Registered nonprofit organizations".to_string()],
                }
            })
            .collect();

        let aux_urls = match &base {
            Some(b) => ["funding/open-calls", "grants/archive", "programmes/current"]
                .iter()
                .take(self.aux_urls_per_source)
                .filter_map(|path| b.join(&format!("/{}", path)).ok())
                .map(String::from)
                .collect(),
            None => Vec::new(),
        };

        SourcePage {
            grants,
            aux_urls,
            errors: Vec::new(),
        }
    }

    /// Produces simulated search results; every third hit is off-topic
    pub fn search(&self, target: &CrawlTarget, query: &str, limit: usize) -> Vec<SearchHit> {
        let slug = slug(query);
        (0..limit)
            .map(|i| {
                let url = format!("https://{}.example.org/opportunities/{}-{}", slug, target.id, i);
                if i % 3 == 2 {
                    SearchHit {
                        url,
                        title: format!("Weekly sector news roundup {}", i),
                        description: "Commentary and analysis for readers.".to_string(),
                    }
                } else {
                    SearchHit {
                        url,
                        title: format!("{} ({})", capitalize(query), i),
                        description: "Grant funding for nonprofit organizations. Eligible applicants can apply online."
                            .to_string(),
                    }
                }
            })
            .collect()
    }

    /// Produces one record for a discovered page, derived from its URL
    pub fn extract_page(&self, url: &str) -> Result<Vec<RawOpportunity>, DiscoveryError> {
        let parsed = Url::parse(url)?;
        let host = extract_domain(&parsed).ok_or(UrlError::MissingDomain)?;
        let segment = parsed
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("home");

        Ok(vec![RawOpportunity {
            title: format!("{} at {}", capitalize(&segment.replace(['-', '_'], " ")), host),
            description: format!(
                "Open call published on {}. Civil society organizations are eligible to apply.",
                host
            ),
            funder: host.trim_start_matches("www.").to_string(),
            source_url: url.to_string(),
            deadline: Some(deadline_in_days(45)),
            ..RawOpportunity::default()
        }])
    }
}

/// (title suffix, purpose, category) per source type
fn themes_for(source_type: SourceType) -> &'static [(&'static str, &'static str, &'static str)] {
    match source_type {
        SourceType::Government => &[
            ("Community Development Grant", "local community development projects", "community"),
            ("Rural Capacity Building Program", "capacity building in rural areas", "rural"),
            ("Public Health Innovation Award", "public health innovation", "health"),
        ],
        SourceType::Eu => &[
            ("Civil Society Call for Proposals", "cross-border civil society cooperation", "civil-society"),
            ("Green Transition Action Grant", "climate and green transition actions", "environment"),
            ("Digital Inclusion Programme", "digital skills and inclusion", "digital"),
        ],
        SourceType::Foundation => &[
            ("Education Equity Fund", "education equity initiatives", "education"),
            ("Arts and Culture Grant", "arts and culture projects", "arts"),
            ("Human Rights Defenders Fund", "human rights defenders", "human-rights"),
        ],
        SourceType::Private | SourceType::SearchEngine => &[
            ("Social Impact Accelerator", "early-stage social enterprises", "social-impact"),
            ("Employee Giving Match", "grassroots charities", "community"),
            ("Disaster Relief Fund", "disaster relief and recovery", "humanitarian"),
        ],
    }
}

fn deadline_in_days(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
