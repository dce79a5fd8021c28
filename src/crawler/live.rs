//! Live source fetcher
//!
//! Fetches listing pages, search result pages and discovered pages through the
//! fallback client and parses them with `scraper`.

use crate::crawler::parser::{
    extract_links, generic_selectors, next_page_url, page_fallback_opportunity, parse_listing,
    parse_search_hits,
};
use crate::crawler::relevance::looks_like_funding_link;
use crate::crawler::source::{SearchHit, SourcePage};
use crate::crawler::RawOpportunity;
use crate::fetch::FallbackClient;
use crate::registry::CrawlTarget;
use crate::url::{extract_domain, is_same_site, url_key};
use crate::DiscoveryError;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Maximum auxiliary URLs collected from one source
const MAX_AUX_URLS: usize = 10;

/// Source fetcher backed by real HTTP traffic
#[derive(Debug, Clone)]
pub struct LiveSource {
    client: FallbackClient,
}

impl LiveSource {
    pub fn new(client: FallbackClient) -> Self {
        Self { client }
    }

    /// Crawls a target's listing, following pagination when declared
    ///
    /// A failure on the first page is returned as an error; failures on later
    /// pages are recorded in `SourcePage::errors` and stop pagination.
    pub async fn crawl_source(&self, target: &CrawlTarget) -> Result<SourcePage, DiscoveryError> {
        let max_pages = target.pagination.as_ref().map_or(1, |p| p.max_pages.max(1));
        let mut page_url = target.base_url.clone();
        let mut result = SourcePage::default();

        for page_index in 0..max_pages {
            let fetched = match self.client.fetch(&page_url).await {
                Ok(fetched) => fetched,
                Err(e) if page_index == 0 => return Err(e.into()),
                Err(e) => {
                    result.errors.push(format!("Page {} of {}: {}", page_index + 1, target.name, e));
                    break;
                }
            };

            let base = Url::parse(&page_url)?;
            let mut grants = parse_listing(&fetched.content, &base, &target.selectors, &target.name);
            tracing::debug!(
                "{}: page {} yielded {} records",
                target.name,
                page_index + 1,
                grants.len()
            );
            result.grants.append(&mut grants);

            if page_index == 0 {
                result.aux_urls = auxiliary_urls(&fetched.content, &base);
            }

            let next = target
                .pagination
                .as_ref()
                .and_then(|p| next_page_url(&fetched.content, &base, &p.next_selector));
            match next {
                Some(next) if page_index + 1 < max_pages => {
                    page_url = next;
                    tokio::time::sleep(Duration::from_millis(target.rate_limit_ms)).await;
                }
                _ => break,
            }
        }

        Ok(result)
    }

    /// Runs a query against a search target's result page
    pub async fn search(
        &self,
        target: &CrawlTarget,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, DiscoveryError> {
        let url = search_url(&target.base_url, query)?;
        let fetched = self.client.fetch(&url).await?;
        let base = Url::parse(&url)?;

        let mut hits = parse_search_hits(&fetched.content, &base, &target.selectors);
        hits.truncate(limit);
        Ok(hits)
    }

    /// Extracts opportunities from a discovered page
    ///
    /// Tries the generic listing selectors first and falls back to a single
    /// page-level record when the page has no listing structure.
    pub async fn extract_page(&self, url: &str) -> Result<Vec<RawOpportunity>, DiscoveryError> {
        let fetched = self.client.fetch(url).await?;
        let base = Url::parse(url)?;
        let funder = extract_domain(&base)
            .map(|d| d.trim_start_matches("www.").to_string())
            .unwrap_or_default();

        let records = parse_listing(&fetched.content, &base, &generic_selectors(), &funder);
        if !records.is_empty() {
            return Ok(records);
        }

        Ok(page_fallback_opportunity(&fetched.content, url, &funder)
            .into_iter()
            .collect())
    }
}

/// Builds a search request URL from a target's base URL
///
/// A `{query}` placeholder is replaced with the encoded query; otherwise a `q`
/// parameter is appended.
pub(crate) fn search_url(base_url: &str, query: &str) -> Result<String, DiscoveryError> {
    if base_url.contains("{query}") {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        return Ok(base_url.replace("{query}", &encoded));
    }

    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(url.into())
}

/// Same-site links that look like funding pages, deduplicated and capped
fn auxiliary_urls(html: &str, base: &Url) -> Vec<String> {
    let own_key = url_key(base.as_str());
    let mut seen = HashSet::new();

    extract_links(html, base)
        .into_iter()
        .filter(|link| {
            Url::parse(&link.url)
                .map(|u| is_same_site(&u, base))
                .unwrap_or(false)
        })
        .filter(|link| looks_like_funding_link(&link.url, &link.text))
        .filter(|link| {
            let key = url_key(&link.url);
            key.is_some() && key != own_key && seen.insert(key)
        })
        .map(|link| link.url)
        .take(MAX_AUX_URLS)
        .collect()
}
