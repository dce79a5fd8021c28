//! HTML parser for listings, search results and links
//!
//! This module handles parsing fetched pages to extract:
//! - Opportunity records from selector-described listings
//! - Search hits from result pages
//! - Links to follow (absolute, http(s) only)
//! - Pagination "next" links
//! - A page-level fallback record when no listing structure is present

use crate::crawler::source::SearchHit;
use crate::crawler::RawOpportunity;
use crate::registry::Selectors;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A resolved link with its anchor text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// Selector set used for pages that have no declared selectors
pub fn generic_selectors() -> Selectors {
    Selectors {
        container: Some(
            "article, .grant, .opportunity, .funding-opportunity, .call-for-proposals, li.grant-item"
                .to_string(),
        ),
        title: Some("h1, h2, h3, h4, .title".to_string()),
        description: Some("p, .description, .summary".to_string()),
        amount: Some(".amount, .award, .funding-amount".to_string()),
        deadline: Some(".deadline, .due-date, .closing-date, time".to_string()),
        funder: Some(".funder, .organization, .agency".to_string()),
        link: Some("a[href]".to_string()),
    }
}

/// Parses opportunity records out of a listing page
///
/// Each element matching `selectors.container` yields at most one record.
/// Missing title or description selectors fall back to the first heading or
/// paragraph inside the container; containers without a title are skipped.
///
/// # Arguments
///
/// * `html` - The page content
/// * `base_url` - URL of the page, for resolving relative links
/// * `selectors` - Extraction hints for this source
/// * `default_funder` - Funder used when no funder selector matches
pub fn parse_listing(
    html: &str,
    base_url: &Url,
    selectors: &Selectors,
    default_funder: &str,
) -> Vec<RawOpportunity> {
    let document = Html::parse_document(html);
    let Some(container) = compile(selectors.container.as_deref()) else {
        return Vec::new();
    };

    let title_sel = compile(selectors.title.as_deref()).or_else(|| compile(Some("h1, h2, h3, h4")));
    let desc_sel = compile(selectors.description.as_deref()).or_else(|| compile(Some("p")));
    let amount_sel = compile(selectors.amount.as_deref());
    let deadline_sel = compile(selectors.deadline.as_deref());
    let funder_sel = compile(selectors.funder.as_deref());
    let link_sel = compile(selectors.link.as_deref()).or_else(|| compile(Some("a[href]")));

    let mut records = Vec::new();
    for element in document.select(&container) {
        let Some(title) = first_text(element, title_sel.as_ref()) else {
            continue;
        };

        let source_url = link_sel
            .as_ref()
            .and_then(|sel| element.select(sel).find_map(|a| a.value().attr("href")))
            .and_then(|href| resolve_link(href, base_url))
            .unwrap_or_else(|| base_url.to_string());

        records.push(RawOpportunity {
            title,
            description: first_text(element, desc_sel.as_ref()).unwrap_or_default(),
            funder: first_text(element, funder_sel.as_ref())
                .unwrap_or_else(|| default_funder.to_string()),
            source_url,
            amount: first_text(element, amount_sel.as_ref()),
            deadline: first_text(element, deadline_sel.as_ref()),
            categories: Vec::new(),
            eligibility: Vec::new(),
        });
    }

    records
}

/// Parses search hits out of a result page
pub fn parse_search_hits(html: &str, base_url: &Url, selectors: &Selectors) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let Some(container) = compile(selectors.container.as_deref()) else {
        return Vec::new();
    };
    let title_sel = compile(selectors.title.as_deref()).or_else(|| compile(Some("h2, h3")));
    let desc_sel = compile(selectors.description.as_deref()).or_else(|| compile(Some("p")));
    let link_sel = compile(selectors.link.as_deref()).or_else(|| compile(Some("a[href]")));

    document
        .select(&container)
        .filter_map(|element| {
            let href = link_sel
                .as_ref()
                .and_then(|sel| element.select(sel).find_map(|a| a.value().attr("href")))?;
            let url = resolve_link(href, base_url)?;
            Some(SearchHit {
                url,
                title: first_text(element, title_sel.as_ref()).unwrap_or_default(),
                description: first_text(element, desc_sel.as_ref()).unwrap_or_default(),
            })
        })
        .collect()
}

/// Extracts every followable link from a page
///
/// # Exclusions
///
/// - `javascript:`, `mailto:`, `tel:`, `data:` hrefs
/// - Fragment-only anchors
/// - `<a download>`
/// - Anything that does not resolve to http(s)
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Link> {
    let document = Html::parse_document(html);
    let Some(anchor) = compile(Some("a[href]")) else {
        return Vec::new();
    };

    document
        .select(&anchor)
        .filter(|a| a.value().attr("download").is_none())
        .filter_map(|a| {
            let url = resolve_link(a.value().attr("href")?, base_url)?;
            Some(Link {
                url,
                text: clean_text(a),
            })
        })
        .collect()
}

/// Finds the pagination "next" link, if any
pub fn next_page_url(html: &str, base_url: &Url, next_selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = compile(Some(next_selector))?;
    document
        .select(&selector)
        .find_map(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(href, base_url))
}

/// Builds a single record from page-level metadata
///
/// Used for deep-crawled pages with no listing structure. Returns None when the
/// page has no usable title or does not read as a funding opportunity.
pub fn page_fallback_opportunity(
    html: &str,
    page_url: &str,
    funder: &str,
) -> Option<RawOpportunity> {
    let document = Html::parse_document(html);

    let title = compile(Some("title"))
        .and_then(|sel| document.select(&sel).next().map(clean_text))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            compile(Some("h1")).and_then(|sel| document.select(&sel).next().map(clean_text))
        })
        .filter(|t| !t.is_empty())?;

    let description = compile(Some(r#"meta[name="description"], meta[property="og:description"]"#))
        .and_then(|sel| {
            document
                .select(&sel)
                .find_map(|m| m.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .filter(|d| !d.is_empty())
        .or_else(|| {
            compile(Some("p")).and_then(|sel| {
                document
                    .select(&sel)
                    .map(clean_text)
                    .find(|p| p.len() >= 40)
            })
        })
        .unwrap_or_default();

    if !crate::crawler::is_relevant(&title, &description) {
        return None;
    }

    Some(RawOpportunity {
        title,
        description,
        funder: funder.to_string(),
        source_url: page_url.to_string(),
        ..RawOpportunity::default()
    })
}

/// Compiles an optional selector, ignoring invalid ones
fn compile(selector: Option<&str>) -> Option<Selector> {
    let raw = selector?.trim();
    if raw.is_empty() {
        return None;
    }
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!("Ignoring invalid selector '{}': {:?}", raw, e);
            None
        }
    }
}

/// Text of the first non-empty match inside an element
fn first_text(element: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    element
        .select(selector?)
        .map(clean_text)
        .find(|t| !t.is_empty())
}

/// Collapses whitespace in an element's text content
fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an href to an absolute http(s) URL, or None if it should be skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
