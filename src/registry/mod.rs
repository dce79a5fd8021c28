//! Source registry
//!
//! This module holds the declarative catalog of funding sources and search
//! targets the crawl engine knows how to query. Targets are created from the
//! built-in defaults, from configuration, or through `add_custom_source`; the
//! only fields mutated afterwards are `is_active` and `last_crawled`.

mod defaults;

pub use defaults::default_targets;

use crate::DiscoveryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source a target represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Government,
    Eu,
    Foundation,
    Private,
    SearchEngine,
}

impl SourceType {
    /// Returns true for targets queried in the search-discovery phase
    pub fn is_search(&self) -> bool {
        matches!(self, Self::SearchEngine)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Government => "government",
            Self::Eu => "eu",
            Self::Foundation => "foundation",
            Self::Private => "private",
            Self::SearchEngine => "search_engine",
        };
        f.write_str(label)
    }
}

/// Named CSS selectors used to pull opportunity fields out of a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub funder: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl Selectors {
    /// Selector set for a typical card-style listing
    pub fn listing(container: &str, title: &str, description: &str, link: &str) -> Self {
        Self {
            container: Some(container.to_string()),
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            link: Some(link.to_string()),
            ..Self::default()
        }
    }
}

/// Pagination hints for multi-page listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    /// Selector of the "next page" anchor
    pub next_selector: String,
    pub max_pages: u32,
}

/// A declared source the engine can crawl or query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlTarget {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    pub source_type: SourceType,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_active", rename = "active")]
    pub is_active: bool,
    #[serde(default, skip_deserializing)]
    pub last_crawled: Option<DateTime<Utc>>,
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_active() -> bool {
    true
}

impl CrawlTarget {
    /// Creates an active target with the default rate limit
    pub fn new(
        id: &str,
        name: &str,
        base_url: &str,
        source_type: SourceType,
        selectors: Selectors,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            search_queries: Vec::new(),
            source_type,
            selectors,
            pagination: None,
            rate_limit_ms: default_rate_limit_ms(),
            is_active: true,
            last_crawled: None,
        }
    }

    pub fn with_queries(mut self, queries: &[&str]) -> Self {
        self.search_queries = queries.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn with_rate_limit(mut self, rate_limit_ms: u64) -> Self {
        self.rate_limit_ms = rate_limit_ms;
        self
    }

    pub fn with_pagination(mut self, next_selector: &str, max_pages: u32) -> Self {
        self.pagination = Some(Pagination {
            next_selector: next_selector.to_string(),
            max_pages,
        });
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Catalog of crawl targets
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    targets: Vec<CrawlTarget>,
}

impl SourceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the built-in funding sources
    pub fn with_defaults() -> Self {
        Self {
            targets: default_targets(),
        }
    }

    /// Creates a registry from declared targets, falling back to defaults when empty
    pub fn from_targets(targets: Vec<CrawlTarget>) -> Self {
        if targets.is_empty() {
            Self::with_defaults()
        } else {
            Self { targets }
        }
    }

    /// Adds a target, rejecting duplicate ids
    pub fn add(&mut self, target: CrawlTarget) -> Result<(), DiscoveryError> {
        if self.get(&target.id).is_some() {
            return Err(DiscoveryError::Registry(format!(
                "Source '{}' already exists",
                target.id
            )));
        }
        tracing::debug!("Registered source {} ({})", target.id, target.source_type);
        self.targets.push(target);
        Ok(())
    }

    /// Adds a private source declared at runtime and returns its id
    ///
    /// The id is derived from the name and made unique within the registry.
    pub fn add_custom_source(
        &mut self,
        name: &str,
        url: &str,
        selectors: Selectors,
    ) -> Result<String, DiscoveryError> {
        let parsed = ::url::Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(crate::UrlError::InvalidScheme(parsed.scheme().to_string()).into());
        }

        let base = slugify(name);
        let base = if base.is_empty() { "custom".to_string() } else { base };
        let mut id = format!("custom-{}", base);
        let mut suffix = 2;
        while self.get(&id).is_some() {
            id = format!("custom-{}-{}", base, suffix);
            suffix += 1;
        }

        let target = CrawlTarget::new(&id, name, url, SourceType::Private, selectors);
        self.add(target)?;
        tracing::info!("Added custom source '{}' as {}", name, id);
        Ok(id)
    }

    /// Removes a target, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<CrawlTarget> {
        let index = self.targets.iter().position(|t| t.id == id)?;
        Some(self.targets.remove(index))
    }

    /// Activates or deactivates a target; returns false if the id is unknown
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Stamps the time a target was last crawled
    pub fn mark_crawled(&mut self, id: &str, at: DateTime<Utc>) {
        if let Some(target) = self.targets.iter_mut().find(|t| t.id == id) {
            target.last_crawled = Some(at);
        }
    }

    pub fn get(&self, id: &str) -> Option<&CrawlTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[CrawlTarget] {
        &self.targets
    }

    /// Active targets crawled in the known-source phase
    pub fn active_known_sources(&self) -> Vec<CrawlTarget> {
        self.targets
            .iter()
            .filter(|t| t.is_active && !t.source_type.is_search())
            .cloned()
            .collect()
    }

    /// Active targets queried in the search-discovery phase
    pub fn active_search_targets(&self) -> Vec<CrawlTarget> {
        self.targets
            .iter()
            .filter(|t| t.is_active && t.source_type.is_search())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Lowercases and replaces runs of non-alphanumerics with single hyphens
fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
