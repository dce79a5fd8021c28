use crate::crawler::RawOpportunity;
use crate::url::infer_region;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fields filled with synthetic placeholder values by [`normalize`]
///
/// Consumers must not present these as real data.
pub const SYNTHETIC_FIELDS: &[&str] = &["rating", "review_count"];

/// Lifecycle status of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Open,
    Closed,
}

/// A raw record that passed validation and normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedGrant {
    /// Hex SHA-256 of the normalized (title, funder) pair
    pub id: String,
    pub title: String,
    pub description: String,
    pub funder: String,
    pub source_url: String,
    /// Source name the record was crawled from
    pub origin: String,
    pub amount: Option<String>,
    pub deadline: Option<String>,
    pub categories: Vec<String>,
    pub eligibility: Vec<String>,
    pub status: GrantStatus,
    pub region: String,
    /// Synthetic, see `synthetic_fields`
    pub rating: f32,
    /// Synthetic, see `synthetic_fields`
    pub review_count: u32,
    pub synthetic_fields: Vec<String>,
}

/// Fills defaults and cleans up a raw record
///
/// Whitespace is collapsed in every text field, status defaults to open, the
/// region is inferred from the source URL, and categories default to
/// `general`. Rating and review count are deterministic filler derived from the
/// identity and are listed in `synthetic_fields`.
pub fn normalize(raw: &RawOpportunity, origin: &str) -> ValidatedGrant {
    let title = collapse(&raw.title);
    let funder = collapse(&raw.funder);
    let id = grant_identity(&title, &funder);

    let mut categories: Vec<String> = raw
        .categories
        .iter()
        .map(|c| collapse(c).to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    categories.dedup();
    if categories.is_empty() {
        categories.push("general".to_string());
    }

    let (rating, review_count) = synthetic_reviews(&id);

    ValidatedGrant {
        title,
        description: collapse(&raw.description),
        funder,
        source_url: raw.source_url.trim().to_string(),
        origin: origin.to_string(),
        amount: non_blank(raw.amount.as_deref()),
        deadline: non_blank(raw.deadline.as_deref()),
        categories,
        eligibility: raw
            .eligibility
            .iter()
            .map(|e| collapse(e))
            .filter(|e| !e.is_empty())
            .collect(),
        status: GrantStatus::Open,
        region: infer_region(&raw.source_url).to_string(),
        rating,
        review_count,
        synthetic_fields: SYNTHETIC_FIELDS.iter().map(|f| f.to_string()).collect(),
        id,
    }
}

/// Lowercases and collapses whitespace; the key used for title comparison
pub fn normalize_key(text: &str) -> String {
    collapse(text).to_lowercase()
}

/// Stable identity of a grant from its title and funder
pub fn grant_identity(title: &str, funder: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_key(title).as_bytes());
    hasher.update([0u8]);
    hasher.update(normalize_key(funder).as_bytes());
    hex::encode(hasher.finalize())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(collapse).filter(|v| !v.is_empty())
}

/// Rating in [3.5, 5.0] and a review count in [5, 104], derived from the id
fn synthetic_reviews(id: &str) -> (f32, u32) {
    let seed = u32::from_str_radix(&id[..8.min(id.len())], 16).unwrap_or(0);
    let rating = 3.5 + (seed % 16) as f32 / 10.0;
    let review_count = 5 + (seed / 16) % 100;
    (rating, review_count)
}
