//! Deduplication of normalized grants
//!
//! Two strategies are available. `ExactTitle` groups records by their
//! normalized title and keeps the first one seen, regardless of funder: it
//! over-merges generic titles and misses reworded duplicates. `Similarity`
//! compares token sets of titles against a threshold and can refuse to merge
//! records from different funders. Both keep the first-seen representative
//! and are idempotent.

use crate::processor::normalize::{normalize_key, ValidatedGrant};
use std::collections::HashSet;

/// How duplicate grants are detected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupStrategy {
    /// Equal after lowercasing and whitespace collapsing
    ExactTitle,
    /// Token-set Jaccard overlap of titles at or above `threshold`
    Similarity { threshold: f64, funder_aware: bool },
}

impl Default for DedupStrategy {
    fn default() -> Self {
        Self::ExactTitle
    }
}

/// Result of a dedup pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub unique: Vec<ValidatedGrant>,
    pub duplicates: Vec<ValidatedGrant>,
}

/// Splits grants into first-seen representatives and duplicates
pub fn dedup(grants: Vec<ValidatedGrant>, strategy: DedupStrategy) -> DedupOutcome {
    match strategy {
        DedupStrategy::ExactTitle => dedup_exact(grants),
        DedupStrategy::Similarity {
            threshold,
            funder_aware,
        } => dedup_similar(grants, threshold, funder_aware),
    }
}

fn dedup_exact(grants: Vec<ValidatedGrant>) -> DedupOutcome {
    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();

    for grant in grants {
        if seen.insert(normalize_key(&grant.title)) {
            outcome.unique.push(grant);
        } else {
            outcome.duplicates.push(grant);
        }
    }

    outcome
}

fn dedup_similar(grants: Vec<ValidatedGrant>, threshold: f64, funder_aware: bool) -> DedupOutcome {
    // (title tokens, normalized funder) of every kept grant
    let mut kept: Vec<(HashSet<String>, String)> = Vec::new();
    let mut outcome = DedupOutcome::default();

    for grant in grants {
        let tokens = title_tokens(&grant.title);
        let funder = normalize_key(&grant.funder);

        let is_duplicate = kept.iter().any(|(kept_tokens, kept_funder)| {
            (!funder_aware || *kept_funder == funder)
                && jaccard(&tokens, kept_tokens) >= threshold
        });

        if is_duplicate {
            outcome.duplicates.push(grant);
        } else {
            kept.push((tokens, funder));
            outcome.unique.push(grant);
        }
    }

    outcome
}

/// Lowercase alphanumeric tokens of a title
pub fn title_tokens(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Token-set overlap in [0, 1]; an empty set is never similar to anything
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}
