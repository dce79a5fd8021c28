//! Data processor for crawled opportunities
//!
//! This module turns raw crawl output into catalog-ready grants:
//! - Schema validation of required fields
//! - Normalization and default filling
//! - Deduplication by title (exact or similarity-based)

mod dedup;
mod normalize;
mod validate;

pub use dedup::{dedup, jaccard, title_tokens, DedupOutcome, DedupStrategy};
pub use normalize::{
    grant_identity, normalize, normalize_key, GrantStatus, ValidatedGrant, SYNTHETIC_FIELDS,
};
pub use validate::{validate, ValidationReport};

use crate::config::{DedupMode, ProcessorConfig};
use crate::crawler::CrawlResult;

/// Output of processing one run's crawl results
#[derive(Debug, Clone, Default)]
pub struct ProcessedBatch {
    /// Validated, normalized, deduplicated grants in crawl order
    pub grants: Vec<ValidatedGrant>,
    pub duplicates: Vec<ValidatedGrant>,
    /// One entry per dropped record
    pub errors: Vec<String>,
    /// Raw records seen before validation
    pub total_raw: usize,
}

/// Validates, normalizes and deduplicates raw opportunities
#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    strategy: DedupStrategy,
}

impl DataProcessor {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        let strategy = match config.dedup {
            DedupMode::Exact => DedupStrategy::ExactTitle,
            DedupMode::Similarity => DedupStrategy::Similarity {
                threshold: config.similarity_threshold,
                funder_aware: config.funder_aware,
            },
        };
        Self::new(strategy)
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    /// Runs validate, normalize and dedup over every record of every result
    pub fn process(&self, results: &[CrawlResult]) -> ProcessedBatch {
        let mut batch = ProcessedBatch::default();
        let mut normalized = Vec::new();

        for result in results {
            for raw in &result.grants {
                batch.total_raw += 1;
                let report = validate(raw);
                if !report.is_valid {
                    let label = if raw.title.trim().is_empty() {
                        raw.source_url.as_str()
                    } else {
                        raw.title.as_str()
                    };
                    tracing::debug!("Dropping invalid record '{}': {:?}", label, report.errors);
                    batch.errors.push(format!(
                        "Invalid record '{}' from {}: {}",
                        label,
                        result.source,
                        report.errors.join(", ")
                    ));
                    continue;
                }
                normalized.push(normalize(raw, &result.source));
            }
        }

        let outcome = dedup(normalized, self.strategy);
        tracing::info!(
            "Processed {} raw records: {} unique, {} duplicates, {} invalid",
            batch.total_raw,
            outcome.unique.len(),
            outcome.duplicates.len(),
            batch.errors.len()
        );
        batch.grants = outcome.unique;
        batch.duplicates = outcome.duplicates;
        batch
    }
}
