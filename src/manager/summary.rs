use crate::crawler::{CrawlPhase, CrawlResult};
use crate::processor::ProcessedBatch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Counts for one source within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub phase: CrawlPhase,
    pub found: usize,
    pub errors: usize,
}

/// Human-readable statistics for one discovery run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub sources: Vec<SourceCount>,
    pub total_found: usize,
    pub processed: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub error_count: usize,
    /// Set when the run aborted
    pub failure: Option<String>,
}

impl RunSummary {
    /// Aggregates crawl results and the processed batch
    ///
    /// Results from the same source and phase are merged into one row, in the
    /// order the source first appeared.
    pub fn build(
        results: &[CrawlResult],
        batch: &ProcessedBatch,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let mut sources: Vec<SourceCount> = Vec::new();
        for result in results {
            match sources
                .iter_mut()
                .find(|s| s.source == result.source && s.phase == result.phase)
            {
                Some(row) => {
                    row.found += result.total_found;
                    row.errors += result.errors.len();
                }
                None => sources.push(SourceCount {
                    source: result.source.clone(),
                    phase: result.phase,
                    found: result.total_found,
                    errors: result.errors.len(),
                }),
            }
        }

        let crawl_errors: usize = results.iter().map(|r| r.errors.len()).sum();

        Self {
            started_at,
            elapsed_ms,
            total_found: results.iter().map(|r| r.total_found).sum(),
            processed: batch.grants.len(),
            duplicates: batch.duplicates.len(),
            invalid: batch.errors.len(),
            error_count: crawl_errors + batch.errors.len(),
            sources,
            failure: None,
        }
    }

    /// Summary of a run that aborted before producing results
    pub fn failed(started_at: DateTime<Utc>, elapsed_ms: u64, message: &str) -> Self {
        Self {
            started_at,
            elapsed_ms,
            sources: Vec::new(),
            total_found: 0,
            processed: 0,
            duplicates: 0,
            invalid: 0,
            error_count: 1,
            failure: Some(message.to_string()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Discovery run started {} ({} ms)",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed_ms
        )?;

        if let Some(failure) = &self.failure {
            return write!(f, "Run failed: {}", failure);
        }

        writeln!(f, "Sources: {}", self.sources.len())?;
        for row in &self.sources {
            writeln!(
                f,
                "  {} [{}]: {} found, {} errors",
                row.source, row.phase, row.found, row.errors
            )?;
        }
        writeln!(f, "Total found: {}", self.total_found)?;
        writeln!(
            f,
            "Processed: {} unique, {} duplicates, {} invalid",
            self.processed, self.duplicates, self.invalid
        )?;
        write!(f, "Errors: {}", self.error_count)
    }
}
