//! Markdown report generation
//!
//! This module renders a global crawl outcome as a markdown report with run
//! metadata, per-source counts, the processed grants and any errors.

use crate::manager::CrawlOutcome;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Grants listed in full before the report truncates
const MAX_LISTED_GRANTS: usize = 50;
/// Errors listed in full before the report truncates
const MAX_LISTED_ERRORS: usize = 20;

/// Writes a markdown report for a crawl outcome
///
/// # Arguments
///
/// * `outcome` - The outcome of a global crawl
/// * `config_hash` - Hash of the configuration the run used
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(
    outcome: &CrawlOutcome,
    config_hash: &str,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(outcome, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote crawl report to {}", output_path.display());
    Ok(())
}

/// Formats a crawl outcome as markdown
pub fn format_markdown_report(outcome: &CrawlOutcome, config_hash: &str) -> String {
    let summary = &outcome.summary;
    let mut md = String::new();

    md.push_str("# Grant Scout Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Duration**: {} ms ({:.2} seconds)\n",
        summary.elapsed_ms,
        summary.elapsed_ms as f64 / 1000.0
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if outcome.success { "completed" } else { "failed" }
    ));
    md.push_str(&format!("- **Config Hash**: {}\n\n", config_hash));

    if let Some(failure) = &summary.failure {
        md.push_str("## Failure\n\n");
        md.push_str(&format!("{}\n", failure));
        return md;
    }

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Raw Records**: {}\n", outcome.total_grants));
    md.push_str(&format!("- **Total Found**: {}\n", summary.total_found));
    md.push_str(&format!(
        "- **Processed Grants**: {}\n",
        outcome.processed_grants.len()
    ));
    md.push_str(&format!("- **Duplicates**: {}\n", summary.duplicates));
    md.push_str(&format!("- **Invalid Records**: {}\n", summary.invalid));
    md.push_str(&format!("- **Errors**: {}\n\n", summary.error_count));

    if !summary.sources.is_empty() {
        md.push_str("## Sources\n\n");
        md.push_str("| Source | Phase | Found | Errors |\n");
        md.push_str("|--------|-------|-------|--------|\n");
        for row in &summary.sources {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&row.source),
                row.phase,
                row.found,
                row.errors
            ));
        }
        md.push('\n');
    }

    if !outcome.processed_grants.is_empty() {
        md.push_str("## Grants\n\n");
        md.push_str("| Title | Funder | Region | Deadline | Amount |\n");
        md.push_str("|-------|--------|--------|----------|--------|\n");
        for grant in outcome.processed_grants.iter().take(MAX_LISTED_GRANTS) {
            md.push_str(&format!(
                "| [{}]({}) | {} | {} | {} | {} |\n",
                escape_cell(&grant.title),
                grant.source_url,
                escape_cell(&grant.funder),
                grant.region,
                grant.deadline.as_deref().unwrap_or("-"),
                grant.amount.as_deref().map(escape_cell).unwrap_or_else(|| "-".to_string()),
            ));
        }
        if outcome.processed_grants.len() > MAX_LISTED_GRANTS {
            md.push_str(&format!(
                "\n... and {} more\n",
                outcome.processed_grants.len() - MAX_LISTED_GRANTS
            ));
        }
        md.push_str("\nRatings and review counts are placeholders and are not shown.\n\n");
    }

    if !outcome.errors.is_empty() {
        md.push_str("## Errors\n\n");
        for error in outcome.errors.iter().take(MAX_LISTED_ERRORS) {
            md.push_str(&format!("- {}\n", error));
        }
        if outcome.errors.len() > MAX_LISTED_ERRORS {
            md.push_str(&format!(
                "\n... and {} more\n",
                outcome.errors.len() - MAX_LISTED_ERRORS
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
