//! Output module for crawl reports and grant exports
//!
//! This module handles:
//! - Generating markdown reports of global crawls
//! - Exporting processed grants as JSON

mod markdown;

pub use markdown::{format_markdown_report, write_markdown_report};

use crate::processor::ValidatedGrant;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes processed grants as a pretty-printed JSON array
///
/// # Arguments
///
/// * `grants` - The grants to export
/// * `output_path` - Destination file, created or truncated
pub fn write_grants_json(grants: &[ValidatedGrant], output_path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, grants)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Exported {} grants to {}", grants.len(), output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::RawOpportunity;
    use crate::processor::normalize;
    use tempfile::TempDir;

    #[test]
    fn test_write_grants_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grants.json");
        let grant = normalize(
            &RawOpportunity {
                title: "Arts Grant".to_string(),
                description: "Funding for artists".to_string(),
                funder: "Arts Council".to_string(),
                source_url: "https://artscouncil.ie/grants".to_string(),
                ..RawOpportunity::default()
            },
            "Arts Council",
        );

        write_grants_json(&[grant.clone()], &path).unwrap();

        let written: Vec<ValidatedGrant> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, vec![grant]);
        assert_eq!(written[0].region, "Ireland");
        assert_eq!(written[0].synthetic_fields, vec!["rating", "review_count"]);
    }
}
