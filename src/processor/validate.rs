use crate::crawler::RawOpportunity;
use serde::Serialize;

/// Outcome of schema validation for one raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Checks the minimal required fields: title, description and funder must be non-blank
pub fn validate(raw: &RawOpportunity) -> ValidationReport {
    let mut errors = Vec::new();

    if raw.title.trim().is_empty() {
        errors.push("title is required".to_string());
    }
    if raw.description.trim().is_empty() {
        errors.push("description is required".to_string());
    }
    if raw.funder.trim().is_empty() {
        errors.push("funder is required".to_string());
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}
