//! Site quality warnings and confidence scoring

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Images without a usable source above this count produce a warning
pub const BROKEN_IMAGE_THRESHOLD: usize = 3;

/// Confidence of a context whose site could not be read
pub const MIN_CONFIDENCE: f64 = 0.1;

const BASE_CONFIDENCE: f64 = 0.5;

/// Inspects a document for signs of a stale or broken site
///
/// A copyright notice whose latest year is more than one year before
/// `reference_year` is reported, as is a page with more than
/// [`BROKEN_IMAGE_THRESHOLD`] images lacking a `src`.
pub fn detect_warnings(document: &Html, reference_year: i32) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(year) = latest_copyright_year(document) {
        if year < reference_year - 1 {
            warnings.push(format!(
                "Copyright notice ends in {}, the site may be outdated",
                year
            ));
        }
    }

    let broken = broken_images(document);
    if broken > BROKEN_IMAGE_THRESHOLD {
        warnings.push(format!("{} images have no source", broken));
    }

    warnings
}

/// Scores how much of the expected context was recovered
///
/// # Arguments
///
/// * `populated_buckets` - Number of non-empty role-specific buckets
/// * `has_mission` - Whether a mission statement was found
/// * `has_contact` - Whether any contact detail was found
/// * `warning_count` - Number of quality warnings
///
/// # Returns
///
/// A score clamped to `[MIN_CONFIDENCE, 1.0]`
pub fn score_confidence(
    populated_buckets: usize,
    has_mission: bool,
    has_contact: bool,
    warning_count: usize,
) -> f64 {
    let mut score = BASE_CONFIDENCE + 0.1 * populated_buckets as f64;
    if has_mission {
        score += 0.1;
    }
    if has_contact {
        score += 0.05;
    }
    score -= 0.1 * warning_count as f64;
    score.clamp(MIN_CONFIDENCE, 1.0)
}

fn latest_copyright_year(document: &Html) -> Option<i32> {
    let text: String = Selector::parse("body")
        .ok()
        .map(|sel| {
            document
                .select(&sel)
                .flat_map(|b| b.text())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    copyright_regex()
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        .max()
}

fn broken_images(document: &Html) -> usize {
    let Ok(sel) = Selector::parse("img") else {
        return 0;
    };
    document
        .select(&sel)
        .filter(|img| {
            img.value()
                .attr("src")
                .map_or(true, |src| src.trim().is_empty())
        })
        .count()
}

fn copyright_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:©|\(c\)|copyright)\s*(?:\d{4}\s*[-–]\s*)?(\d{4})")
            .expect("valid copyright pattern")
    })
}
