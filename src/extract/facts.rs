//! Fact extraction from parsed HTML
//!
//! `FactExtractor` is the seam for swapping extraction strategies. The
//! heuristic implementation scans headings, paragraphs and list items for
//! role-specific keyword sets, keeps text inside a length window, drops
//! code-looking fragments, then deduplicates and caps every bucket.

use crate::extract::{ApplicantInfo, ContactInfo, FunderInfo, Profile, Role};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Shortest fact kept; shorter text is navigation noise
pub const MIN_FACT_LEN: usize = 30;
/// Longest fact kept; longer text is boilerplate
pub const MAX_FACT_LEN: usize = 600;

/// Facts pulled out of one document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFacts {
    pub title: Option<String>,
    pub mission: Option<String>,
    pub key_info: Vec<String>,
    pub profile: Profile,
    pub contact: ContactInfo,
}

/// Strategy for turning a document into structured facts
pub trait FactExtractor: Send + Sync {
    fn extract(&self, document: &Html, role: Role) -> ExtractedFacts;
}

/// A named group of keywords and the maximum number of facts kept for it
struct Bucket {
    keywords: &'static [&'static str],
    cap: usize,
}

const ABOUT: Bucket = Bucket {
    keywords: &["mission", "our goal", "goals", "objective", "vision", "about us", "who we are", "purpose"],
    cap: 5,
};

const PAST_FUNDINGS: Bucket = Bucket {
    keywords: &[
        "awarded",
        "grantee",
        "recipient",
        "funded projects",
        "past grants",
        "grants made",
        "we have funded",
        "we funded",
        "supported projects",
        "portfolio",
    ],
    cap: 10,
};

const FUNDING_PRIORITIES: Bucket = Bucket {
    keywords: &[
        "priorit",
        "focus area",
        "current call",
        "open call",
        "call for proposals",
        "we fund",
        "funding area",
        "eligib",
        "criteria",
        "theme",
    ],
    cap: 8,
};

const RESEARCH_CAPABILITIES: Bucket = Bucket {
    keywords: &[
        "research",
        "expertise",
        "capabilit",
        "centre",
        "center",
        "laborator",
        "department",
        "faculty",
        "specialis",
        "specializ",
    ],
    cap: 8,
};

const TRACK_RECORD: Bucket = Bucket {
    keywords: &[
        "grant",
        "funded by",
        "award",
        "publication",
        "published",
        "track record",
        "achievement",
        "completed project",
    ],
    cap: 10,
};

const RESOURCES: Bucket = Bucket {
    keywords: &[
        "facilit",
        "equipment",
        "infrastructure",
        "partner",
        "collaborat",
        "network",
        "support service",
        "resources",
    ],
    cap: 8,
};

const MISSION_CUES: &[&str] = &[
    "mission",
    "vision",
    "we believe",
    "our purpose",
    "dedicated to",
    "committed to",
];

/// Keyword and length-window heuristics
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFactExtractor;

impl FactExtractor for HeuristicFactExtractor {
    fn extract(&self, document: &Html, role: Role) -> ExtractedFacts {
        let blocks = text_blocks(document);

        let profile = match role {
            Role::Funder => Profile::Funder(FunderInfo {
                about: collect_bucket(&blocks, &ABOUT),
                past_fundings: collect_bucket(&blocks, &PAST_FUNDINGS),
                funding_priorities: collect_bucket(&blocks, &FUNDING_PRIORITIES),
            }),
            Role::Applicant => Profile::Applicant(ApplicantInfo {
                research_capabilities: collect_bucket(&blocks, &RESEARCH_CAPABILITIES),
                track_record: collect_bucket(&blocks, &TRACK_RECORD),
                resources: collect_bucket(&blocks, &RESOURCES),
            }),
        };

        ExtractedFacts {
            title: page_title(document),
            mission: mission(document, &blocks),
            key_info: key_info(document),
            profile,
            contact: contact_info(document),
        }
    }
}

/// A candidate text with the heading of the section it sits under
struct TextBlock {
    heading: Option<String>,
    text: String,
}

/// Walks headings, paragraphs and list items in document order
fn text_blocks(document: &Html) -> Vec<TextBlock> {
    let Some(selector) = selector("h1, h2, h3, h4, h5, p, li") else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    let mut current_heading: Option<String> = None;

    for element in document.select(&selector) {
        let text = clean_text(element);
        if text.is_empty() {
            continue;
        }
        if is_heading(element) {
            current_heading = Some(text.to_lowercase());
            continue;
        }
        blocks.push(TextBlock {
            heading: current_heading.clone(),
            text,
        });
    }

    blocks
}

/// Texts matching a bucket either directly or through their section heading
fn collect_bucket(blocks: &[TextBlock], bucket: &Bucket) -> Vec<String> {
    let mut seen = HashSet::new();

    blocks
        .iter()
        .filter(|block| {
            let text = block.text.to_lowercase();
            matches_any(&text, bucket.keywords)
                || block
                    .heading
                    .as_deref()
                    .map_or(false, |h| matches_any(h, bucket.keywords))
        })
        .map(|block| block.text.as_str())
        .filter(|text| within_window(text) && !looks_like_code(text))
        .filter(|text| seen.insert(text.to_lowercase()))
        .take(bucket.cap)
        .map(str::to_string)
        .collect()
}

fn mission(document: &Html, blocks: &[TextBlock]) -> Option<String> {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .find(|text| {
            within_window(text)
                && !looks_like_code(text)
                && matches_any(&text.to_lowercase(), MISSION_CUES)
        })
        .map(str::to_string)
        .or_else(|| meta_description(document))
}

fn key_info(document: &Html) -> Vec<String> {
    let Some(selector) = selector("h1, h2, h3") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();

    document
        .select(&selector)
        .map(clean_text)
        .filter(|t| (3..=120).contains(&t.len()))
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(10)
        .collect()
}

fn page_title(document: &Html) -> Option<String> {
    ["title", r#"meta[property="og:title"]"#, "h1"]
        .iter()
        .filter_map(|s| selector(s))
        .find_map(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| {
                    el.value()
                        .attr("content")
                        .map(|c| c.trim().to_string())
                        .unwrap_or_else(|| clean_text(el))
                })
                .filter(|t| !t.is_empty())
        })
}

fn meta_description(document: &Html) -> Option<String> {
    let sel = selector(r#"meta[name="description"], meta[property="og:description"]"#)?;
    document
        .select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|c| c.len() >= MIN_FACT_LEN)
}

fn contact_info(document: &Html) -> ContactInfo {
    let mut contact = ContactInfo::default();

    if let Some(sel) = selector("a[href]") {
        for anchor in document.select(&sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(email) = href.strip_prefix("mailto:") {
                let email = email.split('?').next().unwrap_or_default().trim();
                push_unique(&mut contact.emails, email);
            } else if let Some(phone) = href.strip_prefix("tel:") {
                push_unique(&mut contact.phones, phone.trim());
            }
        }
    }

    if let Some(sel) = selector("body") {
        let body_text: String = document
            .select(&sel)
            .flat_map(|b| b.text())
            .collect::<Vec<_>>()
            .join(" ");
        for m in email_regex().find_iter(&body_text) {
            push_unique(&mut contact.emails, m.as_str());
        }
        for m in phone_regex().find_iter(&body_text) {
            let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
            if digits >= 9 {
                push_unique(&mut contact.phones, m.as_str().trim());
            }
        }
    }

    contact.address = selector("address")
        .and_then(|sel| document.select(&sel).next().map(clean_text))
        .filter(|a| !a.is_empty());

    contact.emails.truncate(5);
    contact.phones.truncate(5);
    contact
}

/// True for text that reads like embedded script or serialized data
pub fn looks_like_code(text: &str) -> bool {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return true;
    }
    if ["function(", "function (", "=>", "var ", "const ", "window.", "document.", "\":"]
        .iter()
        .any(|marker| text.contains(marker))
    {
        return true;
    }
    let symbols = text.chars().filter(|c| "{}[];=<>".contains(*c)).count();
    symbols * 20 > text.chars().count()
}

fn within_window(text: &str) -> bool {
    (MIN_FACT_LEN..=MAX_FACT_LEN).contains(&text.len())
}

fn matches_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn is_heading(element: ElementRef<'_>) -> bool {
    matches!(element.value().name(), "h1" | "h2" | "h3" | "h4" | "h5")
}

fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        values.push(value.to_string());
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\(?\d[\d\s().-]{7,}\d").expect("valid phone pattern"))
}
