//! Relevance heuristic for search-discovery links
//!
//! A hit is relevant when its title and description together mention a
//! funding term and either an NGO term or an application cue. The false
//! positive rate of this rule has not been measured.

const FUNDING_KEYWORDS: &[&str] = &[
    "grant",
    "funding",
    "fund ",
    "funds",
    "award",
    "fellowship",
    "subsidy",
    "financing",
    "call for proposals",
    "donor",
];

const NGO_KEYWORDS: &[&str] = &[
    "ngo",
    "nonprofit",
    "non-profit",
    "not-for-profit",
    "charity",
    "charities",
    "civil society",
    "foundation",
    "community organization",
    "community organisation",
    "association",
];

const APPLICATION_CUES: &[&str] = &["eligible", "eligibility", "apply", "application"];

/// Returns true if a search hit looks like a funding opportunity for NGOs
///
/// # Examples
///
/// ```
/// use grant_scout::crawler::is_relevant;
///
/// assert!(is_relevant("Community grants 2026", "Nonprofits may apply until June"));
/// assert!(!is_relevant("Grant Park concert", "Music in the park this weekend"));
/// ```
pub fn is_relevant(title: &str, description: &str) -> bool {
    // Trailing space lets "fund " match at the end of the text
    let text = format!("{} {} ", title, description).to_lowercase();
    let has_funding = FUNDING_KEYWORDS.iter().any(|k| text.contains(k));
    let has_ngo = NGO_KEYWORDS.iter().any(|k| text.contains(k));
    let has_cue = APPLICATION_CUES.iter().any(|k| text.contains(k));
    has_funding && (has_ngo || has_cue)
}

/// Returns true if a link's path or anchor text suggests a funding page
pub fn looks_like_funding_link(url: &str, anchor_text: &str) -> bool {
    let haystack = format!("{} {}", url, anchor_text).to_lowercase();
    [
        "grant",
        "funding",
        "opportunit",
        "call",
        "apply",
        "award",
        "programme",
        "program",
    ]
    .iter()
    .any(|k| haystack.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funding_and_ngo_terms() {
        assert!(is_relevant(
            "Civil society support programme",
            "Funding for NGOs working on climate adaptation"
        ));
    }

    #[test]
    fn test_funding_and_application_cue() {
        assert!(is_relevant("Small grants round", "Eligible groups can apply online"));
    }

    #[test]
    fn test_funding_term_alone_is_not_enough() {
        assert!(!is_relevant("Research funding trends", "An overview of national budgets"));
    }

    #[test]
    fn test_ngo_term_alone_is_not_enough() {
        assert!(!is_relevant("Nonprofit leadership summit", "Apply to attend the summit"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_relevant("GRANTS FOR CHARITIES", ""));
    }

    #[test]
    fn test_funding_link_detection() {
        assert!(looks_like_funding_link("https://fund.org/grants/open", ""));
        assert!(looks_like_funding_link("https://fund.org/p/123", "Current calls"));
        assert!(!looks_like_funding_link("https://fund.org/team", "Our staff"));
    }
}
