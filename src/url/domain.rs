use url::Url;

/// Region label used when a domain carries no geographic hint
pub const GLOBAL_REGION: &str = "Global";

/// Top-level suffixes mapped to the region they imply, most specific first
const REGION_SUFFIXES: &[(&str, &str)] = &[
    ("europa.eu", "European Union"),
    (".eu", "European Union"),
    (".gov", "United States"),
    (".us", "United States"),
    (".uk", "United Kingdom"),
    (".ca", "Canada"),
    (".au", "Australia"),
    (".nz", "New Zealand"),
    (".de", "Germany"),
    (".fr", "France"),
    (".nl", "Netherlands"),
    (".be", "Belgium"),
    (".it", "Italy"),
    (".es", "Spain"),
    (".ie", "Ireland"),
    (".ch", "Switzerland"),
    (".se", "Sweden"),
    (".in", "India"),
    (".za", "South Africa"),
    (".ke", "Kenya"),
];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use grant_scout::url::extract_domain;
///
/// let url = Url::parse("https://Grants.Example.ORG/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("grants.example.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Infers the region a funding source serves from its domain suffix
///
/// Falls back to [`GLOBAL_REGION`] for generic suffixes (`.org`, `.com`, ...)
/// and for anything that does not parse as a URL.
pub fn infer_region(url_str: &str) -> &'static str {
    let Some(host) = Url::parse(url_str).ok().and_then(|u| extract_domain(&u)) else {
        return GLOBAL_REGION;
    };

    REGION_SUFFIXES
        .iter()
        .find(|(suffix, _)| host.ends_with(suffix) || host == suffix.trim_start_matches('.'))
        .map(|(_, region)| *region)
        .unwrap_or(GLOBAL_REGION)
}

/// Returns true if both URLs point at the same host, ignoring a `www.` prefix
pub fn is_same_site(a: &Url, b: &Url) -> bool {
    fn bare(url: &Url) -> Option<String> {
        extract_domain(url).map(|h| h.trim_start_matches("www.").to_string())
    }
    match (bare(a), bare(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://funder.org:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("funder.org".to_string()));
    }

    #[test]
    fn test_infer_region_from_suffix() {
        assert_eq!(infer_region("https://www.grants.gov/search"), "United States");
        assert_eq!(infer_region("https://ec.europa.eu/info/funding"), "European Union");
        assert_eq!(infer_region("https://www.ukri.org.uk/"), "United Kingdom");
        assert_eq!(infer_region("https://stiftung.de/foerderung"), "Germany");
    }

    #[test]
    fn test_infer_region_generic_suffix_is_global() {
        assert_eq!(infer_region("https://globalgiving.org/"), GLOBAL_REGION);
        assert_eq!(infer_region("https://example.com/ca"), GLOBAL_REGION);
        assert_eq!(infer_region("garbage"), GLOBAL_REGION);
    }

    #[test]
    fn test_same_site_ignores_www() {
        let a = Url::parse("https://www.fund.org/a").unwrap();
        let b = Url::parse("https://fund.org/b").unwrap();
        let c = Url::parse("https://other.org/").unwrap();
        assert!(is_same_site(&a, &b));
        assert!(!is_same_site(&a, &c));
    }
}
