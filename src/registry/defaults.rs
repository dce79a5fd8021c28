use crate::registry::{CrawlTarget, Selectors, SourceType};

/// Built-in funding sources and search-discovery targets
pub fn default_targets() -> Vec<CrawlTarget> {
    vec![
        CrawlTarget::new(
            "grants-gov",
            "Grants.gov",
            "https://www.grants.gov/search-grants",
            SourceType::Government,
            Selectors {
                amount: Some(".award-ceiling".to_string()),
                deadline: Some(".close-date".to_string()),
                funder: Some(".agency".to_string()),
                ..Selectors::listing(".search-result", "h4 a", ".synopsis", "h4 a")
            },
        )
        .with_rate_limit(2000)
        .with_pagination("a.next", 3),
        CrawlTarget::new(
            "sam-assistance",
            "SAM.gov Assistance Listings",
            "https://sam.gov/content/assistance-listings",
            SourceType::Government,
            Selectors {
                funder: Some(".department".to_string()),
                ..Selectors::listing(".listing", "h3", ".objective", "h3 a")
            },
        )
        .with_rate_limit(2000),
        CrawlTarget::new(
            "eu-funding-tenders",
            "EU Funding & Tenders Portal",
            "https://ec.europa.eu/info/funding-tenders/opportunities/portal/screen/opportunities/calls-for-proposals",
            SourceType::Eu,
            Selectors {
                deadline: Some(".deadline".to_string()),
                funder: Some(".programme".to_string()),
                ..Selectors::listing(".call-card", ".call-title", ".call-summary", "a.call-link")
            },
        )
        .with_rate_limit(3000)
        .with_pagination(".pagination-next a", 2),
        CrawlTarget::new(
            "candid",
            "Candid Foundation Directory",
            "https://candid.org/find-funding",
            SourceType::Foundation,
            Selectors {
                amount: Some(".amount".to_string()),
                ..Selectors::listing(".funder-result", ".funder-name", ".funder-summary", "a")
            },
        )
        .with_rate_limit(1500),
        CrawlTarget::new(
            "philea",
            "Philea (European Foundation Centre)",
            "https://philea.eu/opportunities/",
            SourceType::Foundation,
            Selectors::listing("article", "h2", ".excerpt", "h2 a"),
        )
        .with_rate_limit(1500),
        CrawlTarget::new(
            "globalgiving",
            "GlobalGiving",
            "https://www.globalgiving.org/accelerator/",
            SourceType::Private,
            Selectors::listing(".project-card", ".project-title", ".project-summary", "a"),
        )
        .with_rate_limit(1500),
        CrawlTarget::new(
            "duckduckgo",
            "DuckDuckGo",
            "https://html.duckduckgo.com/html/?q={query}",
            SourceType::SearchEngine,
            Selectors::listing(".result", ".result__title", ".result__snippet", "a.result__a"),
        )
        .with_queries(&[
            "grants for nonprofit organizations",
            "NGO funding call for proposals",
            "foundation grants civil society apply",
        ])
        .with_rate_limit(5000),
        CrawlTarget::new(
            "bing",
            "Bing",
            "https://www.bing.com/search?q={query}",
            SourceType::SearchEngine,
            Selectors::listing("li.b_algo", "h2", ".b_caption p", "h2 a"),
        )
        .with_queries(&[
            "charity funding opportunities eligible organisations",
            "community foundation grant deadline",
        ])
        .with_rate_limit(5000),
    ]
}
