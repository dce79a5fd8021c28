//! Grant Scout main entry point
//!
//! This is the command-line interface for the Grant Scout discovery pipeline.

use anyhow::{bail, Context};
use clap::Parser;
use grant_scout::config::{load_config_with_hash, Config, CrawlMode};
use grant_scout::extract::{Role, WebsiteContextExtractor};
use grant_scout::manager::CrawlManager;
use grant_scout::output::{write_grants_json, write_markdown_report};
use grant_scout::registry::SourceRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Grant Scout: a funding-opportunity discovery pipeline
///
/// Grant Scout crawls known funding sources, discovers new ones through
/// search engines, deep-crawls what it finds and reports deduplicated grants.
/// It can also extract structured context from a funder or applicant website.
#[derive(Parser, Debug)]
#[command(name = "grant-scout")]
#[command(version)]
#[command(about = "A funding-opportunity discovery pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["schedule", "extract", "extract_pair"])]
    dry_run: bool,

    /// Run scheduled crawls until interrupted with Ctrl-C
    #[arg(long, conflicts_with_all = ["dry_run", "extract", "extract_pair"])]
    schedule: bool,

    /// Extract structured context from a website and print it as JSON
    #[arg(long, value_name = "URL", requires = "role")]
    extract: Option<String>,

    /// Role of the website passed to --extract
    #[arg(long, value_name = "funder|applicant")]
    role: Option<Role>,

    /// Extract a funder and an applicant context side by side
    #[arg(long, num_args = 2, value_names = ["FUNDER_URL", "APPLICANT_URL"], conflicts_with = "extract")]
    extract_pair: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(url) = &cli.extract {
        let role = cli.role.context("--extract requires --role")?;
        handle_extract(&config, url, role).await?;
    } else if let Some(urls) = &cli.extract_pair {
        let [funder, applicant] = urls.as_slice() else {
            bail!("--extract-pair takes exactly two URLs");
        };
        handle_extract_pair(&config, funder, applicant).await?;
    } else if cli.schedule {
        handle_schedule(&config).await?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("grant_scout=info,warn"),
            1 => EnvFilter::new("grant_scout=debug,info"),
            2 => EnvFilter::new("grant_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Grant Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Mode: {}",
        match config.crawler.mode {
            CrawlMode::Mock => "mock",
            CrawlMode::Live => "live",
        }
    );
    println!("  Deep crawl limit: {}", config.crawler.deep_crawl_limit);
    println!(
        "  Default rate limit: {}ms",
        config.crawler.default_rate_limit_ms
    );
    println!(
        "  Search results per query: {}",
        config.crawler.search_results_per_query
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nFetch Chain:");
    if config.fetch.direct {
        println!("  1. direct");
    }
    let offset = usize::from(config.fetch.direct);
    for (i, proxy) in config.fetch.proxies.iter().enumerate() {
        println!("  {}. {} ({})", i + 1 + offset, proxy.name, proxy.template);
    }

    println!("\nSchedule:");
    println!(
        "  Daily at {:02}:00 local time, every {}h",
        config.schedule.hour, config.schedule.interval_hours
    );

    let registry = SourceRegistry::from_targets(config.sources.clone());
    println!("\nSources ({}):", registry.len());
    for target in registry.all() {
        println!(
            "  - [{}] {} ({}){}",
            target.source_type,
            target.name,
            target.base_url,
            if target.is_active { "" } else { " inactive" }
        );
        for query in &target.search_queries {
            println!("    * {}", query);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} known sources and run {} search queries",
        registry.active_known_sources().len(),
        registry
            .active_search_targets()
            .iter()
            .map(|t| t.search_queries.len())
            .sum::<usize>()
    );
}

/// Handles the default mode: one global crawl
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let manager = CrawlManager::new(config).context("Failed to initialize crawl manager")?;

    let outcome = manager.start_global_crawl().await?;
    println!("{}", outcome.summary);

    if let Some(path) = &config.output.summary_path {
        write_markdown_report(&outcome, config_hash, Path::new(path))
            .with_context(|| format!("Failed to write report to {}", path))?;
        println!("✓ Report written to: {}", path);
    }
    if let Some(path) = &config.output.grants_path {
        write_grants_json(&outcome.processed_grants, Path::new(path))
            .with_context(|| format!("Failed to export grants to {}", path))?;
        println!("✓ Grants exported to: {}", path);
    }

    if !outcome.success {
        bail!("Crawl failed: {}", outcome.errors.join("; "));
    }
    Ok(())
}

/// Handles the --schedule mode: recurring crawls until Ctrl-C
async fn handle_schedule(config: &Config) -> anyhow::Result<()> {
    let manager = Arc::new(CrawlManager::new(config).context("Failed to initialize crawl manager")?);
    manager.schedule_regular_crawls()?;

    println!("Scheduled crawls are running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    manager.stop_scheduled_crawls()?;
    let status = manager.get_crawler_status()?;
    println!(
        "Stopped after {} crawls (last: {})",
        status.total_crawls,
        status
            .last_crawl
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}

/// Handles the --extract mode: prints one website context as JSON
async fn handle_extract(config: &Config, url: &str, role: Role) -> anyhow::Result<()> {
    let extractor = WebsiteContextExtractor::from_config(config)?;
    let context = extractor.extract_website_context(url, role).await;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

/// Handles the --extract-pair mode: prints both contexts as JSON
async fn handle_extract_pair(config: &Config, funder: &str, applicant: &str) -> anyhow::Result<()> {
    let extractor = WebsiteContextExtractor::from_config(config)?;
    let pair = extractor.extract_both_contexts(funder, applicant).await;
    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}
