//! Sitegraph main entry point
//!
//! This is the command-line interface for the sitegraph crawler.

use anyhow::Context;
use clap::Parser;
use sitegraph::config::{load_config_with_hash, Config};
use sitegraph::crawler::crawl;
use sitegraph::output::{print_statistics, write_alternate_list, write_report};
use sitegraph::url::ShortenedTable;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Sitegraph: maps a site's pages and their cross-references
///
/// Sitegraph seeds from the site's sitemap, follows internal links, fetches
/// (but does not expand) external pages, and writes one JSON record per
/// distinct page.
#[derive(Parser, Debug)]
#[command(name = "sitegraph")]
#[command(version = "1.0.0")]
#[command(about = "Maps a site's pages and their cross-references", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the report here instead of the configured report path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(&config, cli.report.as_deref(), cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegraph=info,warn"),
            1 => EnvFilter::new("sitegraph=debug,info"),
            2 => EnvFilter::new("sitegraph=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let shortened = ShortenedTable::from_config(&config.shortened, &config.site.base_url)
        .context("Failed to load shortened URLs")?;

    println!("=== Sitegraph Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Sitemap: {}", config.site.sitemap_url);

    println!("\nCrawler Configuration:");
    println!("  Frontier max size: {}", config.crawler.frontier_max_size);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Alternate fetch: {}", config.crawler.alternate_fetch);

    println!("\nCache:");
    println!("  Path: {}", config.cache.path);
    match config.cache.expire_after_secs {
        Some(secs) => println!("  Expire after: {}s", secs),
        None => println!("  Expire after: never"),
    }

    println!("\nRewrites ({}):", config.rules.rewrites.len());
    for (from, to) in &config.rules.rewrites {
        println!("  - {} -> {}", from, to);
    }

    println!("\nIgnored paths ({}):", config.rules.ignored_exact.len());
    for path in &config.rules.ignored_exact {
        println!("  - {}", path);
    }

    println!(
        "\nIgnored prefixes ({}):",
        config.rules.ignored_prefixes.len()
    );
    for prefix in &config.rules.ignored_prefixes {
        println!("  - {}", prefix);
    }

    println!("\nShortened URLs: {}", shortened.len());

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);
    if let Some(path) = &config.output.alternate_fetch_path {
        println!("  Alternate fetch list: {}", path);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling from {}", config.site.sitemap_url);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    report_override: Option<&Path>,
    quiet: bool,
) -> anyhow::Result<()> {
    let crawler = crawl(config).await.context("Crawl failed")?;

    let report_path = report_override.unwrap_or_else(|| Path::new(&config.output.report_path));
    write_report(report_path, &crawler.report())
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;

    if let Some(path) = &config.output.alternate_fetch_path {
        let path = Path::new(path);
        write_alternate_list(path, &crawler.alternate_fetch_queue())
            .with_context(|| format!("Failed to write alternate list {}", path.display()))?;
    }

    let stats = crawler.statistics();
    tracing::info!(
        "Crawl completed: {} pages, {} links, {} fetched",
        stats.total_pages,
        stats.total_links,
        stats.counters.fetched
    );

    if !quiet {
        print_statistics(&stats);
    }

    Ok(())
}
