//! Sumi-Crawler main entry point
//!
//! This is the command-line interface for the Sumi-Crawler single-host crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_crawler::cache::SqliteCache;
use sumi_crawler::config::{load_config_with_hash, Config};
use sumi_crawler::output::{generate_markdown_summary, print_statistics, CrawlStatistics, ReportInfo};
use sumi_crawler::{Crawler, FrontierQueue};
use tracing_subscriber::EnvFilter;

/// Sumi-Crawler: a polite single-host web crawler
///
/// Sumi-Crawler starts from a seed URL, follows the links it discovers within
/// the configured domain scope, and respects robots.txt. An interrupted crawl
/// can be frozen to a snapshot and resumed later.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawler")]
#[command(version)]
#[command(about = "A polite single-host web crawler", long_about = None)]
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

    /// Resume from a queue snapshot
    #[arg(long, value_name = "SNAPSHOT")]
    resume: Option<PathBuf>,

    /// Freeze the queue to this path when the crawl ends or is interrupted
    #[arg(long, value_name = "PATH")]
    freeze_to: Option<PathBuf>,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// SQLite response cache used for conditional requests
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&cli, config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawler=info,warn"),
            1 => EnvFilter::new("sumi_crawler=debug,info"),
            2 => EnvFilter::new("sumi_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Sumi-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed: {}", crawler.seed);
    println!("  Max concurrency: {}", crawler.max_concurrency);
    println!("  Interval: {}ms", crawler.interval);
    if crawler.max_depth == 0 {
        println!("  Max depth: unlimited");
    } else {
        println!("  Max depth: {}", crawler.max_depth);
    }
    println!("  Timeout: {}ms", crawler.timeout);
    println!("  Max resource size: {} bytes", crawler.max_resource_size);
    println!("  User agent: {}", crawler.user_agent);
    println!("  Respect robots.txt: {}", crawler.respect_robots_txt);

    println!("\nDomain Policy:");
    println!("  Filter by domain: {}", config.domain.filter_by_domain);
    println!("  Scan subdomains: {}", config.domain.scan_subdomains);
    println!("  Ignore www: {}", config.domain.ignore_www_domain);
    println!("  Whitelist ({}):", config.domain.whitelist.len());
    for pattern in &config.domain.whitelist {
        println!("    - {}", pattern);
    }

    if let Some(proxy) = &config.proxy {
        println!("\nProxy: {}", proxy.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config, config_hash: String) -> anyhow::Result<()> {
    let seed = config.crawler.seed.clone();
    let mut crawler = Crawler::with_http(config)
        .context("failed to create crawler")?
        .with_config_hash(config_hash.clone());

    if let Some(path) = &cli.cache {
        let cache = SqliteCache::open(path)
            .with_context(|| format!("failed to open cache {}", path.display()))?;
        crawler = crawler.with_cache(Arc::new(cache));
    }

    if let Some(path) = &cli.resume {
        let queue = FrontierQueue::defrost(path)
            .with_context(|| format!("failed to resume from {}", path.display()))?;
        tracing::info!("Resuming with {} queued items", queue.len());
        crawler = crawler.with_queue(queue);
    }

    // Ctrl-C stops the runloop so the queue can still be frozen
    let handle = crawler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            handle.stop();
        }
    });

    crawler.start().await.context("crawl failed")?;

    if let Some(path) = &cli.freeze_to {
        crawler
            .freeze(path)
            .with_context(|| format!("failed to freeze queue to {}", path.display()))?;
        println!("✓ Queue frozen to: {}", path.display());
    }

    let stats = CrawlStatistics::from_queue(crawler.queue());
    if !cli.quiet {
        print_statistics(&stats);
    }

    if let Some(path) = &cli.summary {
        let info = ReportInfo {
            seed,
            config_hash: Some(config_hash),
        };
        generate_markdown_summary(&stats, &info, path)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        println!("✓ Summary exported to: {}", path.display());
    }

    Ok(())
}
