//! woo-crawler - Resilient WooCommerce storefront product crawler
//!
//! Crawls listing pages with TLS fingerprint emulation and exports the products.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;
use woo_crawler::commands::ScrapeCommand;
use woo_crawler::config::{Config, OutputFormat};
use woo_crawler::woo::{CancelFlag, NullSink};

#[derive(Parser)]
#[command(
    name = "woo-crawler",
    version,
    about = "Resilient WooCommerce storefront product crawler",
    long_about = "Crawls WooCommerce shop and category pages, following pagination, and extracts product data despite theme differences."
)]
struct Cli {
    /// Shop or category page to start from
    url: String,

    /// Maximum number of listing pages to crawl
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Delay after each request in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Proxy URL (e.g., socks5://host:port); `{session}` is replaced with a random session id
    #[arg(long)]
    proxy: Option<String>,

    /// Connect directly even if a proxy is configured
    #[arg(long, conflicts_with = "proxy")]
    no_proxy: bool,

    /// Fetch product pages for details missing from the listing
    #[arg(short, long)]
    detailed: bool,

    /// Path to config file (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "WOO_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Export products to a JSON file (default name from config, written unless --quiet or --export-csv)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export_json: Option<Option<PathBuf>>,

    /// Export products to a CSV file (default name from config)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export_csv: Option<Option<PathBuf>>,

    /// Print nothing to stdout (use with --export-*)
    #[arg(short, long, conflicts_with = "stats_only")]
    quiet: bool,

    /// Print only the crawl statistics
    #[arg(long)]
    stats_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
        config.use_proxy = true;
    }
    if cli.no_proxy {
        config.use_proxy = false;
    }
    if cli.detailed {
        config.fetch_detailed = true;
    }
    config.validate()?;

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request");
            on_interrupt.cancel();
        }
    });

    let mut cmd = ScrapeCommand::new(config).with_cancel(cancel);
    if cli.quiet {
        cmd = cmd.with_events(Arc::new(NullSink));
    }

    let report = cmd.execute(&cli.url).await?;

    if report.products.is_empty() {
        warn!("No products found at {}", cli.url);
        return Ok(());
    }

    let (json_path, csv_path) = cmd.export_targets(cli.export_json, cli.export_csv, cli.quiet);
    cmd.export(&report, json_path.as_deref(), csv_path.as_deref())?;

    if !cli.quiet {
        println!("{}", cmd.render(&report, cli.stats_only));
    }

    Ok(())
}
