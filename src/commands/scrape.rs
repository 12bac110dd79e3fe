//! Scrape command implementation.

use crate::config::Config;
use crate::export;
use crate::format::Formatter;
use crate::woo::{
    CancelFlag, CrawlReport, EventSink, LogSink, PageFetch, ScrapeSession, ShopClient,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Crawls a storefront and renders or exports the results.
pub struct ScrapeCommand {
    config: Config,
    cancel: CancelFlag,
    events: Arc<dyn EventSink>,
}

impl ScrapeCommand {
    /// Creates a new scrape command logging progress through tracing.
    pub fn new(config: Config) -> Self {
        Self { config, cancel: CancelFlag::new(), events: Arc::new(LogSink) }
    }

    /// Uses `cancel` to stop the crawl from outside (e.g. Ctrl-C).
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sends progress events to `events` instead of the log.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Crawls `url` with a client built from the configuration.
    pub async fn execute(&self, url: &str) -> Result<CrawlReport> {
        let client =
            ShopClient::new(&self.config, self.events.clone()).context("Failed to create HTTP client")?;

        self.execute_with_client(Arc::new(client), url).await
    }

    /// Crawls `url` with a provided client (for testing).
    pub async fn execute_with_client(&self, client: Arc<dyn PageFetch>, url: &str) -> Result<CrawlReport> {
        info!("Scraping: {}", url);
        debug!(
            "max_pages={} fetch_detailed={} delay_ms={}",
            self.config.max_pages, self.config.fetch_detailed, self.config.delay_ms
        );

        let selectors = Arc::new(self.config.selector_set());
        let session = ScrapeSession::new(client, selectors)
            .with_events(self.events.clone())
            .with_cancel(self.cancel.clone());

        let report = session
            .run(url, self.config.max_pages, self.config.fetch_detailed)
            .await
            .context("Cannot start crawl")?;

        info!("Found {} products ({})", report.products.len(), report.outcome);
        Ok(report)
    }

    /// Formats the products and statistics in the configured format.
    pub fn render(&self, report: &CrawlReport, stats_only: bool) -> String {
        let formatter = Formatter::new(self.config.format);
        let stats = formatter.format_statistics(&report.statistics());

        if stats_only {
            return stats;
        }

        format!("{}\n\n{}", formatter.format_products(&report.products), stats)
    }

    /// Resolves the export files for a run from the `--export-*` flags.
    ///
    /// A flag given without a path uses the configured default name. With no
    /// export flag at all, products go to the default JSON file unless `quiet`.
    pub fn export_targets(
        &self,
        json: Option<Option<PathBuf>>,
        csv: Option<Option<PathBuf>>,
        quiet: bool,
    ) -> (Option<PathBuf>, Option<PathBuf>) {
        let defaults = &self.config.export;
        let json = match json {
            Some(path) => Some(path.unwrap_or_else(|| PathBuf::from(&defaults.default_json_file))),
            None if csv.is_none() && !quiet => Some(PathBuf::from(&defaults.default_json_file)),
            None => None,
        };
        let csv = csv.map(|path| path.unwrap_or_else(|| PathBuf::from(&defaults.default_csv_file)));

        (json, csv)
    }

    /// Writes the requested export files. Nothing is written for an empty crawl.
    pub fn export(&self, report: &CrawlReport, json: Option<&Path>, csv: Option<&Path>) -> Result<()> {
        if report.products.is_empty() {
            warn!("No products found, skipping export");
            return Ok(());
        }
        if let Some(path) = json {
            export::write_json(path, &report.products)?;
        }
        if let Some(path) = csv {
            export::write_csv(path, &report.products)?;
        }
        Ok(())
    }
}
