//! Multi-page crawl orchestration.

use crate::woo::client::PageFetch;
use crate::woo::events::{CancelFlag, EventSink, NullSink, ScrapeEvent};
use crate::woo::extractor::Extractor;
use crate::woo::models::{Product, Statistics};
use crate::woo::pager::{CrawlOutcome, ExhaustReason, Pager};
use crate::woo::selectors::SelectorSet;
use scraper::Html;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Errors that prevent a crawl from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid start URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result of a finished crawl.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Products in discovery order.
    pub products: Vec<Product>,
    /// Listing pages fetched successfully.
    pub pages_fetched: u32,
    /// Why the crawl stopped.
    pub outcome: CrawlOutcome,
}

impl CrawlReport {
    /// Field coverage over the collected products.
    pub fn statistics(&self) -> Statistics {
        Statistics::from_products(&self.products)
    }
}

/// What one listing page yielded.
struct ParsedPage {
    products: Vec<Product>,
    next: Option<String>,
}

/// Crawls listing pages with one fetcher and one selector set.
///
/// All per-crawl state lives inside [`ScrapeSession::run`], so a session can
/// be reused for several crawls.
pub struct ScrapeSession {
    fetcher: Arc<dyn PageFetch>,
    selectors: Arc<SelectorSet>,
    events: Arc<dyn EventSink>,
    cancel: CancelFlag,
}

impl ScrapeSession {
    /// Creates a session that reports nothing and cannot be cancelled from outside.
    pub fn new(fetcher: Arc<dyn PageFetch>, selectors: Arc<SelectorSet>) -> Self {
        Self { fetcher, selectors, events: Arc::new(NullSink), cancel: CancelFlag::new() }
    }

    /// Sets the event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Crawls from `start_url`, following next-page links for at most
    /// `max_pages` pages.
    ///
    /// Fetch failures end the crawl but keep what was collected; only an
    /// unusable start URL is an error.
    pub async fn run(
        &self,
        start_url: &str,
        max_pages: u32,
        fetch_detailed: bool,
    ) -> Result<CrawlReport, SessionError> {
        let start = parse_start_url(start_url)?;

        let extractor = Extractor::new(self.selectors.clone(), start.clone(), self.events.clone());
        let mut pager = Pager::new(self.selectors.clone(), start, max_pages);
        let mut products: Vec<Product> = Vec::new();
        let mut pages_fetched = 0;

        let outcome = loop {
            if max_pages == 0 {
                break CrawlOutcome::LimitReached;
            }
            if self.cancel.is_cancelled() {
                info!("Crawl cancelled before page {}", pager.page());
                break CrawlOutcome::Cancelled;
            }

            let page = pager.page();
            let url = pager.current_url().to_string();
            self.events.emit(&ScrapeEvent::PageStarted { page, max_pages, url: url.clone() });

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to fetch page {}: {}", page, e);
                    break CrawlOutcome::Exhausted(ExhaustReason::FetchFailed);
                }
            };
            pages_fetched += 1;

            let Some(parsed) = parse_page(&pager, &extractor, &body) else {
                info!("No products found on page {}", page);
                break CrawlOutcome::Exhausted(ExhaustReason::NoContainers);
            };

            let found = parsed.products.len();
            for product in parsed.products {
                let product = if fetch_detailed && !self.cancel.is_cancelled() {
                    extractor.enrich(self.fetcher.as_ref(), product).await
                } else {
                    product
                };
                products.push(product);
            }

            self.events.emit(&ScrapeEvent::PageCompleted { page, found, total: products.len() });

            if let Err(outcome) = pager.advance(parsed.next) {
                break outcome;
            }
        };

        info!("Crawl finished ({}): {} products from {} pages", outcome, products.len(), pages_fetched);
        self.events.emit(&ScrapeEvent::CrawlFinished { pages: pages_fetched, products: products.len() });

        Ok(CrawlReport { products, pages_fetched, outcome })
    }
}

/// Accepts absolute http(s) URLs only.
fn parse_start_url(raw: &str) -> Result<Url, SessionError> {
    let invalid = |reason: String| SessionError::InvalidUrl { url: raw.to_string(), reason };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// Extracts products and the next link from a listing page body.
///
/// Returns `None` when the page has no containers. The next link is only
/// looked up when another page is allowed.
fn parse_page(pager: &Pager, extractor: &Extractor, body: &str) -> Option<ParsedPage> {
    let document = Html::parse_document(body);

    let containers = pager.find_containers(&document);
    if containers.is_empty() {
        return None;
    }

    let products = extractor.extract_all(containers);
    let next = if pager.is_last_page() { None } else { pager.find_next(&document) };

    Some(ParsedPage { products, next })
}
