//! Progress events and cooperative cancellation.
//!
//! Events are observational: sinks never influence the crawl.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// A discrete progress notification emitted during a crawl.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeEvent {
    /// A listing page is about to be fetched.
    PageStarted { page: u32, max_pages: u32, url: String },
    /// A listing page was processed.
    PageCompleted { page: u32, found: usize, total: usize },
    /// A product went through detail-page enrichment.
    ProductEnriched { title: String, found: Vec<&'static str> },
    /// A fetch attempt failed and another one follows after `wait`.
    RetryScheduled { url: String, attempt: u32, wait: Duration, error: String },
    /// Every attempt for a URL failed.
    FetchExhausted { url: String, attempts: u32 },
    /// The crawl ended.
    CrawlFinished { pages: u32, products: usize },
}

/// Receives crawl events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ScrapeEvent);
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &ScrapeEvent) {}
}

/// Writes events to the tracing log.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::PageStarted { page, max_pages, url } => {
                info!("Scraping page {}/{}: {}", page, max_pages, url);
            }
            ScrapeEvent::PageCompleted { page, found, total } => {
                info!("Page {} completed ({} products). Total products so far: {}", page, found, total);
            }
            ScrapeEvent::ProductEnriched { title, found } => {
                let short: String = title.chars().take(30).collect();
                if found.is_empty() {
                    info!("Product '{}' - no extra details found", short);
                } else {
                    info!("Product '{}' - Found: {}", short, found.join(", "));
                }
            }
            ScrapeEvent::RetryScheduled { url, attempt, wait, error } => {
                warn!("Attempt {} failed for {}: {} (retrying in {:?})", attempt, url, error, wait);
            }
            ScrapeEvent::FetchExhausted { url, attempts } => {
                warn!("All {} attempts failed for {}", attempts, url);
            }
            ScrapeEvent::CrawlFinished { pages, products } => {
                info!("Scraping completed: {} products from {} pages", products, pages);
            }
        }
    }
}

/// Forwards events to a channel, e.g. for a UI running on another task.
impl EventSink for UnboundedSender<ScrapeEvent> {
    fn emit(&self, event: &ScrapeEvent) {
        // A closed receiver only means nobody is listening anymore
        let _ = self.send(event.clone());
    }
}

/// Shared flag asking a running crawl to stop.
///
/// Checked between page fetches and between detail fetches; requests already
/// in flight complete.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
