//! WooCommerce storefront crawling: HTTP client, selector cascades, extraction, and pagination.

pub mod cascade;
pub mod client;
pub mod events;
pub mod extractor;
pub mod models;
pub mod pager;
pub mod resolver;
pub mod selectors;
pub mod session;

pub use client::{FetchError, PageFetch, ShopClient};
pub use events::{CancelFlag, EventSink, LogSink, NullSink, ScrapeEvent};
pub use extractor::Extractor;
pub use models::{Product, Statistics, StockStatus};
pub use pager::{CrawlOutcome, ExhaustReason, Pager};
pub use resolver::{Field, FieldResolver};
pub use selectors::SelectorSet;
pub use session::{CrawlReport, ScrapeSession, SessionError};
