//! woo-crawler - Resilient WooCommerce storefront product crawler
//!
//! Cascading CSS selectors locate product fields across themes, a retrying
//! client with TLS fingerprint emulation fetches pages, and the crawl follows
//! "next page" links until the catalogue or the page limit runs out.

pub mod commands;
pub mod config;
pub mod export;
pub mod format;
pub mod woo;

pub use config::Config;
pub use woo::{CrawlReport, Product, ScrapeSession, Statistics, StockStatus};
