//! Container discovery, next-page discovery, and the crawl state machine.

use crate::woo::selectors::SelectorSet;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Why a crawl stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The page had no product containers.
    NoContainers,
    /// The page had no usable next-page link.
    NoNextPage,
    /// The page could not be fetched.
    FetchFailed,
    /// The next-page link points at a page already crawled.
    Revisited,
}

/// Terminal state of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    Exhausted(ExhaustReason),
    LimitReached,
    Cancelled,
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlOutcome::Exhausted(ExhaustReason::NoContainers) => {
                write!(f, "no products found on page")
            }
            CrawlOutcome::Exhausted(ExhaustReason::NoNextPage) => write!(f, "no more pages"),
            CrawlOutcome::Exhausted(ExhaustReason::FetchFailed) => write!(f, "page fetch failed"),
            CrawlOutcome::Exhausted(ExhaustReason::Revisited) => {
                write!(f, "next page already visited")
            }
            CrawlOutcome::LimitReached => write!(f, "page limit reached"),
            CrawlOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Walks listing pages from a start URL up to a page limit.
///
/// Containers are re-discovered on every page since themes may change
/// markup between pages.
pub struct Pager {
    selectors: Arc<SelectorSet>,
    base_url: Url,
    max_pages: u32,
    page: u32,
    current: String,
    visited: HashSet<String>,
}

impl Pager {
    /// Creates a pager positioned on page 1 at `start_url`.
    pub fn new(selectors: Arc<SelectorSet>, start_url: Url, max_pages: u32) -> Self {
        let current = start_url.to_string();
        let visited = HashSet::from([current.clone()]);
        Self { selectors, base_url: start_url, max_pages, page: 1, current, visited }
    }

    /// Current 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// URL of the current page.
    pub fn current_url(&self) -> &str {
        &self.current
    }

    /// True when the current page is the last one allowed.
    pub fn is_last_page(&self) -> bool {
        self.page >= self.max_pages
    }

    /// Every element matched by the first container candidate that matches.
    pub fn find_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self.selectors.containers.first_all(document.root_element()) {
            Some((source, containers)) => {
                debug!("Found {} products using selector: {}", containers.len(), source);
                containers
            }
            None => Vec::new(),
        }
    }

    /// Absolute URL of the first next-page candidate carrying a non-empty `href`.
    pub fn find_next(&self, document: &Html) -> Option<String> {
        self.selectors.next_page.find_first_map(document.root_element(), |el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            match self.base_url.join(href) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    debug!("Ignoring unresolvable next link '{}': {}", href, e);
                    None
                }
            }
        })
    }

    /// Moves to `next`, or returns the terminal outcome when the crawl stops here.
    pub fn advance(&mut self, next: Option<String>) -> Result<&str, CrawlOutcome> {
        if self.is_last_page() {
            return Err(CrawlOutcome::LimitReached);
        }

        let next = next.ok_or(CrawlOutcome::Exhausted(ExhaustReason::NoNextPage))?;
        if !self.visited.insert(next.clone()) {
            debug!("Next page {} was already crawled", next);
            return Err(CrawlOutcome::Exhausted(ExhaustReason::Revisited));
        }

        self.page += 1;
        self.current = next;
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorOverrides;

    fn pager(max_pages: u32) -> Pager {
        Pager::new(
            Arc::new(SelectorSet::default()),
            Url::parse("https://shop.test/shop/").unwrap(),
            max_pages,
        )
    }

    #[test]
    fn test_find_containers_first_matching_candidate() {
        let doc = Html::parse_document(
            r#"<html><body><ul class="products">
                <li class="product">A</li><li class="product">B</li><li class="product">C</li>
            </ul><div class="product-item">ignored</div></body></html>"#,
        );
        assert_eq!(pager(5).find_containers(&doc).len(), 3);
    }

    #[test]
    fn test_find_containers_block_theme() {
        let doc = Html::parse_document(
            r#"<html><body><ul class="wc-block-grid__products">
                <li class="wc-block-grid__product">A</li><li class="wc-block-grid__product">B</li>
            </ul></body></html>"#,
        );
        assert_eq!(pager(5).find_containers(&doc).len(), 2);
    }

    #[test]
    fn test_find_containers_none() {
        let doc = Html::parse_document("<html><body><p>Nothing for sale</p></body></html>");
        assert!(pager(5).find_containers(&doc).is_empty());
    }

    #[test]
    fn test_find_containers_override() {
        let overrides = SelectorOverrides {
            product_containers: Some(vec!["article.card".to_string()]),
            ..SelectorOverrides::default()
        };
        let pager = Pager::new(
            Arc::new(SelectorSet::from_overrides(&overrides)),
            Url::parse("https://shop.test/").unwrap(),
            1,
        );
        let doc = Html::parse_document(
            r#"<html><body><article class="card">A</article><li class="product">B</li></body></html>"#,
        );
        assert_eq!(pager.find_containers(&doc).len(), 1);
    }

    #[test]
    fn test_find_next_relative() {
        let doc = Html::parse_document(
            r#"<html><body><nav class="woocommerce-pagination">
                <a class="page-numbers" href="page/1/">1</a>
                <a class="next page-numbers" href="page/2/">&rarr;</a>
            </nav></body></html>"#,
        );
        assert_eq!(pager(5).find_next(&doc).as_deref(), Some("https://shop.test/shop/page/2/"));
    }

    #[test]
    fn test_find_next_skips_empty_href() {
        let doc = Html::parse_document(
            r#"<html><body>
                <a class="next" href="">Next</a>
                <a aria-label="Next" href="https://shop.test/shop/?paged=3">Next</a>
            </body></html>"#,
        );
        assert_eq!(pager(5).find_next(&doc).as_deref(), Some("https://shop.test/shop/?paged=3"));
    }

    #[test]
    fn test_find_next_missing() {
        let doc = Html::parse_document(r#"<html><body><span class="next">Next</span></body></html>"#);
        assert_eq!(pager(5).find_next(&doc), None);
    }

    #[test]
    fn test_advance_until_limit() {
        let mut pager = pager(2);
        assert_eq!(pager.page(), 1);
        assert!(!pager.is_last_page());

        let url = pager.advance(Some("https://shop.test/shop/page/2/".to_string())).unwrap();
        assert_eq!(url, "https://shop.test/shop/page/2/");
        assert_eq!(pager.page(), 2);
        assert!(pager.is_last_page());

        assert_eq!(
            pager.advance(Some("https://shop.test/shop/page/3/".to_string())),
            Err(CrawlOutcome::LimitReached)
        );
    }

    #[test]
    fn test_advance_without_next() {
        let mut pager = pager(5);
        assert_eq!(pager.advance(None), Err(CrawlOutcome::Exhausted(ExhaustReason::NoNextPage)));
    }

    #[test]
    fn test_advance_revisited() {
        let mut pager = pager(5);
        assert_eq!(
            pager.advance(Some("https://shop.test/shop/".to_string())),
            Err(CrawlOutcome::Exhausted(ExhaustReason::Revisited))
        );
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CrawlOutcome::LimitReached.to_string(), "page limit reached");
        assert_eq!(
            CrawlOutcome::Exhausted(ExhaustReason::NoContainers).to_string(),
            "no products found on page"
        );
    }
}
