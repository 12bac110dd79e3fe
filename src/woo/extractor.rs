//! Builds products from listing cards and enriches them from detail pages.

use crate::woo::client::PageFetch;
use crate::woo::events::{EventSink, ScrapeEvent};
use crate::woo::models::Product;
use crate::woo::resolver::FieldResolver;
use crate::woo::selectors::SelectorSet;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Composes the field resolver into whole product records.
pub struct Extractor {
    selectors: Arc<SelectorSet>,
    base_url: Url,
    events: Arc<dyn EventSink>,
}

impl Extractor {
    /// Creates an extractor resolving relative URLs against `base_url`.
    pub fn new(selectors: Arc<SelectorSet>, base_url: Url, events: Arc<dyn EventSink>) -> Self {
        Self { selectors, base_url, events }
    }

    /// Builds a product from one listing container.
    ///
    /// Returns `None` when no title candidate matches. A matched but empty
    /// price counts as absent.
    pub fn extract(&self, container: ElementRef) -> Option<Product> {
        let resolver = FieldResolver::new(&self.selectors.listing, &self.base_url);

        let Some(title) = resolver.title(container) else {
            debug!("Skipping container without a title match");
            return None;
        };

        Some(Product {
            title,
            price: resolver.price(container).filter(|p| !p.is_empty()),
            link: resolver.link(container),
            image_url: resolver.image(container),
            description: resolver.description(container),
            sku: resolver.sku(container),
            stock_status: resolver.stock_status(container),
            category: resolver.category(container),
        })
    }

    /// Builds products for every container, skipping rejected ones.
    pub fn extract_all<'a>(&self, containers: impl IntoIterator<Item = ElementRef<'a>>) -> Vec<Product> {
        containers.into_iter().filter_map(|c| self.extract(c)).collect()
    }

    /// Returns true when a detail fetch could add anything.
    pub fn needs_detail(product: &Product) -> bool {
        product.description.is_none() && product.link.is_some()
    }

    /// Fetches the product's detail page and fills in what it provides.
    ///
    /// Products that have a description or no link are returned untouched.
    /// A failed fetch keeps the listing values.
    pub async fn enrich(&self, fetcher: &dyn PageFetch, product: Product) -> Product {
        if !Self::needs_detail(&product) {
            return product;
        }
        let Some(link) = product.link.clone() else {
            return product;
        };

        debug!("Fetching detail page: {}", link);
        let product = match fetcher.fetch(&link).await {
            Ok(body) => self.apply_detail(&body, product),
            Err(e) => {
                warn!("Could not fetch details for '{}': {}", product.title, e);
                product
            }
        };

        self.events.emit(&ScrapeEvent::ProductEnriched {
            title: product.title.clone(),
            found: product.detail_fields(),
        });
        product
    }

    /// Overlays values resolved from a detail page body.
    ///
    /// Fields the page does not provide keep their listing values.
    pub fn apply_detail(&self, body: &str, mut product: Product) -> Product {
        let document = Html::parse_document(body);
        let root = document.root_element();
        let resolver = FieldResolver::new(&self.selectors.detail, &self.base_url);

        if let Some(description) = resolver.description(root) {
            product.description = Some(description);
        }
        if let Some(sku) = resolver.sku(root) {
            product.sku = Some(sku);
        }
        if let Some(stock) = resolver.stock_status(root) {
            product.stock_status = Some(stock);
        }
        if let Some(category) = resolver.category(root) {
            product.category = Some(category);
        }

        product
    }
}
