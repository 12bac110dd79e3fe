//! Default CSS selector cascades for WooCommerce storefronts.
//!
//! Every list is ordered by priority: the first entry that matches wins and
//! the rest are skipped. Themes and page builders rename classes freely, so
//! each cascade ends with progressively looser fallbacks.
//!
//! **Update process**: when a theme is not picked up, capture an HTML sample,
//! add the selector at the right priority, and add a test fixture. Sites can
//! also override any list through the `selectors` config table.

use crate::config::SelectorOverrides;
use crate::woo::cascade::Cascade;
use crate::woo::resolver::Field;

/// Selectors evaluated once per page.
pub mod page {
    /// Product card containers.
    pub const PRODUCT_CONTAINERS: &[&str] = &[
        "li.product",
        ".wc-block-grid__product",
        ".product-item",
        ".woocommerce-product",
        ".type-product",
        "[class*=\"product\"]",
        ".product",
        ".products li",
    ];

    /// "Next page" pagination links.
    pub const NEXT_PAGE: &[&str] = &[
        "a.next",
        ".next-page a",
        ".pagination .next",
        ".woocommerce-pagination .next",
        "a[aria-label=\"Next\"]",
        ".page-numbers.next",
    ];
}

/// Selectors evaluated inside a listing card.
pub mod listing {
    pub const TITLE: &[&str] = &[
        "h2.woocommerce-loop-product__title",
        "h3.woocommerce-loop-product__title",
        ".product-title",
        ".wc-block-grid__product-title",
        ".product-item-title",
        "a",
    ];

    pub const PRICE: &[&str] = &[
        "span.woocommerce-Price-amount",
        ".woocommerce-Price-amount bdi",
        ".price .amount",
        ".price bdi",
        ".price",
        ".wc-block-grid__product-price",
        ".product-price",
    ];

    pub const LINK: &[&str] = &[
        "a.woocommerce-LoopProduct-link",
        "a.wc-block-grid__product-link",
        ".product-item-link",
        "h2 a",
        "h3 a",
        "a",
    ];

    pub const IMAGE: &[&str] = &[
        "img.attachment-woocommerce_thumbnail",
        "img.wp-post-image",
        ".wc-block-grid__product-image img",
        ".product-image img",
        "img",
    ];

    pub const DESCRIPTION: &[&str] = &[
        ".woocommerce-product-details__short-description",
        ".product-short-description",
        ".entry-summary p",
        ".product-excerpt",
        ".product-description",
        ".wc-product-description",
        "p.product-excerpt",
        ".summary .description",
        ".product-summary p",
        "[class*=\"description\"]",
        "p",
    ];

    pub const SKU: &[&str] = &[
        ".sku",
        ".product-sku",
        ".woocommerce-product-sku",
        "[class*=\"sku\"]",
        ".product-meta .sku",
        ".product-code",
        "[data-sku]",
    ];

    pub const STOCK_STATUS: &[&str] = &[
        ".stock",
        ".availability",
        ".in-stock",
        ".out-of-stock",
        ".stock-status",
        ".woocommerce-stock-status",
        "[class*=\"stock\"]",
        ".product-stock",
        ".inventory-status",
    ];

    pub const CATEGORY: &[&str] = &[
        ".product-category",
        ".category",
        ".woocommerce-product-category",
        ".product-cat",
        "[class*=\"category\"]",
        ".breadcrumb a",
        ".product-meta .category",
    ];
}

/// Selectors evaluated against a whole product detail page.
pub mod detail {
    pub const DESCRIPTION: &[&str] = &[
        ".woocommerce-product-details__short-description",
        ".product-short-description",
        ".entry-summary .woocommerce-product-details__short-description",
        ".summary .woocommerce-product-details__short-description",
        ".entry-content p",
        ".product-description",
        ".short-description",
        ".wc-tab-content p",
    ];

    pub const SKU: &[&str] = &[
        ".sku",
        ".product_meta .sku",
        ".woocommerce-product-sku",
        ".product-sku",
        "[itemprop=\"sku\"]",
    ];

    pub const STOCK_STATUS: &[&str] = &[
        ".stock",
        ".availability p",
        ".woocommerce-stock-status",
        ".in-stock",
        ".out-of-stock",
        ".stock-status",
    ];

    pub const CATEGORY: &[&str] = &[
        ".woocommerce-breadcrumb a",
        ".breadcrumb a",
        ".product_meta .posted_in a",
        ".product-category a",
        ".entry-meta .category a",
    ];
}

/// Classes that mark availability without any text.
pub mod stock_markers {
    use scraper::Selector;
    use std::sync::LazyLock;

    pub static IN_STOCK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".in-stock").unwrap());

    pub static OUT_OF_STOCK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".out-of-stock").unwrap());
}

/// Cascades for the fields resolvable in one scope (listing card or detail page).
#[derive(Debug, Clone)]
pub struct FieldCascades {
    cascades: Vec<(Field, Cascade)>,
}

impl FieldCascades {
    /// Returns the cascade for a field, if this scope resolves it.
    pub fn get(&self, field: Field) -> Option<&Cascade> {
        self.cascades.iter().find(|(f, _)| *f == field).map(|(_, c)| c)
    }
}

/// Every cascade used during a crawl, merged from defaults and config overrides.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub containers: Cascade,
    pub next_page: Cascade,
    pub listing: FieldCascades,
    pub detail: FieldCascades,
}

impl SelectorSet {
    /// Merges config overrides over the built-in defaults.
    pub fn from_overrides(overrides: &SelectorOverrides) -> Self {
        let pick = |field: Field, over: &Option<Vec<String>>, defaults: &[&str]| {
            (field, Cascade::with_override(field.as_str(), over.as_deref(), defaults))
        };

        let listing_fields = FieldCascades {
            cascades: vec![
                pick(Field::Title, &overrides.title, listing::TITLE),
                pick(Field::Price, &overrides.price, listing::PRICE),
                pick(Field::Link, &overrides.link, listing::LINK),
                pick(Field::Image, &overrides.image, listing::IMAGE),
                pick(Field::Description, &overrides.description, listing::DESCRIPTION),
                pick(Field::Sku, &overrides.sku, listing::SKU),
                pick(Field::StockStatus, &overrides.stock_status, listing::STOCK_STATUS),
                pick(Field::Category, &overrides.category, listing::CATEGORY),
            ],
        };

        let d = &overrides.detail;
        let detail_fields = FieldCascades {
            cascades: vec![
                pick(Field::Description, &d.description, detail::DESCRIPTION),
                pick(Field::Sku, &d.sku, detail::SKU),
                pick(Field::StockStatus, &d.stock_status, detail::STOCK_STATUS),
                pick(Field::Category, &d.category, detail::CATEGORY),
            ],
        };

        Self {
            containers: Cascade::with_override(
                "product_containers",
                overrides.product_containers.as_deref(),
                page::PRODUCT_CONTAINERS,
            ),
            next_page: Cascade::with_override(
                "next_page",
                overrides.next_page.as_deref(),
                page::NEXT_PAGE,
            ),
            listing: listing_fields,
            detail: detail_fields,
        }
    }
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self::from_overrides(&SelectorOverrides::default())
    }
}
