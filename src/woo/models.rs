//! Data models for storefront products and crawl statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A product scraped from a listing card, optionally enriched from its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product title
    pub title: String,
    /// Raw price text as shown on the page (currency symbols included)
    pub price: Option<String>,
    /// Absolute URL of the product detail page
    pub link: Option<String>,
    /// Absolute URL of the product image
    pub image_url: Option<String>,
    /// Short description, at most 500 characters
    pub description: Option<String>,
    /// Stock keeping unit
    pub sku: Option<String>,
    /// Normalized availability
    pub stock_status: Option<StockStatus>,
    /// Closest category of the product
    pub category: Option<String>,
}

impl Product {
    /// Creates a product with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price: None,
            link: None,
            image_url: None,
            description: None,
            sku: None,
            stock_status: None,
            category: None,
        }
    }

    /// Names of the optional detail fields that are present.
    pub fn detail_fields(&self) -> Vec<&'static str> {
        let mut found = Vec::new();
        if self.description.is_some() {
            found.push("description");
        }
        if self.sku.is_some() {
            found.push("SKU");
        }
        if self.stock_status.is_some() {
            found.push("stock");
        }
        if self.category.is_some() {
            found.push("category");
        }
        found
    }
}

/// Availability of a product.
///
/// Known phrasings (English and Vietnamese) collapse into the first three
/// variants; anything else is kept title-cased in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    OnBackorder,
    Other(String),
}

const IN_STOCK_TOKENS: &[&str] = &["in stock", "available", "có sẵn"];
const OUT_OF_STOCK_TOKENS: &[&str] = &["out of stock", "sold out", "hết hàng"];
const BACKORDER_TOKENS: &[&str] = &["backorder", "pre-order", "đặt trước"];

impl StockStatus {
    /// Normalizes availability text. Returns `None` for blank text.
    pub fn from_text(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| lowered.contains(t));

        let status = if contains_any(IN_STOCK_TOKENS) {
            StockStatus::InStock
        } else if contains_any(OUT_OF_STOCK_TOKENS) {
            StockStatus::OutOfStock
        } else if contains_any(BACKORDER_TOKENS) {
            StockStatus::OnBackorder
        } else {
            StockStatus::Other(title_case(&lowered))
        };

        Some(status)
    }

    /// Returns the display label.
    pub fn as_str(&self) -> &str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::OnBackorder => "On Backorder",
            StockStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for StockStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "In Stock" => StockStatus::InStock,
            "Out of Stock" => StockStatus::OutOfStock,
            "On Backorder" => StockStatus::OnBackorder,
            _ => StockStatus::Other(label),
        }
    }
}

impl From<StockStatus> for String {
    fn from(status: StockStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Coverage statistics computed from a finished crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_products: usize,
    pub products_with_price: usize,
    pub products_with_image: usize,
    pub products_with_description: usize,
    pub products_with_sku: usize,
    pub products_with_stock: usize,
    pub products_with_category: usize,
}

impl Statistics {
    /// Computes statistics from an accumulated product list.
    pub fn from_products(products: &[Product]) -> Self {
        let count = |f: fn(&Product) -> bool| products.iter().filter(|p| f(p)).count();

        Self {
            total_products: products.len(),
            products_with_price: count(|p| p.price.is_some()),
            products_with_image: count(|p| p.image_url.is_some()),
            products_with_description: count(|p| p.description.is_some()),
            products_with_sku: count(|p| p.sku.is_some()),
            products_with_stock: count(|p| p.stock_status.is_some()),
            products_with_category: count(|p| p.category.is_some()),
        }
    }

    /// Share of products with a price, in percent.
    pub fn price_coverage(&self) -> f64 {
        self.percent(self.products_with_price)
    }

    /// Share of products with an image, in percent.
    pub fn image_coverage(&self) -> f64 {
        self.percent(self.products_with_image)
    }

    fn percent(&self, part: usize) -> f64 {
        if self.total_products == 0 {
            return 0.0;
        }
        part as f64 / self.total_products as f64 * 100.0
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Products: {}", self.total_products)?;
        writeln!(f, "Products With Price: {}", self.products_with_price)?;
        writeln!(f, "Products With Image: {}", self.products_with_image)?;
        writeln!(f, "Price Coverage: {:.1}%", self.price_coverage())?;
        write!(f, "Image Coverage: {:.1}%", self.image_coverage())
    }
}
