//! Field resolution over listing cards and detail pages.

use crate::woo::cascade::{element_text, Cascade};
use crate::woo::models::StockStatus;
use crate::woo::selectors::{stock_markers, FieldCascades};
use scraper::ElementRef;
use std::fmt;
use url::Url;

/// Descriptions this short are usually labels like "Details".
const MIN_DESCRIPTION_CHARS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 500;

const SKU_PLACEHOLDERS: &[&str] = &["sku", "sku:", "n/a"];
const CATEGORY_PLACEHOLDERS: &[&str] =
    &["home", "shop", "trang chủ", "category", "categories", "cat"];

/// Attributes holding the image URL, eager first then lazy-load variants.
const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

/// A product field that can be resolved from markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Price,
    Link,
    Image,
    Description,
    Sku,
    StockStatus,
    Category,
}

impl Field {
    /// Returns the config key of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Price => "price",
            Field::Link => "link",
            Field::Image => "image",
            Field::Description => "description",
            Field::Sku => "sku",
            Field::StockStatus => "stock_status",
            Field::Category => "category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves product fields inside one scope using that scope's cascades.
///
/// Relative URLs are resolved against `base_url`.
pub struct FieldResolver<'a> {
    cascades: &'a FieldCascades,
    base_url: &'a Url,
}

impl<'a> FieldResolver<'a> {
    /// Creates a resolver over the given cascades.
    pub fn new(cascades: &'a FieldCascades, base_url: &'a Url) -> Self {
        Self { cascades, base_url }
    }

    /// Resolves any field to its string form.
    ///
    /// Returns `None` when nothing matched or when this scope has no cascade
    /// for the field.
    pub fn resolve(&self, scope: ElementRef, field: Field) -> Option<String> {
        match field {
            Field::Title => self.title(scope),
            Field::Price => self.price(scope),
            Field::Link => self.link(scope),
            Field::Image => self.image(scope),
            Field::Description => self.description(scope),
            Field::Sku => self.sku(scope),
            Field::StockStatus => self.stock_status(scope).map(String::from),
            Field::Category => self.category(scope),
        }
    }

    /// Text of the first title match, which may be empty.
    pub fn title(&self, scope: ElementRef) -> Option<String> {
        self.first_text(scope, Field::Title)
    }

    /// Text of the first price match, which may be empty.
    pub fn price(&self, scope: ElementRef) -> Option<String> {
        self.first_text(scope, Field::Price)
    }

    /// Absolute URL of the first match carrying a non-empty `href`.
    pub fn link(&self, scope: ElementRef) -> Option<String> {
        self.cascade(Field::Link)?.find_first_map(scope, |el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            self.absolutize(href)
        })
    }

    /// Absolute image URL from the first image match.
    pub fn image(&self, scope: ElementRef) -> Option<String> {
        let img = self.cascade(Field::Image)?.first(scope)?;
        let src = IMAGE_ATTRS
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())?;
        self.absolutize(src)
    }

    /// First description longer than the label threshold, truncated.
    pub fn description(&self, scope: ElementRef) -> Option<String> {
        self.cascade(Field::Description)?.find_first_map(scope, |el| {
            let text = element_text(el);
            if text.chars().count() > MIN_DESCRIPTION_CHARS {
                Some(text.chars().take(MAX_DESCRIPTION_CHARS).collect())
            } else {
                None
            }
        })
    }

    /// First SKU that is not a bare label, falling back to `data-sku`.
    pub fn sku(&self, scope: ElementRef) -> Option<String> {
        self.cascade(Field::Sku)?.find_first_map(scope, |el| {
            let text = element_text(el);
            if !is_placeholder(&text, SKU_PLACEHOLDERS) {
                return Some(text);
            }
            el.value()
                .attr("data-sku")
                .map(str::trim)
                .filter(|sku| !sku.is_empty())
                .map(String::from)
        })
    }

    /// Normalized availability, falling back to marker classes.
    pub fn stock_status(&self, scope: ElementRef) -> Option<StockStatus> {
        let from_text = self
            .cascade(Field::StockStatus)?
            .find_first_map(scope, |el| StockStatus::from_text(&element_text(el)));

        from_text.or_else(|| {
            if scope.select(&stock_markers::IN_STOCK).next().is_some() {
                Some(StockStatus::InStock)
            } else if scope.select(&stock_markers::OUT_OF_STOCK).next().is_some() {
                Some(StockStatus::OutOfStock)
            } else {
                None
            }
        })
    }

    /// Closest category: the last match of each candidate, skipping
    /// navigation labels like "Home".
    pub fn category(&self, scope: ElementRef) -> Option<String> {
        self.cascade(Field::Category)?.find_last_map(scope, |el| {
            let text = element_text(el);
            (!is_placeholder(&text, CATEGORY_PLACEHOLDERS)).then_some(text)
        })
    }

    fn cascade(&self, field: Field) -> Option<&'a Cascade> {
        self.cascades.get(field)
    }

    fn first_text(&self, scope: ElementRef, field: Field) -> Option<String> {
        self.cascade(field)?.first(scope).map(element_text)
    }

    fn absolutize(&self, href: &str) -> Option<String> {
        self.base_url.join(href).ok().map(String::from)
    }
}

/// Empty text or a case-insensitive match against `placeholders`.
fn is_placeholder(text: &str, placeholders: &[&str]) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || placeholders.iter().any(|p| *p == lowered)
}
