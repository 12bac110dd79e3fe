//! Output formatting for products (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::woo::{Product, Statistics};

/// Rendered in text formats for absent values.
pub const NOT_AVAILABLE: &str = "N/A";

/// CSV column names, in field order.
pub const CSV_COLUMNS: &[&str] =
    &["title", "price", "link", "image_url", "description", "sku", "stock_status", "category"];

/// Formats products for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single product.
    pub fn format_product(&self, product: &Product) -> String {
        match self.format {
            OutputFormat::Json => self.json_single(product),
            OutputFormat::Table => self.table_single(product),
            OutputFormat::Markdown => self.markdown_single(product),
            OutputFormat::Csv => self.csv_products(std::slice::from_ref(product)),
        }
    }

    /// Formats multiple products.
    pub fn format_products(&self, products: &[Product]) -> String {
        if products.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::csv_header(),
                _ => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_products(products),
            OutputFormat::Table => self.table_products(products),
            OutputFormat::Markdown => self.markdown_products(products),
            OutputFormat::Csv => self.csv_products(products),
        }
    }

    /// Formats crawl statistics.
    pub fn format_statistics(&self, stats: &Statistics) -> String {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "total_products": stats.total_products,
                    "products_with_price": stats.products_with_price,
                    "products_with_image": stats.products_with_image,
                    "products_with_description": stats.products_with_description,
                    "products_with_sku": stats.products_with_sku,
                    "products_with_stock": stats.products_with_stock,
                    "products_with_category": stats.products_with_category,
                    "price_coverage": stats.price_coverage(),
                    "image_coverage": stats.image_coverage(),
                });
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Markdown => {
                let rows = [
                    ("Total products", stats.total_products.to_string()),
                    ("With price", stats.products_with_price.to_string()),
                    ("With image", stats.products_with_image.to_string()),
                    ("With description", stats.products_with_description.to_string()),
                    ("With SKU", stats.products_with_sku.to_string()),
                    ("With stock status", stats.products_with_stock.to_string()),
                    ("With category", stats.products_with_category.to_string()),
                    ("Price coverage", format!("{:.1}%", stats.price_coverage())),
                    ("Image coverage", format!("{:.1}%", stats.image_coverage())),
                ];
                let mut lines = vec!["| Statistic | Value |".to_string(), "|-----------|-------|".to_string()];
                lines.extend(rows.iter().map(|(k, v)| format!("| {} | {} |", k, v)));
                lines.join("\n")
            }
            OutputFormat::Csv => format!(
                "total_products,products_with_price,products_with_image,price_coverage,image_coverage\n{},{},{},{:.1},{:.1}",
                stats.total_products,
                stats.products_with_price,
                stats.products_with_image,
                stats.price_coverage(),
                stats.image_coverage()
            ),
            OutputFormat::Table => stats.to_string(),
        }
    }

    // JSON formatting

    fn json_single(&self, product: &Product) -> String {
        serde_json::to_string_pretty(product).unwrap_or_else(|_| "{}".to_string())
    }

    fn json_products(&self, products: &[Product]) -> String {
        serde_json::to_string_pretty(products).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_single(&self, product: &Product) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Title:       {}", or_na(Some(product.title.as_str()))));
        lines.push(format!("Price:       {}", or_na(product.price.as_deref())));
        lines.push(format!("Link:        {}", or_na(product.link.as_deref())));
        lines.push(format!("Image:       {}", or_na(product.image_url.as_deref())));

        if let Some(sku) = &product.sku {
            lines.push(format!("SKU:         {}", sku));
        }
        if let Some(stock) = &product.stock_status {
            lines.push(format!("Stock:       {}", stock));
        }
        if let Some(category) = &product.category {
            lines.push(format!("Category:    {}", category));
        }
        if let Some(description) = &product.description {
            lines.push(format!("Description: {}", description));
        }

        lines.join("\n")
    }

    fn table_products(&self, products: &[Product]) -> String {
        let price_width = 14;
        let stock_width = 14;
        let category_width = 16;
        let title_width = 50;

        let mut lines = Vec::new();

        // Header
        lines.push(format!(
            "{:<price_width$}  {:<stock_width$}  {:<category_width$}  {}",
            "Price", "Stock", "Category", "Title"
        ));
        lines.push(format!(
            "{:-<price_width$}  {:-<stock_width$}  {:-<category_width$}  {:-<title_width$}",
            "", "", "", ""
        ));

        // Rows
        for product in products {
            let price = truncate(or_na(product.price.as_deref()), price_width);
            let stock = truncate(
                product.stock_status.as_ref().map(|s| s.as_str()).unwrap_or(NOT_AVAILABLE),
                stock_width,
            );
            let category = truncate(or_na(product.category.as_deref()), category_width);
            let title = truncate(or_na(Some(product.title.as_str())), title_width);

            lines.push(format!(
                "{:<price_width$}  {:<stock_width$}  {:<category_width$}  {}",
                price, stock, category, title
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", products.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_single(&self, product: &Product) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## {}", or_na(Some(product.title.as_str()))));
        lines.push(String::new());

        if let Some(price) = &product.price {
            lines.push(format!("- **Price:** {}", price));
        }
        if let Some(link) = &product.link {
            lines.push(format!("- **URL:** [View product]({})", link));
        }
        if let Some(sku) = &product.sku {
            lines.push(format!("- **SKU:** {}", sku));
        }
        if let Some(stock) = &product.stock_status {
            lines.push(format!("- **Stock:** {}", stock));
        }
        if let Some(category) = &product.category {
            lines.push(format!("- **Category:** {}", category));
        }
        if let Some(image) = &product.image_url {
            lines.push(format!("- **Image:** ![]({})", image));
        }
        if let Some(description) = &product.description {
            lines.push(String::new());
            lines.push(description.clone());
        }

        lines.join("\n")
    }

    fn markdown_products(&self, products: &[Product]) -> String {
        let mut lines = Vec::new();

        lines.push("| Price | Stock | SKU | Title |".to_string());
        lines.push("|-------|-------|-----|-------|".to_string());

        for product in products {
            let title = truncate(or_na(Some(product.title.as_str())), 40).replace('|', "\\|");
            let title = match &product.link {
                Some(link) => format!("[{}]({})", title, link),
                None => title,
            };

            lines.push(format!(
                "| {} | {} | {} | {} |",
                or_na(product.price.as_deref()),
                product.stock_status.as_ref().map(|s| s.as_str()).unwrap_or(NOT_AVAILABLE),
                or_na(product.sku.as_deref()),
                title
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products found*", products.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header() -> String {
        CSV_COLUMNS.join(",")
    }

    fn csv_products(&self, products: &[Product]) -> String {
        let mut lines = Vec::new();
        lines.push(Self::csv_header());

        for product in products {
            let fields: Vec<String> = csv_record(product).iter().map(|f| csv_escape(f)).collect();
            lines.push(fields.join(","));
        }

        lines.join("\n")
    }
}

/// CSV cells for a product in `CSV_COLUMNS` order.
///
/// Absent or empty title, price, link and image become "N/A"; other absent
/// fields are empty cells.
pub fn csv_record(product: &Product) -> [String; 8] {
    let optional = |value: Option<&str>| value.unwrap_or_default().to_string();

    [
        or_na(Some(product.title.as_str())).to_string(),
        or_na(product.price.as_deref()).to_string(),
        or_na(product.link.as_deref()).to_string(),
        or_na(product.image_url.as_deref()).to_string(),
        optional(product.description.as_deref()),
        optional(product.sku.as_deref()),
        optional(product.stock_status.as_ref().map(|s| s.as_str())),
        optional(product.category.as_deref()),
    ]
}

/// Quotes a CSV field when it contains a delimiter, quote, or line break.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Substitutes the sentinel for absent or empty values.
fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

/// Truncates to `width` characters, marking the cut with "...".
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::woo::StockStatus;

    fn make_product() -> Product {
        Product {
            title: "Stoneware Mug".to_string(),
            price: Some("$18.00".to_string()),
            link: Some("https://shop.test/product/mug/".to_string()),
            image_url: Some("https://shop.test/img/mug.jpg".to_string()),
            description: Some("Hand-thrown, 350ml.".to_string()),
            sku: Some("MUG-350".to_string()),
            stock_status: Some(StockStatus::InStock),
            category: Some("Mugs".to_string()),
        }
    }

    fn make_minimal_product() -> Product {
        Product::new("Minimal Product")
    }

    fn make_long_title_product() -> Product {
        Product {
            price: Some("₫1.250.000".to_string()),
            ..Product::new(
                "Bình giữ nhiệt inox cao cấp dung tích lớn giữ nóng và lạnh suốt hai mươi bốn giờ liền",
            )
        }
    }

    // JSON format tests

    #[test]
    fn test_json_single_product() {
        let output = Formatter::new(OutputFormat::Json).format_product(&make_product());

        assert!(output.contains("\"title\": \"Stoneware Mug\""));
        assert!(output.contains("\"stock_status\": \"In Stock\""));
        assert!(output.contains("MUG-350"));
    }

    #[test]
    fn test_json_absent_fields_are_null() {
        let output = Formatter::new(OutputFormat::Json).format_product(&make_minimal_product());
        assert!(output.contains("\"price\": null"));
        assert!(!output.contains("N/A"));
    }

    #[test]
    fn test_json_multiple_products() {
        let products = vec![make_product(), make_minimal_product()];
        let output = Formatter::new(OutputFormat::Json).format_products(&products);

        assert!(output.starts_with('['));
        assert!(output.ends_with(']'));
        assert!(output.contains("Stoneware Mug"));
        assert!(output.contains("Minimal Product"));
    }

    #[test]
    fn test_json_empty() {
        assert_eq!(Formatter::new(OutputFormat::Json).format_products(&[]), "[]");
    }

    // Table format tests

    #[test]
    fn test_table_single_product() {
        let output = Formatter::new(OutputFormat::Table).format_product(&make_product());

        assert!(output.contains("Title:       Stoneware Mug"));
        assert!(output.contains("Price:       $18.00"));
        assert!(output.contains("SKU:         MUG-350"));
        assert!(output.contains("Stock:       In Stock"));
        assert!(output.contains("Category:    Mugs"));
    }

    #[test]
    fn test_table_single_minimal_product() {
        let output = Formatter::new(OutputFormat::Table).format_product(&make_minimal_product());

        assert!(output.contains("Price:       N/A"));
        assert!(output.contains("Link:        N/A"));
        assert!(!output.contains("SKU:"));
        assert!(!output.contains("Description:"));
    }

    #[test]
    fn test_table_multiple_products() {
        let products = vec![make_product(), make_minimal_product()];
        let output = Formatter::new(OutputFormat::Table).format_products(&products);

        assert!(output.contains("Price"));
        assert!(output.contains("Title"));
        assert!(output.contains("----------"));
        assert!(output.contains("$18.00"));
        assert!(output.contains("In Stock"));
        assert!(output.contains("N/A"));
        assert!(output.contains("Total: 2 products"));
    }

    #[test]
    fn test_table_long_title_truncation() {
        let output = Formatter::new(OutputFormat::Table).format_products(&[make_long_title_product()]);

        assert!(output.contains("Bình giữ nhiệt"));
        assert!(output.contains("..."));
        assert!(!output.contains("hai mươi bốn giờ liền"));
    }

    #[test]
    fn test_table_empty() {
        assert_eq!(Formatter::new(OutputFormat::Table).format_products(&[]), "No products found.");
    }

    // Markdown format tests

    #[test]
    fn test_markdown_single_product() {
        let output = Formatter::new(OutputFormat::Markdown).format_product(&make_product());

        assert!(output.contains("## Stoneware Mug"));
        assert!(output.contains("- **Price:** $18.00"));
        assert!(output.contains("- **URL:** [View product](https://shop.test/product/mug/)"));
        assert!(output.contains("- **Stock:** In Stock"));
        assert!(output.contains("Hand-thrown, 350ml."));
    }

    #[test]
    fn test_markdown_single_minimal() {
        let output = Formatter::new(OutputFormat::Markdown).format_product(&make_minimal_product());

        assert!(output.contains("## Minimal Product"));
        assert!(!output.contains("- **Price:**"));
        assert!(!output.contains("- **SKU:**"));
    }

    #[test]
    fn test_markdown_multiple_products() {
        let products = vec![make_product(), make_minimal_product()];
        let output = Formatter::new(OutputFormat::Markdown).format_products(&products);

        assert!(output.contains("| Price | Stock | SKU | Title |"));
        assert!(output.contains("[Stoneware Mug](https://shop.test/product/mug/)"));
        assert!(output.contains("| N/A | N/A | N/A | Minimal Product |"));
        assert!(output.contains("*2 products found*"));
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let product = Product::new("Mug | Blue");
        let output = Formatter::new(OutputFormat::Markdown).format_products(&[product]);
        assert!(output.contains("Mug \\| Blue"));
    }

    #[test]
    fn test_markdown_empty() {
        assert_eq!(Formatter::new(OutputFormat::Markdown).format_products(&[]), "No products found.");
    }

    // CSV format tests

    #[test]
    fn test_csv_header() {
        assert_eq!(
            Formatter::csv_header(),
            "title,price,link,image_url,description,sku,stock_status,category"
        );
    }

    #[test]
    fn test_csv_single_product() {
        let output = Formatter::new(OutputFormat::Csv).format_product(&make_product());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "Stoneware Mug,$18.00,https://shop.test/product/mug/,https://shop.test/img/mug.jpg,\"Hand-thrown, 350ml.\",MUG-350,In Stock,Mugs"
        );
    }

    #[test]
    fn test_csv_sentinels() {
        let output = Formatter::new(OutputFormat::Csv).format_product(&make_minimal_product());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "Minimal Product,N/A,N/A,N/A,,,,");
    }

    #[test]
    fn test_csv_empty_title_sentinel() {
        let output = Formatter::new(OutputFormat::Csv).format_product(&Product::new(""));
        assert!(output.lines().nth(1).unwrap().starts_with("N/A,"));
    }

    #[test]
    fn test_csv_multiple_products() {
        let products = vec![make_product(), make_minimal_product(), make_long_title_product()];
        let output = Formatter::new(OutputFormat::Csv).format_products(&products);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4); // Header + 3 products
        assert!(lines[3].contains("₫1.250.000"));
    }

    #[test]
    fn test_csv_empty() {
        assert_eq!(
            Formatter::new(OutputFormat::Csv).format_products(&[]),
            "title,price,link,image_url,description,sku,stock_status,category"
        );
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("simple"), "simple");
        assert_eq!(csv_escape("with,comma"), "\"with,comma\"");
        assert_eq!(csv_escape("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(csv_escape("with\nnewline"), "\"with\nnewline\"");
        assert_eq!(csv_escape("combo,\"test\"\n"), "\"combo,\"\"test\"\"\n\"");
    }

    // Statistics tests

    #[test]
    fn test_statistics_table() {
        let stats = Statistics::from_products(&[make_product(), make_minimal_product()]);
        let output = Formatter::new(OutputFormat::Table).format_statistics(&stats);

        assert!(output.contains("Total Products: 2"));
        assert!(output.contains("Price Coverage: 50.0%"));
        assert!(output.contains("Image Coverage: 50.0%"));
    }

    #[test]
    fn test_statistics_json() {
        let stats = Statistics::from_products(&[make_product()]);
        let output = Formatter::new(OutputFormat::Json).format_statistics(&stats);

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["total_products"], 1);
        assert_eq!(value["price_coverage"], 100.0);
    }

    #[test]
    fn test_statistics_markdown_and_csv() {
        let stats = Statistics::from_products(&[]);

        let md = Formatter::new(OutputFormat::Markdown).format_statistics(&stats);
        assert!(md.contains("| Price coverage | 0.0% |"));

        let csv = Formatter::new(OutputFormat::Csv).format_statistics(&stats);
        assert_eq!(csv.lines().nth(1), Some("0,0,0,0.0,0.0"));
    }
}
