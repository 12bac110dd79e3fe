//! Configuration management with TOML/JSON files, environment variables, and CLI overrides.

use crate::woo::selectors::SelectorSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Browser-like headers sent when the config does not replace them.
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Proxy URL (e.g., socks5://host:port). `{session}` is replaced with a
    /// random sticky-session id.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Route requests through `proxy` when one is set
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,

    /// Fixed pause after every successful request, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per URL before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of listing pages to crawl
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Fetch detail pages for products missing a description
    #[serde(default)]
    pub fetch_detailed: bool,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// HTTP request headers, merged over the built-in defaults
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Selector cascade overrides
    #[serde(default)]
    pub selectors: SelectorOverrides,

    /// Default export file names
    #[serde(default, rename = "export_options")]
    pub export: ExportOptions,
}

fn default_use_proxy() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            use_proxy: default_use_proxy(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_pages: default_max_pages(),
            fetch_detailed: false,
            format: OutputFormat::Table,
            headers: BTreeMap::new(),
            selectors: SelectorOverrides::default(),
            export: ExportOptions::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file, or JSON when the extension is `.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(path, &content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Loads configuration with fallback to default locations.
    ///
    /// A config file that exists but cannot be parsed is reported and
    /// replaced by the defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file_or_default(path);
        }

        // 2. Try current directory
        for name in ["config.toml", "config.json"] {
            let local_config = Path::new(name);
            if local_config.exists() {
                debug!("Found {} in current directory", name);
                return Self::from_file_or_default(local_config);
            }
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("woo-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file_or_default(&xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn from_file_or_default(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        match Self::parse(path, &content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Invalid config file {}: {}. Using defaults.", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("WOO_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("WOO_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(pages) = std::env::var("WOO_MAX_PAGES") {
            if let Ok(p) = pages.parse() {
                self.max_pages = p;
            }
        }

        self
    }

    /// Rejects settings no run can use, after every override layer is applied.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_pages >= 1, "max_pages must be at least 1 (got {})", self.max_pages);
        Ok(())
    }

    /// The proxy to use, if any.
    ///
    /// Blank proxy strings count as unset.
    pub fn effective_proxy(&self) -> Option<&str> {
        if !self.use_proxy {
            return None;
        }
        match self.proxy.as_deref().map(str::trim) {
            Some("") => {
                warn!("Proxy enabled but no proxy URL configured; connecting directly");
                None
            }
            other => other,
        }
    }

    /// Request headers: built-in defaults with configured values replacing
    /// same-named entries (case-insensitive).
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = DEFAULT_HEADERS
            .iter()
            .filter(|(name, _)| !self.headers.keys().any(|k| k.eq_ignore_ascii_case(name)))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    /// Compiles the selector cascades.
    pub fn selector_set(&self) -> SelectorSet {
        SelectorSet::from_overrides(&self.selectors)
    }
}

/// Per-field selector overrides. Absent lists keep the built-in cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorOverrides {
    pub title: Option<Vec<String>>,
    pub price: Option<Vec<String>>,
    pub link: Option<Vec<String>>,
    pub image: Option<Vec<String>>,
    pub description: Option<Vec<String>>,
    pub sku: Option<Vec<String>>,
    pub stock_status: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
    pub product_containers: Option<Vec<String>>,
    pub next_page: Option<Vec<String>>,
    /// Cascades used on product detail pages
    pub detail: DetailSelectorOverrides,
}

/// Selector overrides for product detail pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectorOverrides {
    pub description: Option<Vec<String>>,
    pub sku: Option<Vec<String>>,
    pub stock_status: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
}

/// Default export file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default = "default_json_file")]
    pub default_json_file: String,
    #[serde(default = "default_csv_file")]
    pub default_csv_file: String,
}

fn default_json_file() -> String {
    "products.json".to_string()
}

fn default_csv_file() -> String {
    "products.csv".to_string()
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { default_json_file: default_json_file(), default_csv_file: default_csv_file() }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
