//! Runtime configuration.
//!
//! Global knobs come from environment variables with compiled defaults;
//! per-site crawl policy comes from a TOML file (`sites.toml` by default)
//! with a compiled-in fallback list for out-of-the-box runs.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppResult, ConfigError};

/// Process-wide configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the per-site TOML policy file.
    pub sites_file: String,
    /// Where the timestamped JSON output artifact is written.
    pub output_dir: String,
    /// Plain-text run log file.
    pub output_log_file: String,
    // --- AI enhancement ---
    pub ai_enabled: bool,
    pub ai_api_key: String,
    pub ai_api_base_url: String,
    pub ai_model_name: String,
    // --- persistence collaborator ---
    pub store_api_base_url: String,
    pub store_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites_file: "sites.toml".to_string(),
            output_dir: "output".to_string(),
            output_log_file: "crawl_log.txt".to_string(),
            ai_enabled: true,
            ai_api_key: String::new(),
            ai_api_base_url: "https://api.openai.com/v1".to_string(),
            ai_model_name: "gpt-4o-mini".to_string(),
            store_api_base_url: "http://localhost:54321/rest/v1".to_string(),
            store_api_key: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            sites_file: std::env::var("SITES_FILE").unwrap_or(default.sites_file),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            ai_enabled: std::env::var("AI_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.ai_enabled),
            ai_api_key: std::env::var("AI_API_KEY").unwrap_or(default.ai_api_key),
            ai_api_base_url: std::env::var("AI_API_BASE_URL").unwrap_or(default.ai_api_base_url),
            ai_model_name: std::env::var("AI_MODEL_NAME").unwrap_or(default.ai_model_name),
            store_api_base_url: std::env::var("STORE_API_BASE_URL").unwrap_or(default.store_api_base_url),
            store_api_key: std::env::var("STORE_API_KEY").unwrap_or(default.store_api_key),
        }
    }
}

/// Static per-site crawl policy. Immutable once loaded.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    /// Selector for the program title heading.
    #[serde(default = "default_heading_selector")]
    pub heading_selector: String,
    /// Selector for the first-meaningful-paragraph fallback.
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
    /// Selector for subprogram anchor candidates.
    #[serde(default = "default_subprogram_selector")]
    pub subprogram_selector: String,
    /// Overrides the default funding-keyword pattern for link discovery.
    #[serde(default)]
    pub keyword_pattern: Option<String>,
    /// Pages crawled at once within this site.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Whether detail pages are mined for nested subprogram links.
    #[serde(default)]
    pub follow_subprograms: bool,
    #[serde(default = "default_max_links")]
    pub max_links: usize,
    #[serde(default = "default_max_subprograms")]
    pub max_subprograms: usize,
}

fn default_heading_selector() -> String {
    "h1, .page-title, .entry-title".to_string()
}

fn default_content_selector() -> String {
    "p".to_string()
}

fn default_subprogram_selector() -> String {
    "main a, article a, .content a".to_string()
}

fn default_concurrency() -> usize {
    3
}

fn default_max_links() -> usize {
    25
}

fn default_max_subprograms() -> usize {
    10
}

#[derive(Deserialize)]
struct SitesFile {
    #[serde(default)]
    sites: Vec<SiteConfig>,
}

/// Load site policies from `path`. A missing file falls back to the
/// compiled-in defaults; a malformed file is an error, not a silent
/// fallback.
pub fn load_site_configs(path: &str) -> AppResult<Vec<SiteConfig>> {
    if !Path::new(path).exists() {
        warn!("site config {} not found, using built-in defaults", path);
        return Ok(default_sites());
    }

    let raw = fs::read_to_string(path).map_err(|source| crate::error::AppError::File {
        path: path.to_string(),
        source,
    })?;

    let parsed: SitesFile =
        toml::from_str(&raw).map_err(|source| ConfigError::InvalidSitesFile {
            path: path.to_string(),
            source,
        })?;

    if parsed.sites.is_empty() {
        return Err(ConfigError::NoSites.into());
    }
    Ok(parsed.sites)
}

fn default_sites() -> Vec<SiteConfig> {
    let toml_src = r#"
        [[sites]]
        name = "Department of Small Business Development"
        url = "http://www.dsbd.gov.za/?page_id=134"
        follow_subprograms = true
        concurrency = 3

        [[sites]]
        name = "Industrial Development Corporation"
        url = "https://www.idc.co.za/funding-products/"
        follow_subprograms = true
        concurrency = 3

        [[sites]]
        name = "Small Enterprise Development Agency"
        url = "http://www.seda.org.za/MyBusiness/Pages/Finance.aspx"
        concurrency = 2
        max_links = 15
    "#;
    let parsed: SitesFile = toml::from_str(toml_src).expect("built-in site list is valid");
    parsed.sites
}
