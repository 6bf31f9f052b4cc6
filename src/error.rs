//! Crate error taxonomy.
//!
//! Everything below the orchestration layer returns `AppError`; the
//! orchestrators wrap it in `anyhow` and isolate failures per site and per
//! batch item, so none of these ever reach the top of the run. AI-service
//! failures have no variant here: the enhancement gate degrades to
//! pass-through instead of returning errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("file error: {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("navigation to {url} failed after all strategies: {last_error}")]
    NavigationFailed { url: String, last_error: String },

    #[error("DOM evaluation failed: {0}")]
    EvaluationFailed(#[from] chromiumoxide::error::CdpError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("page at {url} yielded no usable content")]
    NoContent { url: String },

    #[error("snapshot deserialization failed: {0}")]
    BadSnapshot(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("request to {endpoint} failed: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },

    #[error("serializing archive document failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("site config file {path} is invalid: {source}")]
    InvalidSitesFile {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("no sites configured")]
    NoSites,
}

pub type AppResult<T> = Result<T, AppError>;
