//! Page driver.
//!
//! Owns exactly one browser page and exposes the capabilities the layers
//! above need: DOM evaluation returning serializable data, static-resource
//! blocking, and navigation. Knows nothing about programs or sites.

use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::error::{AppResult, BrowserError, ExtractionError};

/// Navigation strategies, tried in declaration order. Each degrades the
/// wait condition and gets its own timeout; a later attempt is a retry
/// within the same call, not a fresh error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavStrategy {
    /// Navigate and wait for the page to finish its navigation lifecycle.
    DomContentLoaded,
    /// Navigate without waiting for the full lifecycle.
    Load,
    /// Bare CDP navigate; returns as soon as the navigation is committed.
    Commit,
}

impl NavStrategy {
    pub const CHAIN: [NavStrategy; 3] = [
        NavStrategy::DomContentLoaded,
        NavStrategy::Load,
        NavStrategy::Commit,
    ];

    pub fn timeout(self) -> Duration {
        match self {
            NavStrategy::DomContentLoaded => Duration::from_secs(15),
            NavStrategy::Load => Duration::from_secs(25),
            NavStrategy::Commit => Duration::from_secs(10),
        }
    }
}

/// Blocked for every page: images, styles, fonts and media are dead weight
/// for text extraction.
const BLOCKED_RESOURCE_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.webp", "*.ico", "*.css", "*.woff",
    "*.woff2", "*.ttf", "*.otf", "*.mp4", "*.webm", "*.mp3", "*.avi",
];

pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Block image/stylesheet/font/media requests for the lifetime of this
    /// page.
    pub async fn block_static_resources(&self) -> AppResult<()> {
        let patterns: Vec<String> = BLOCKED_RESOURCE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        self.page
            .execute(SetBlockedUrLsParams::new(patterns))
            .await
            .map_err(BrowserError::EvaluationFailed)?;
        Ok(())
    }

    /// Navigate via the strategy chain. Terminal on first success; the
    /// error carries the last strategy's failure once the chain is
    /// exhausted.
    pub async fn navigate(&self, url: &str) -> AppResult<NavStrategy> {
        let mut last_error = String::new();

        for strategy in NavStrategy::CHAIN {
            match self.attempt(url, strategy).await {
                Ok(()) => {
                    debug!("navigated to {} via {:?}", url, strategy);
                    return Ok(strategy);
                }
                Err(e) => {
                    warn!("{:?} navigation to {} failed: {}", strategy, url, e);
                    last_error = e;
                }
            }
        }

        Err(BrowserError::NavigationFailed {
            url: url.to_string(),
            last_error,
        }
        .into())
    }

    async fn attempt(&self, url: &str, strategy: NavStrategy) -> Result<(), String> {
        let budget = strategy.timeout();
        match strategy {
            NavStrategy::DomContentLoaded => timeout(budget, async {
                self.page.goto(url).await.map_err(|e| e.to_string())?;
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(())
            })
            .await
            .map_err(|_| format!("timed out after {:?}", budget))?,
            NavStrategy::Load => timeout(budget, async {
                self.page.goto(url).await.map_err(|e| e.to_string())?;
                Ok(())
            })
            .await
            .map_err(|_| format!("timed out after {:?}", budget))?,
            NavStrategy::Commit => timeout(budget, async {
                self.page
                    .execute(NavigateParams::new(url))
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(())
            })
            .await
            .map_err(|_| format!("timed out after {:?}", budget))?,
        }
    }

    /// Evaluate JS in the page, returning JSON.
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(BrowserError::EvaluationFailed)?;
        let json_value = result.into_value().map_err(ExtractionError::BadSnapshot)?;
        Ok(json_value)
    }

    /// Evaluate JS and deserialize the result.
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed = serde_json::from_value(json_value).map_err(ExtractionError::BadSnapshot)?;
        Ok(typed)
    }

    /// Close the underlying page, ignoring errors from already-gone pages.
    pub async fn close(self) {
        let _ = self.page.close().await;
    }
}
