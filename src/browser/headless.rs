use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

/// Launch a headless browser. The CDP event handler runs on a background
/// task for the lifetime of the returned [`Browser`].
pub async fn launch_headless_browser() -> Result<Browser> {
    info!("launching headless browser");

    let config = BrowserConfig::builder()
        .new_headless_mode()
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ])
        .build()
        .map_err(|e| {
            error!("browser config failed: {}", e);
            anyhow::anyhow!("browser config failed: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("browser launch failed: {}", e);
        anyhow::anyhow!("browser launch failed: {}", e)
    })?;
    debug!("headless browser up");

    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Short delay for browser state to settle before the first page.
    sleep(Duration::from_millis(300)).await;

    Ok(browser)
}
