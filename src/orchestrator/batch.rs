//! Batch crawl controller.
//!
//! Processes work items in fixed-size batches: every item in a batch runs
//! on its own spawned task, the whole batch is joined before the next
//! begins, one item's failure or panic contributes nothing and aborts
//! nothing, and a short delay separates batches so a single origin is not
//! hammered.

use std::future::Future;
use std::sync::Arc;

use chromiumoxide::Browser;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::config::SiteConfig;
use crate::infrastructure::PageDriver;
use crate::services::ai_gate::AiGate;
use crate::workflow::{extract_program, Extraction};

/// Pause between batches.
pub const INTER_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Run `worker` over `items`, at most `concurrency` at a time, batchwise.
/// Each item's future is spawned onto its own task under a semaphore
/// permit; successes come back in item order. Failures and panicked
/// workers are logged and dropped.
pub async fn run_in_batches<I, R, F, Fut>(items: Vec<I>, concurrency: usize, worker: F) -> Vec<R>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut iter = items.into_iter();
    let mut batch_num = 0usize;

    loop {
        let batch: Vec<I> = iter.by_ref().take(concurrency).collect();
        if batch.is_empty() {
            break;
        }
        batch_num += 1;
        debug!("batch {} of {} items", batch_num, batch.len());

        let mut handles = Vec::with_capacity(batch.len());
        for item in batch {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let fut = worker(item);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                fut.await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => warn!("batch item failed, continuing: {:#}", e),
                Err(e) => warn!("batch task panicked, continuing: {}", e),
            }
        }

        if iter.len() > 0 {
            sleep(INTER_BATCH_DELAY).await;
        }
    }
    results
}

/// Crawl a list of detail-page URLs for one site. Each worker owns one
/// fresh browser page for the duration of its item.
pub async fn crawl_batch(
    browser: &Arc<Browser>,
    urls: Vec<String>,
    site: &SiteConfig,
    parent: Option<(String, String)>,
    ai: &Arc<AiGate>,
) -> Vec<Extraction> {
    let worker = |url: String| {
        let browser = Arc::clone(browser);
        let site = site.clone();
        let parent = parent.clone();
        let ai = Arc::clone(ai);
        async move {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| anyhow::anyhow!("page creation failed: {}", e))?;
            let driver = PageDriver::new(page);
            let parent_ref = parent.as_ref().map(|(n, s)| (n.as_str(), s.as_str()));

            let result = async {
                driver.block_static_resources().await?;
                extract_program(&driver, &url, &site, parent_ref, &ai).await
            }
            .await;

            driver.close().await;
            result.map_err(|e| anyhow::anyhow!("{}: {}", url, e))
        }
    };

    run_in_batches(urls, site.concurrency, worker).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn one_failure_does_not_sink_the_batch() {
        let out = run_in_batches(vec![1, 2, 3, 4], 4, |n| async move {
            if n == 3 {
                anyhow::bail!("boom");
            }
            Ok(n * 10)
        })
        .await;
        assert_eq!(out, vec![10, 20, 40]);
    }

    #[tokio::test]
    async fn a_panicking_worker_does_not_sink_the_batch() {
        let out = run_in_batches(vec![1, 2, 3], 3, |n| async move {
            if n == 2 {
                panic!("worker died");
            }
            Ok(n)
        })
        .await;
        assert_eq!(out, vec![1, 3]);
    }

    #[tokio::test]
    async fn batches_complete_before_the_next_starts() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = run_in_batches((0..6).collect(), 2, |_n: usize| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(out.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn full_width_concurrency_runs_every_item_at_once() {
        // All items must be in flight together for the barrier to release;
        // any cap below the item count would deadlock here.
        let barrier = Arc::new(tokio::sync::Barrier::new(6));

        let out = run_in_batches((0..6).collect(), 6, |_n: usize| {
            let barrier = barrier.clone();
            async move {
                barrier.wait().await;
                Ok(())
            }
        })
        .await;
        assert_eq!(out.len(), 6);
    }

    #[tokio::test]
    async fn successes_come_back_in_item_order() {
        // A slow first item within a batch must not displace later results.
        let out = run_in_batches(vec![30u64, 1, 2], 3, |delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(delay)
        })
        .await;
        assert_eq!(out, vec![30, 1, 2]);
    }

    #[tokio::test]
    async fn inter_batch_delay_applies_between_batches_only() {
        let start = Instant::now();
        run_in_batches(vec![1, 2], 1, |_n: i32| async move { Ok(()) }).await;
        assert!(start.elapsed() >= INTER_BATCH_DELAY);

        let start = Instant::now();
        run_in_batches(vec![1, 2], 2, |_n: i32| async move { Ok(()) }).await;
        assert!(start.elapsed() < INTER_BATCH_DELAY);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let out = run_in_batches(vec![1], 0, |n| async move { Ok(n) }).await;
        assert_eq!(out, vec![1]);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out: Vec<i32> = run_in_batches(Vec::<i32>::new(), 3, |n| async move { Ok(n) }).await;
        assert!(out.is_empty());
    }
}
