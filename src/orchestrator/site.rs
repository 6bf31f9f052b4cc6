//! Site crawl orchestrator.
//!
//! One site, end to end: extract the entry page as the main program,
//! discover sibling candidate links, recurse the batch controller over the
//! main program's subprogram links and over the siblings, then validate
//! and deduplicate. A failure here is site-fatal; the run coordinator
//! decides what that costs.

use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::infrastructure::PageDriver;
use crate::models::{dedupe_programs, ProgramRecord};
use crate::services::ai_gate::AiGate;
use crate::services::link_discovery;
use crate::orchestrator::batch;
use crate::workflow::extract_program;

/// Crawl one site and return its validated, deduplicated program records.
/// Subprogram records come back tagged with their parent's name and
/// source; everything else is a top-level candidate.
pub async fn crawl_and_extract(
    browser: &Arc<Browser>,
    site: &SiteConfig,
    ai: &Arc<AiGate>,
) -> Result<Vec<ProgramRecord>> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("entry page creation failed")?;
    let driver = PageDriver::new(page);

    let result = crawl_site_inner(browser, &driver, site, ai).await;
    driver.close().await;
    result
}

async fn crawl_site_inner(
    browser: &Arc<Browser>,
    driver: &PageDriver,
    site: &SiteConfig,
    ai: &Arc<AiGate>,
) -> Result<Vec<ProgramRecord>> {
    driver.block_static_resources().await?;

    // The entry page is both the main program and the link source; one
    // navigation serves both.
    let main = extract_program(driver, &site.url, site, None, ai)
        .await
        .with_context(|| format!("entry page extraction failed for {}", site.url))?;
    let sibling_links = link_discovery::discover_links(driver, &site.url, site).await?;

    info!(
        "[{}] main program '{}', {} sibling links, {} subprogram links",
        site.name,
        main.record.name,
        sibling_links.len(),
        main.subprogram_links.len()
    );

    let mut candidates: Vec<ProgramRecord> = vec![main.record.clone()];

    if site.follow_subprograms && !main.subprogram_links.is_empty() {
        let parent = (main.record.name.clone(), main.record.source.clone());
        let children = batch::crawl_batch(
            browser,
            main.subprogram_links.clone(),
            site,
            Some(parent),
            ai,
        )
        .await;
        debug!("[{}] {} subprogram records", site.name, children.len());
        candidates.extend(children.into_iter().map(|e| e.record));
    }

    let siblings = batch::crawl_batch(browser, sibling_links, site, None, ai).await;
    debug!("[{}] {} sibling records", site.name, siblings.len());
    candidates.extend(siblings.into_iter().map(|e| e.record));

    Ok(finalize(candidates))
}

/// Validity filter plus `(name, source)` dedupe, first seen wins.
pub fn finalize(candidates: Vec<ProgramRecord>) -> Vec<ProgramRecord> {
    let validated = candidates
        .into_iter()
        .filter_map(|mut record| {
            record.scrub();
            if record.is_valid() {
                Some(record)
            } else {
                debug!("dropping invalid candidate '{}'", record.name);
                None
            }
        })
        .collect();
    dedupe_programs(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, source: &str) -> ProgramRecord {
        ProgramRecord {
            name: name.to_string(),
            source: source.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn finalize_dedupes_by_name_and_source() {
        let out = finalize(vec![
            record("Youth Enterprise Fund", "https://x.org/a"),
            record("Youth Enterprise Fund", "https://x.org/a"),
            record("Youth Enterprise Fund", "https://x.org/b"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn finalize_drops_invalid_candidates() {
        let out = finalize(vec![
            record("<![CDATA[junk]]>", "https://x.org/a"),
            record("Agro-processing Support Scheme", "https://x.org/b"),
            record("Menu", "https://x.org/c"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Agro-processing Support Scheme");
    }

    #[test]
    fn finalize_scrubs_boilerplate_eligibility() {
        let mut r = record("Agro-processing Support Scheme", "https://x.org/b");
        r.eligibility = "All rights reserved.".to_string();
        let out = finalize(vec![r]);
        assert_eq!(out[0].eligibility, "");
    }
}
