//! Top-level run coordinator.
//!
//! Owns the browser and the per-run collaborators, launches every
//! configured site's orchestrator concurrently on its own task, and turns
//! the merged candidates into the final parent/child program set. Site
//! failures are logged and cost that site's programs, nothing else.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::browser;
use crate::config::{self, Config, SiteConfig};
use crate::extract::deadline;
use crate::models::{ProgramRecord, ProgramTree};
use crate::orchestrator::site;
use crate::services::ai_gate::AiGate;
use crate::services::store::{self, ProgramStore, RunLogEntry};
use crate::utils::logging;

/// Backoff before the single whole-site retry.
const SITE_RETRY_BACKOFF: Duration = Duration::from_secs(5);

pub struct App {
    config: Config,
    sites: Vec<SiteConfig>,
    browser: Arc<Browser>,
    ai: Arc<AiGate>,
    store: ProgramStore,
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub sites_ok: usize,
    pub sites_failed: usize,
    pub top_level: usize,
    pub children: usize,
}

struct SiteOutcome {
    entry: RunLogEntry,
    programs: Vec<ProgramRecord>,
}

impl App {
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        let sites = config::load_site_configs(&config.sites_file)?;
        logging::log_startup(sites.len());

        let browser = Arc::new(browser::launch_headless_browser().await?);
        let ai = Arc::new(AiGate::new(&config));
        let store = ProgramStore::new(&config);

        Ok(Self {
            config,
            sites,
            browser,
            ai,
            store,
        })
    }

    pub async fn run(self) -> Result<RunStats> {
        // Every site at once, each on its own task. Cross-site pacing is
        // deliberately absent: the inter-batch delay protects a single
        // origin and lives in the batch controller.
        let handles: Vec<JoinHandle<SiteOutcome>> = self
            .sites
            .iter()
            .cloned()
            .map(|site_config| {
                let browser = Arc::clone(&self.browser);
                let ai = Arc::clone(&self.ai);
                tokio::spawn(crawl_site_isolated(browser, ai, site_config))
            })
            .collect();
        let outcomes = join_site_tasks(handles).await;

        let mut stats = RunStats::default();
        let mut merged: Vec<ProgramRecord> = Vec::new();

        for outcome in outcomes {
            if outcome.entry.status == "ok" {
                stats.sites_ok += 1;
            } else {
                stats.sites_failed += 1;
            }
            logging::append_run_log(
                &self.config.output_log_file,
                &format!(
                    "{}: {} ({} programs, {}ms){}",
                    outcome.entry.site,
                    outcome.entry.status,
                    outcome.entry.programs_found,
                    outcome.entry.duration_ms,
                    outcome
                        .entry
                        .error
                        .as_deref()
                        .map(|e| format!(" - {}", logging::truncate_text(e, 200)))
                        .unwrap_or_default()
                ),
            );
            if let Err(e) = self.store.log_run(&outcome.entry).await {
                warn!("run log entry not persisted: {}", e);
            }
            merged.extend(outcome.programs);
        }

        let open_programs: Vec<ProgramRecord> = merged
            .into_iter()
            .filter(|p| {
                let expired = deadline::is_expired(&p.deadlines);
                if expired {
                    info!("dropping expired program '{}'", p.name);
                }
                !expired
            })
            .collect();

        let trees = organize_programs(open_programs);
        stats.top_level = trees.len();
        stats.children = trees.iter().map(|t| t.subprograms.len()).sum();

        store::persist_all(&self.store, &trees, &self.config.output_dir).await?;

        logging::print_final_stats(
            stats.sites_ok,
            stats.sites_failed,
            stats.top_level,
            stats.children,
            &self.config.output_log_file,
        );
        Ok(stats)
    }
}

/// Join the spawned site tasks in launch order. A panicked site task is
/// logged and costs that site's outcome, nothing else.
async fn join_site_tasks(handles: Vec<JoinHandle<SiteOutcome>>) -> Vec<SiteOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("site task panicked: {}", e),
        }
    }
    outcomes
}

/// One site, with one retry after a fixed backoff; never returns an
/// error. The run log entry records what happened either way.
async fn crawl_site_isolated(
    browser: Arc<Browser>,
    ai: Arc<AiGate>,
    site_config: SiteConfig,
) -> SiteOutcome {
    logging::log_site_start(&site_config.name, &site_config.url);
    let started = Instant::now();

    let first = site::crawl_and_extract(&browser, &site_config, &ai).await;
    let result = match first {
        Ok(programs) => Ok(programs),
        Err(e) => {
            warn!("[{}] crawl failed, retrying once: {:#}", site_config.name, e);
            sleep(SITE_RETRY_BACKOFF).await;
            site::crawl_and_extract(&browser, &site_config, &ai).await
        }
    };

    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(programs) => {
            logging::log_site_complete(&site_config.name, programs.len(), duration_ms);
            SiteOutcome {
                entry: RunLogEntry {
                    site: site_config.name,
                    duration_ms,
                    programs_found: programs.len(),
                    status: "ok".to_string(),
                    error: None,
                },
                programs,
            }
        }
        Err(e) => {
            error!("[{}] site failed after retry: {:#}", site_config.name, e);
            SiteOutcome {
                entry: RunLogEntry {
                    site: site_config.name,
                    duration_ms,
                    programs_found: 0,
                    status: "failed".to_string(),
                    error: Some(format!("{:#}", e)),
                },
                programs: Vec::new(),
            }
        }
    }
}

/// Partition programs into top-level and children, re-attach each child to
/// the top-level program its parent reference names, and keep children
/// whose parent is absent from this run as top-level-like orphans.
pub fn organize_programs(programs: Vec<ProgramRecord>) -> Vec<ProgramTree> {
    let (children, top_level): (Vec<ProgramRecord>, Vec<ProgramRecord>) =
        programs.into_iter().partition(|p| p.is_subprogram());

    let mut trees: Vec<ProgramTree> = top_level
        .into_iter()
        .map(|program| ProgramTree {
            program,
            subprograms: Vec::new(),
        })
        .collect();

    for child in children {
        let parent = trees.iter_mut().find(|tree| {
            Some(tree.program.name.as_str()) == child.parent_program.as_deref()
                && Some(tree.program.source.as_str()) == child.parent_source.as_deref()
        });
        match parent {
            Some(tree) => tree.subprograms.push(child),
            None => {
                info!(
                    "child '{}' has no parent in this run, keeping as orphan",
                    child.name
                );
                trees.push(ProgramTree {
                    program: child,
                    subprograms: Vec::new(),
                });
            }
        }
    }
    trees
}
