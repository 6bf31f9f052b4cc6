//! Orchestration layer.
//!
//! `batch` runs work items in fixed-size isolated batches, `site` owns one
//! site's crawl from entry page to deduplicated records, and `run` fans
//! sites out, merges, organizes parent/child relationships and persists.
//!
//! ```text
//! run::App           (all sites)
//!     ↓
//! site::crawl_and_extract   (one site)
//!     ↓
//! batch::crawl_batch        (one batch of detail pages)
//!     ↓
//! workflow::extract_program (one page)
//! ```

pub mod batch;
pub mod run;
pub mod site;

pub use run::{organize_programs, App, RunStats};
pub use site::crawl_and_extract;
