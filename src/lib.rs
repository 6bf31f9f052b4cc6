//! # fundscout
//!
//! Crawls funding-program websites, extracts structured program records
//! from noisy HTML, classifies which programs are still open, and ships
//! the deduplicated result set to a persistence backend plus a JSON
//! archive on disk.
//!
//! ## Architecture
//!
//! Four layers, dependencies pointing strictly downward:
//!
//! ### Infrastructure
//! - `infrastructure::PageDriver` - owns one browser page; exposes
//!   navigation (with a degrading strategy chain), DOM evaluation and
//!   resource blocking, and nothing else.
//!
//! ### Capabilities
//! - `extract` - pure text normalizer, field extractors, marketing filter
//!   and deadline classifier; string in, fragment out, no I/O.
//! - `services::link_discovery` - same-origin candidate-link discovery.
//! - `services::AiGate` - quota-latched AI text cleanup.
//! - `services::ProgramStore` - persistence collaborator client.
//!
//! ### Workflow
//! - `workflow::extract_program` - one page from navigation to an
//!   assembled [`models::ProgramRecord`].
//!
//! ### Orchestration
//! - `orchestrator::batch` - fixed-size batches with per-item isolation.
//! - `orchestrator::site` - one site: discovery, subprogram recursion,
//!   validation, dedupe.
//! - `orchestrator::run::App` - all sites: fan-out, retry, merge,
//!   expired-program drop, parent/child organization, persistence.

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::{Config, SiteConfig};
pub use error::{AppError, AppResult};
pub use infrastructure::PageDriver;
pub use models::{ProgramRecord, ProgramTree};
pub use orchestrator::{organize_programs, App, RunStats};
pub use workflow::{assemble_record, extract_program, PageSnapshot};
