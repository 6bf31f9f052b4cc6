pub mod ai_gate;
pub mod link_discovery;
pub mod store;

pub use ai_gate::AiGate;
pub use link_discovery::discover_links;
pub use store::{ProgramStore, RunLogEntry};
