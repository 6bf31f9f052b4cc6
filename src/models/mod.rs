pub mod program;

pub use program::{dedupe_programs, ProgramRecord, ProgramTree};
