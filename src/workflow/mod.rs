pub mod extract_flow;

pub use extract_flow::{assemble_record, extract_program, Extraction, PageSnapshot};
