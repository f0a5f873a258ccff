//! Report assembly and output.

pub mod assembler;

pub use assembler::{finalize, generate_summary_text, write_json_report};
