//! Job file language for drover.
//!
//! A job file is a list of `<provider> <title> { ... }` blocks. Parsing runs in
//! three stages: the [`lexer`] turns text into tokens, the assembler builds a
//! JSON document from them, and [`json::promote`] flattens each block's
//! property list into one object. [`parse_job`] and [`scan_directory`] produce
//! [`drover_model::JobDefinition`]s ready for dispatch.
mod assemble;
pub use assemble::assemble;

mod error;
pub use error::{DslError, DslResult};

pub mod json;
pub mod lexer;

mod parser;
pub use parser::{ParsedBlock, ProviderCatalog, parse_blocks, parse_job};

mod scan;
pub use scan::{JOB_FILE_EXTENSION, ScanFailure, ScanReport, scan_directory};
