//! CLI command implementations

pub mod completions;
pub mod fields;
pub mod generate;
pub mod serve;
