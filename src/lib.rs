//! docfill: equipment spreadsheets into filled Word documents
//!
//! Every row of a spreadsheet fills one copy of a `.docx` template: `<COLUMN>`
//! placeholders take the row's values and the measured-value cells of result
//! tables get simulated readings. The copies are bundled into a zip, either
//! from the command line or through a small upload form served over HTTP.

pub mod cli;
pub mod core;
pub mod document;
pub mod server;
pub mod sheet;
