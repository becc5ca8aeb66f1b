//! Core module - records, filling rules and batch generation

pub mod archive;
pub mod batch;
pub mod config;
pub mod randomizer;
pub mod record;
pub mod resolver;
pub mod workspace;

pub use batch::{
    generate_archive, BatchOptions, BatchOutput, BatchReport, GenerateError, GeneratedDocument,
};
pub use config::{Config, ConfigError, ConfigLayer};
pub use record::{Field, FieldRecord, PlaceholderMap};
pub use workspace::WorkArea;
