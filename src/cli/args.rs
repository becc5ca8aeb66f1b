//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, fields::FieldsArgs, generate::GenerateArgs, serve::ServeArgs,
};
use crate::core::config::{Config, ConfigError, ConfigLayer};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(author, version, about = "Fill Word templates from equipment spreadsheets")]
#[command(long_about = "Fills a .docx template once per spreadsheet row, replacing <COLUMN> placeholders with the row's values, and bundles the documents into a zip.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file layered over the global one
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    /// Resolve configuration with `flags` as the topmost layer
    pub fn config(&self, flags: ConfigLayer) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.config.as_deref())?;
        config.merge(flags);
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one document per spreadsheet row into a zip archive
    Generate(GenerateArgs),

    /// Serve the upload form over HTTP
    Serve(ServeArgs),

    /// List the recognized columns and their placeholders
    Fields(FieldsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
