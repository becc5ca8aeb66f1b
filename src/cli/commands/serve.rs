//! `docfill serve` - the upload form over HTTP

use console::style;
use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::config::ConfigLayer;
use crate::server;

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on [default: 127.0.0.1:5000]
    #[arg(long, short = 'b', value_name = "ADDR")]
    pub bind: Option<String>,

    /// Largest accepted upload, in megabytes [default: 32]
    #[arg(long, value_name = "MB")]
    pub max_upload_mb: Option<u64>,

    /// Prefix for generated file names [default: "EST - "]
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn run(args: ServeArgs, global: &GlobalOpts) -> Result<()> {
    let config = global.config(ConfigLayer {
        bind: args.bind,
        max_upload_mb: args.max_upload_mb,
        file_prefix: args.prefix,
        ..ConfigLayer::default()
    })?;

    if !global.quiet {
        eprintln!(
            "{} Serving on {}  (Ctrl-C to stop)",
            style("→").blue(),
            style(format!("http://{}", config.bind)).cyan()
        );
    }
    server::run(&config)?;
    Ok(())
}
