use clap::Parser;
use docfill::cli::{Cli, Commands, GlobalOpts};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Generate(args) => docfill::cli::commands::generate::run(args, &global),
        Commands::Serve(args) => docfill::cli::commands::serve::run(args, &global),
        Commands::Fields(args) => docfill::cli::commands::fields::run(args),
        Commands::Completions(args) => docfill::cli::commands::completions::run(args),
    }
}

/// `docfill` logs at the level picked by `--verbose`/`--quiet`; `RUST_LOG` wins
fn init_logging(global: &GlobalOpts) {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("docfill", global.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}
