//! `docfill generate` - fill the template for every spreadsheet row

use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::GlobalOpts;
use crate::core::batch::{generate_archive, BatchOutput, BatchReport};
use crate::core::config::ConfigLayer;
use crate::core::workspace::WorkArea;

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Equipment spreadsheet (.xlsx, or .csv)
    pub spreadsheet: PathBuf,

    /// Word template (.docx) with <COLUMN> placeholders
    pub template: PathBuf,

    /// Where to write the zip archive
    #[arg(long, short = 'o', default_value = "documents.zip")]
    pub output: PathBuf,

    /// Seed for the measured readings, for repeatable output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prefix for generated file names [default: "EST - "]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Font of the measured readings [default: Cambria]
    #[arg(long, value_name = "FACE")]
    pub font: Option<String>,

    /// Point size of the measured readings [default: 11]
    #[arg(long, value_name = "PT")]
    pub font_size: Option<f32>,
}

pub fn run(args: GenerateArgs, global: &GlobalOpts) -> Result<()> {
    let config = global.config(ConfigLayer {
        file_prefix: args.prefix.clone(),
        measured_font: args.font.clone(),
        measured_size_pt: args.font_size,
        ..ConfigLayer::default()
    })?;
    let options = config.batch_options();

    let work = WorkArea::new().into_diagnostic()?;
    let BatchOutput { archive, report } = match args.seed {
        Some(seed) => generate_archive(
            &work,
            &args.spreadsheet,
            &args.template,
            &options,
            &mut StdRng::seed_from_u64(seed),
        ),
        None => generate_archive(
            &work,
            &args.spreadsheet,
            &args.template,
            &options,
            &mut rand::rng(),
        ),
    }?;

    std::fs::copy(&archive, &args.output).into_diagnostic()?;
    work.release();

    if !global.quiet {
        if !report.documents.is_empty() {
            println!("{}", summary_table(&report));
        }
        println!(
            "{} Wrote {} document(s) to {}",
            style("✓").green(),
            style(report.file_count()).cyan(),
            style(args.output.display()).cyan()
        );
        if report.overwritten > 0 {
            println!(
                "   {} {} row(s) shared a CLR with an earlier row and replaced its document",
                style("!").yellow(),
                report.overwritten
            );
        }
    }
    Ok(())
}

fn summary_table(report: &BatchReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Row", "CLR", "File", "Readings"]);
    for doc in &report.documents {
        builder.push_record([
            (doc.row + 1).to_string(),
            doc.reference.clone(),
            doc.file_name.clone(),
            doc.result_rows.to_string(),
        ]);
    }
    builder.build().with(Style::markdown()).to_string()
}
