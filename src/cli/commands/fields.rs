//! `docfill fields` - the columns a spreadsheet can provide

use console::style;
use miette::Result;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::core::record::Field;

#[derive(clap::Args, Debug)]
pub struct FieldsArgs {
    /// Print a CSV header line to start a spreadsheet from
    #[arg(long)]
    pub template: bool,
}

pub fn run(args: FieldsArgs) -> Result<()> {
    if args.template {
        let headers: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
        println!("{}", headers.join(","));

        // Hint goes to stderr so redirected output stays a clean CSV
        eprintln!();
        eprintln!(
            "{} Template generated. Redirect to file: docfill fields --template > equipment.csv",
            style("→").blue()
        );
        return Ok(());
    }

    println!("{}", fields_table());
    Ok(())
}

fn fields_table() -> String {
    let mut builder = Builder::default();
    builder.push_record(["Column", "Placeholder"]);
    for field in Field::ALL {
        builder.push_record([field.column().to_string(), field.token()]);
    }
    builder.build().with(Style::markdown()).to_string()
}
