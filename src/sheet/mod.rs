//! Spreadsheet input
//!
//! Records come from the first worksheet of an `.xlsx` workbook or from a
//! `.csv` file. Either way the first non-empty row holds the column headers
//! and every following non-empty row becomes one [`FieldRecord`].

mod delimited;
mod xlsx;

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::record::FieldRecord;

pub use delimited::read_csv;
pub use xlsx::read_xlsx;

#[derive(Debug, Error, Diagnostic)]
pub enum SheetError {
    #[error("cannot read spreadsheet: {0}")]
    #[diagnostic(code(docfill::sheet::io))]
    Io(#[from] std::io::Error),

    #[error("not a readable .xlsx workbook: {0}")]
    #[diagnostic(
        code(docfill::sheet::workbook),
        help("save the spreadsheet as .xlsx, or export it as .csv")
    )]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook has no worksheet")]
    #[diagnostic(code(docfill::sheet::no_worksheet))]
    NoWorksheet,

    #[error("cannot read workbook: {0}")]
    #[diagnostic(code(docfill::sheet::unreadable))]
    Unreadable(String),

    #[error("invalid CSV: {0}")]
    #[diagnostic(code(docfill::sheet::csv))]
    Csv(#[from] csv::Error),
}

/// Cell grid with the header row split off
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Build from raw rows, skipping rows where every cell is blank.
    ///
    /// Header names are trimmed.
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));
        let headers = rows
            .next()
            .map(|row| row.into_iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }

    pub fn records(&self) -> Vec<FieldRecord> {
        self.rows
            .iter()
            .map(|row| {
                FieldRecord::from_columns(
                    self.headers
                        .iter()
                        .zip(row.iter().map(String::as_str).chain(std::iter::repeat("")))
                        .map(|(header, value)| (header.as_str(), value)),
                )
            })
            .collect()
    }
}

pub fn read_sheet(path: &Path) -> Result<Sheet, SheetError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_csv(path)
    } else {
        read_xlsx(path)
    }
}

/// Read every record of a spreadsheet, `.csv` by extension, `.xlsx` otherwise
pub fn read_records(path: &Path) -> Result<Vec<FieldRecord>, SheetError> {
    let sheet = read_sheet(path)?;
    log::debug!(
        "spreadsheet {} has columns {:?}",
        path.display(),
        sheet.headers
    );
    Ok(sheet.records())
}
