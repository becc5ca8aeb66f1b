//! CSV spreadsheets

use std::path::Path;

use csv::ReaderBuilder;

use super::{Sheet, SheetError};

pub fn read_csv(path: &Path) -> Result<Sheet, SheetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    if let Some(first) = rows.first_mut().and_then(|row| row.first_mut()) {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }
    Ok(Sheet::from_rows(rows))
}
