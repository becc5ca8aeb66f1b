//! `.xlsx` workbooks: first worksheet only, values rendered as displayed text

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};

use super::{Sheet, SheetError};

pub fn read_xlsx(path: &Path) -> Result<Sheet, SheetError> {
    let bytes = std::fs::read(path)?;
    read_xlsx_bytes(&bytes)
}

pub fn read_xlsx_bytes(bytes: &[u8]) -> Result<Sheet, SheetError> {
    // uploads are untrusted; a panic inside calamine must not take the server down
    let range = panic::catch_unwind(AssertUnwindSafe(|| first_worksheet(bytes)))
        .map_err(|payload| SheetError::Unreadable(panic_message(payload.as_ref())))??;
    Ok(Sheet::from_rows(range.rows().map(|row| {
        row.iter().map(cell_text).collect::<Vec<_>>()
    })))
}

fn first_worksheet(bytes: &[u8]) -> Result<Range<Data>, SheetError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(SheetError::NoWorksheet)??;
    Ok(range)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "workbook reader panicked".to_string())
}

/// Text of one cell the way the equipment sheet shows it
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::Error(e) => e.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if dt.is_datetime() => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => format_number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Integral values without a fraction, others in shortest round-trip form
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
