//! Synthetic leakage-current readings for the test result tables

use std::ops::RangeInclusive;

use rand::Rng;

use crate::document::{CellFormat, DocumentStructure, RegionKind, TableView};

/// Rows shorter than this are not result rows
pub const MIN_RESULT_CELLS: usize = 14;

/// Grid positions receiving the reading
pub const MEASURED_CELLS: RangeInclusive<usize> = 11..=13;

/// Reading range for a row, keyed by the trimmed text of its first cell
pub fn reading_range(discriminator: &str) -> Option<RangeInclusive<u32>> {
    match discriminator {
        "1" => Some(54..=94),
        "2" => Some(112..=194),
        _ => None,
    }
}

pub fn format_reading(value: u32) -> String {
    format!("{value}\u{b5}A")
}

/// Write one random reading into cells 11 to 13 of every result row of the
/// top-level body tables. Tables nested inside cells are not searched.
///
/// A result row has at least [`MIN_RESULT_CELLS`] cells and a first cell
/// reading "1" or "2". Each such row gets a single draw shared by its three
/// cells. Other rows are not touched. Returns the number of rows written.
pub fn randomize_measured_values<R: Rng + ?Sized>(
    doc: &mut dyn DocumentStructure,
    format: &CellFormat,
    rng: &mut R,
) -> usize {
    let mut rows = 0;
    doc.for_each_region(&mut |kind, region| {
        if kind != RegionKind::Body {
            return;
        }
        region.for_each_table(&mut |table| rows += randomize_table(table, format, &mut *rng));
    });
    rows
}

fn randomize_table<R: Rng + ?Sized>(
    table: &mut dyn TableView,
    format: &CellFormat,
    rng: &mut R,
) -> usize {
    let mut rows = 0;
    for row in 0..table.row_count() {
        if table.cell_count(row) < MIN_RESULT_CELLS {
            continue;
        }
        let discriminator = table.cell_text(row, 0).unwrap_or_default();
        let Some(range) = reading_range(discriminator.trim()) else {
            continue;
        };

        let reading = format_reading(rng.random_range(range));
        for cell in MEASURED_CELLS {
            table.write_cell(row, cell, &reading, format);
        }
        log::debug!("row {row}: reading {reading}");
        rows += 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::testing::{docx_package, paragraph, table, DocxParts};
    use crate::document::DocxDocument;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn result_row(first: &str) -> Vec<String> {
        let mut cells = vec![first.to_string()];
        cells.extend((1..14).map(|i| format!("c{i}")));
        cells
    }

    fn open_table(rows: &[Vec<String>]) -> DocxDocument {
        let rows: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        DocxDocument::from_bytes(&docx_package(&DocxParts::body(&table(&rows)))).unwrap()
    }

    fn row_texts(doc: &mut DocxDocument) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        doc.for_each_region(&mut |_, region| {
            region.for_each_table(&mut |t| {
                for row in 0..t.row_count() {
                    out.push(
                        (0..t.cell_count(row))
                            .map(|c| t.cell_text(row, c).unwrap_or_default())
                            .collect(),
                    );
                }
            });
        });
        out
    }

    fn parse_reading(text: &str) -> u32 {
        text.strip_suffix("\u{b5}A").unwrap().parse().unwrap()
    }

    #[test]
    fn test_reading_range() {
        assert_eq!(reading_range("1"), Some(54..=94));
        assert_eq!(reading_range("2"), Some(112..=194));
        assert_eq!(reading_range("3"), None);
        assert_eq!(reading_range(""), None);
    }

    #[test]
    fn test_row_one_gets_shared_reading_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..25 {
            let mut doc = open_table(&[result_row("1")]);
            let written = randomize_measured_values(&mut doc, &CellFormat::default(), &mut rng);
            assert_eq!(written, 1);

            let rows = row_texts(&mut doc);
            let row = &rows[0];
            assert_eq!(row[11], row[12]);
            assert_eq!(row[12], row[13]);
            assert!((54..=94).contains(&parse_reading(&row[11])));
            assert_eq!(row[10], "c10");
        }
    }

    #[test]
    fn test_row_two_uses_upper_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..25 {
            let mut doc = open_table(&[result_row(" 2 ")]);
            randomize_measured_values(&mut doc, &CellFormat::default(), &mut rng);
            let rows = row_texts(&mut doc);
            assert!((112..=194).contains(&parse_reading(&rows[0][13])));
        }
    }

    #[test]
    fn test_other_rows_are_untouched() {
        let short: Vec<String> = (0..13).map(|i| if i == 0 { "1".into() } else { format!("s{i}") }).collect();
        let mut doc = open_table(&[result_row("3"), result_row("Sr."), short]);
        let before = doc.clone();

        let written = randomize_measured_values(&mut doc, &CellFormat::default(), &mut StdRng::seed_from_u64(1));

        assert_eq!(written, 0);
        assert_eq!(before, doc);
    }

    #[test]
    fn test_each_row_draws_separately() {
        let rows: Vec<Vec<String>> = (0..40).map(|_| result_row("2")).collect();
        let mut doc = open_table(&rows);
        randomize_measured_values(&mut doc, &CellFormat::default(), &mut StdRng::seed_from_u64(3));

        let readings: std::collections::HashSet<String> =
            row_texts(&mut doc).into_iter().map(|r| r[11].clone()).collect();
        assert!(readings.len() > 1);
    }

    #[test]
    fn test_same_seed_same_readings() {
        let run = |seed| {
            let mut doc = open_table(&[result_row("1"), result_row("2")]);
            randomize_measured_values(&mut doc, &CellFormat::default(), &mut StdRng::seed_from_u64(seed));
            row_texts(&mut doc)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_header_tables_are_ignored() {
        let header_rows = result_row("1");
        let header_rows: Vec<&str> = header_rows.iter().map(String::as_str).collect();
        let parts = DocxParts {
            body: String::new(),
            header: Some(table(&[&header_rows])),
            footer: None,
        };
        let mut doc = DocxDocument::from_bytes(&docx_package(&parts)).unwrap();
        let written = randomize_measured_values(&mut doc, &CellFormat::default(), &mut StdRng::seed_from_u64(5));
        assert_eq!(written, 0);
    }

    #[test]
    fn test_nested_tables_are_ignored() {
        let cells = result_row("1");
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        let body = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            paragraph(&["outer"]),
            table(&[cells.as_slice()])
        );
        let mut doc = DocxDocument::from_bytes(&docx_package(&DocxParts::body(&body))).unwrap();
        let before = doc.clone();

        let written = randomize_measured_values(&mut doc, &CellFormat::default(), &mut StdRng::seed_from_u64(9));

        assert_eq!(written, 0);
        assert_eq!(before, doc);
    }
}
