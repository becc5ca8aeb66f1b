//! One document per spreadsheet row, bundled into an archive

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use rand::Rng;
use thiserror::Error;

use crate::core::archive::bundle_directory;
use crate::core::randomizer::randomize_measured_values;
use crate::core::record::{FieldRecord, PlaceholderMap};
use crate::core::resolver::resolve_placeholders;
use crate::core::workspace::WorkArea;
use crate::document::{CellFormat, DocxDocument, DocxError};
use crate::sheet::{self, SheetError};

pub const DEFAULT_FILE_PREFIX: &str = "EST - ";
const OUTPUT_EXTENSION: &str = "docx";

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Sheet(#[from] SheetError),

    #[error("failed to load template: {0}")]
    #[diagnostic(code(docfill::template))]
    Template(#[source] DocxError),

    #[error("failed to save {}: {source}", path.display())]
    #[diagnostic(code(docfill::save))]
    Save {
        path: PathBuf,
        #[source]
        source: DocxError,
    },

    #[error("failed to write archive: {0}")]
    #[diagnostic(code(docfill::archive))]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to list generated documents: {0}")]
    #[diagnostic(code(docfill::archive))]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(docfill::io))]
    Io(#[from] std::io::Error),
}

/// Settings shared by every row of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Prepended to the reference code to name each output document
    pub file_prefix: String,
    /// Formatting of the injected readings
    pub measured: CellFormat,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            measured: CellFormat::default(),
        }
    }
}

/// One saved document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// Zero-based data row index
    pub row: usize,
    pub reference: String,
    pub file_name: String,
    pub result_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub documents: Vec<GeneratedDocument>,
    /// Rows whose output replaced an earlier row's output
    pub overwritten: usize,
}

impl BatchReport {
    /// Number of distinct files left in the output directory
    pub fn file_count(&self) -> usize {
        self.documents.len() - self.overwritten
    }
}

/// Result of a full run
#[derive(Debug)]
pub struct BatchOutput {
    pub archive: PathBuf,
    pub report: BatchReport,
}

/// Output file name for a reference code.
///
/// Path separators would let a reference code escape the output directory,
/// so they are replaced with `_`.
pub fn output_file_name(prefix: &str, reference: &str) -> String {
    let reference: String = reference
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{prefix}{reference}.{OUTPUT_EXTENSION}")
}

/// Produce the filled copy of `template` for one record
pub fn fill_document<R: Rng + ?Sized>(
    template: &DocxDocument,
    record: &FieldRecord,
    options: &BatchOptions,
    rng: &mut R,
) -> (DocxDocument, usize) {
    let mut doc = template.clone();
    resolve_placeholders(&mut doc, &PlaceholderMap::from_record(record));
    let result_rows = randomize_measured_values(&mut doc, &options.measured, rng);
    (doc, result_rows)
}

/// Fill and save one document per record into `out_dir`.
///
/// Records sharing a reference code write the same file; the later row wins.
pub fn run_batch<R: Rng + ?Sized>(
    template: &DocxDocument,
    records: &[FieldRecord],
    out_dir: &Path,
    options: &BatchOptions,
    rng: &mut R,
) -> Result<BatchReport, GenerateError> {
    let mut report = BatchReport::default();
    let mut written: HashMap<String, usize> = HashMap::new();

    for (row, record) in records.iter().enumerate() {
        let reference = record.reference_code().to_string();
        log::info!("row {}: filling template for CLR={reference}", row + 1);

        let (doc, result_rows) = fill_document(template, record, options, rng);
        let file_name = output_file_name(&options.file_prefix, &reference);
        let path = out_dir.join(&file_name);
        doc.save(&path).map_err(|source| GenerateError::Save {
            path: path.clone(),
            source,
        })?;

        if let Some(previous) = written.insert(file_name.clone(), row) {
            log::warn!(
                "row {} overwrote {file_name} from row {}",
                row + 1,
                previous + 1
            );
            report.overwritten += 1;
        }
        log::info!("saved {file_name}");

        report.documents.push(GeneratedDocument {
            row,
            reference,
            file_name,
            result_rows,
        });
    }

    Ok(report)
}

/// Read the spreadsheet and template, generate every document inside `work`
/// and bundle them into the work area's archive.
pub fn generate_archive<R: Rng + ?Sized>(
    work: &WorkArea,
    spreadsheet: &Path,
    template: &Path,
    options: &BatchOptions,
    rng: &mut R,
) -> Result<BatchOutput, GenerateError> {
    let records = sheet::read_records(spreadsheet)?;
    log::info!(
        "read {} record(s) from {}",
        records.len(),
        spreadsheet.display()
    );

    let template = DocxDocument::open(template).map_err(GenerateError::Template)?;
    let out_dir = work.output_dir()?;
    let report = run_batch(&template, &records, &out_dir, options, rng)?;

    let archive = work.archive_path();
    bundle_directory(&out_dir, &archive)?;
    Ok(BatchOutput { archive, report })
}
