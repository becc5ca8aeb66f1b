//! Document structure abstraction
//!
//! Template filling only needs a handful of operations: read and rewrite a
//! paragraph's text, walk tables cell by cell, and overwrite a cell with
//! formatted text. These are expressed as object-safe traits so the filling
//! logic in [`crate::core`] does not depend on any particular file format.
//! [`docx::DocxDocument`] is the WordprocessingML implementation.

pub mod docx;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use docx::{DocxDocument, DocxError};

/// Which part of the document a region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Body,
    Header,
    Footer,
}

/// A paragraph: an ordered sequence of styled runs
pub trait TextContainer {
    /// Text of all runs concatenated in order
    fn text(&self) -> String;

    /// Number of styled runs in the paragraph
    fn run_count(&self) -> usize;

    /// Replace the paragraph text, keeping the style of the first run.
    ///
    /// The first run receives `text`, every other run is emptied. A paragraph
    /// without runs is left as is.
    fn set_text(&mut self, text: &str);
}

/// Anything holding paragraphs and tables: the body, a header, a footer or a
/// single table cell
pub trait Region {
    fn for_each_paragraph(&mut self, f: &mut dyn FnMut(&mut dyn TextContainer));

    fn for_each_table(&mut self, f: &mut dyn FnMut(&mut dyn TableView));
}

/// Row and cell access over one table.
///
/// Cell indexes are grid positions: a cell spanning several grid columns is
/// reported once per column it covers.
pub trait TableView {
    fn row_count(&self) -> usize;

    fn cell_count(&self, row: usize) -> usize;

    /// Paragraph texts of a cell joined with `\n`
    fn cell_text(&self, row: usize, cell: usize) -> Option<String>;

    /// Replace the whole content of a cell with one formatted paragraph
    fn write_cell(&mut self, row: usize, cell: usize, text: &str, format: &CellFormat);

    /// Visit every distinct cell once, row by row
    fn for_each_cell(&mut self, f: &mut dyn FnMut(&mut dyn Region));
}

/// A whole document: body plus header and footer regions
pub trait DocumentStructure {
    /// Visit the body first, then for each section its headers and footers.
    /// A header or footer shared by several sections is visited once.
    fn for_each_region(&mut self, f: &mut dyn FnMut(RegionKind, &mut dyn Region));
}

/// Formatting for text written into a cell. The text is always centered.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    pub font_face: String,
    pub size_pt: f32,
}

impl CellFormat {
    pub fn new(font_face: impl Into<String>, size_pt: f32) -> Self {
        Self {
            font_face: font_face.into(),
            size_pt,
        }
    }

    /// Font size in half points, the unit WordprocessingML stores
    pub fn size_half_points(&self) -> u32 {
        (self.size_pt * 2.0).round().max(1.0) as u32
    }
}

impl Default for CellFormat {
    fn default() -> Self {
        Self::new("Cambria", 11.0)
    }
}
