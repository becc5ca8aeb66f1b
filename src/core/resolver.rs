//! Placeholder substitution over every text container of a document

use crate::core::record::PlaceholderMap;
use crate::document::{DocumentStructure, Region, TableView, TextContainer};

/// Replace placeholder tokens in the body, every table cell (nested tables
/// included), and every header and footer.
///
/// Regions come in the order [`DocumentStructure::for_each_region`] yields
/// them; inside a region paragraphs are handled before tables. A paragraph
/// in which at least one token occurs is collapsed into its first run;
/// paragraphs without tokens keep their run structure.
pub fn resolve_placeholders(doc: &mut dyn DocumentStructure, map: &PlaceholderMap) {
    if map.is_empty() {
        return;
    }
    doc.for_each_region(&mut |_, region| resolve_region(region, map));
}

fn resolve_region(region: &mut dyn Region, map: &PlaceholderMap) {
    region.for_each_paragraph(&mut |p| resolve_paragraph(p, map));
    region.for_each_table(&mut |table| resolve_table(table, map));
}

fn resolve_table(table: &mut dyn TableView, map: &PlaceholderMap) {
    table.for_each_cell(&mut |cell| resolve_region(cell, map));
}

fn resolve_paragraph(p: &mut dyn TextContainer, map: &PlaceholderMap) {
    if p.run_count() == 0 {
        return;
    }
    if let Some(text) = map.substitute(&p.text()) {
        p.set_text(&text);
    }
}
