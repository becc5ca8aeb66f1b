//! WordprocessingML (`.docx`) backend
//!
//! A `.docx` file is a zip package. The main document part and every header
//! and footer part referenced from the section properties are parsed into
//! [`XmlDocument`] trees; all other entries are carried through untouched so
//! that saving reproduces the package with only the text changes applied.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xml::{XmlDocument, XmlElement, XmlError, XmlNode};
use super::{CellFormat, DocumentStructure, Region, RegionKind, TableView, TextContainer};

const DEFAULT_MAIN_PART: &str = "word/document.xml";
const PACKAGE_RELS: &str = "_rels/.rels";

#[derive(Debug, Error, Diagnostic)]
pub enum DocxError {
    #[error("not a readable .docx package: {0}")]
    #[diagnostic(
        code(docfill::docx::package),
        help("the template must be a Word document saved in .docx format")
    )]
    Package(#[from] zip::result::ZipError),

    #[error("package part not found: {0}")]
    #[diagnostic(code(docfill::docx::missing_part))]
    MissingPart(String),

    #[error("malformed part {part}: {source}")]
    #[diagnostic(code(docfill::docx::xml))]
    Xml {
        part: String,
        #[source]
        source: XmlError,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(docfill::docx::io))]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PackageEntry {
    name: String,
    is_dir: bool,
    data: Vec<u8>,
}

/// An opened `.docx` package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxDocument {
    entries: Vec<PackageEntry>,
    main_part: String,
    main: XmlDocument,
    /// Parsed header and footer parts keyed by package path
    parts: HashMap<String, XmlDocument>,
    /// Header and footer parts in visiting order
    regions: Vec<(RegionKind, String)>,
}

impl DocxDocument {
    pub fn open(path: &Path) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                data,
            });
        }

        let main_part = find_main_part(&entries)?;
        let main = parse_part(&entries, &main_part)?;
        let body = main
            .root
            .child("body")
            .ok_or_else(|| DocxError::MissingPart(format!("{main_part} (w:body)")))?;

        let rels = match entry(&entries, &rels_path(&main_part)) {
            Some(_) => relationships(&entries, &rels_path(&main_part), part_dir(&main_part))?,
            None => HashMap::new(),
        };

        let mut seen = HashSet::new();
        let mut regions = Vec::new();
        for sect in section_properties(body) {
            for (kind, local) in [
                (RegionKind::Header, "headerReference"),
                (RegionKind::Footer, "footerReference"),
            ] {
                for reference in sect.children_named(local) {
                    let Some(target) = reference.attr("id").and_then(|id| rels.get(id)) else {
                        continue;
                    };
                    if seen.insert(target.clone()) {
                        regions.push((kind, target.clone()));
                    }
                }
            }
        }

        let mut parts = HashMap::new();
        for (_, name) in &regions {
            parts.insert(name.clone(), parse_part(&entries, name)?);
        }

        log::debug!(
            "opened docx: main part {main_part}, {} header/footer part(s)",
            regions.len()
        );

        Ok(Self {
            entries,
            main_part,
            main,
            parts,
            regions,
        })
    }

    /// Serialize the package, deflating every entry
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            let data = match self.serialized_part(&entry.name)? {
                Some(bytes) => Cow::Owned(bytes),
                None => Cow::Borrowed(entry.data.as_slice()),
            };
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<(), DocxError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    fn serialized_part(&self, name: &str) -> Result<Option<Vec<u8>>, DocxError> {
        let part = if name == self.main_part {
            Some(&self.main)
        } else {
            self.parts.get(name)
        };
        part.map(|doc| {
            doc.to_bytes().map_err(|source| DocxError::Xml {
                part: name.to_string(),
                source,
            })
        })
        .transpose()
    }
}

impl DocumentStructure for DocxDocument {
    fn for_each_region(&mut self, f: &mut dyn FnMut(RegionKind, &mut dyn Region)) {
        if let Some(body) = self.main.root.child_mut("body") {
            f(RegionKind::Body, &mut DocxBlock { el: body });
        }
        for (kind, name) in &self.regions {
            if let Some(part) = self.parts.get_mut(name) {
                f(*kind, &mut DocxBlock { el: &mut part.root });
            }
        }
    }
}

/// Body, header, footer or table cell element
pub struct DocxBlock<'a> {
    el: &'a mut XmlElement,
}

impl Region for DocxBlock<'_> {
    fn for_each_paragraph(&mut self, f: &mut dyn FnMut(&mut dyn TextContainer)) {
        for p in self.el.children_named_mut("p") {
            f(&mut DocxParagraph { p });
        }
    }

    fn for_each_table(&mut self, f: &mut dyn FnMut(&mut dyn TableView)) {
        for tbl in self.el.children_named_mut("tbl") {
            f(&mut DocxTable { tbl });
        }
    }
}

/// A `w:p` element
pub struct DocxParagraph<'a> {
    p: &'a mut XmlElement,
}

impl TextContainer for DocxParagraph<'_> {
    fn text(&self) -> String {
        paragraph_text(self.p)
    }

    fn run_count(&self) -> usize {
        self.p.children_named("r").count()
    }

    fn set_text(&mut self, text: &str) {
        for (index, run) in self.p.children_named_mut("r").enumerate() {
            set_run_text(run, if index == 0 { text } else { "" });
        }
    }
}

/// A `w:tbl` element
pub struct DocxTable<'a> {
    tbl: &'a mut XmlElement,
}

impl DocxTable<'_> {
    fn cell(&self, row: usize, cell: usize) -> Option<&XmlElement> {
        let tr = self.tbl.children_named("tr").nth(row)?;
        let position = *grid_slots(tr).get(cell)?;
        match tr.children.get(position)? {
            XmlNode::Element(tc) => Some(tc),
            _ => None,
        }
    }

    fn cell_mut(&mut self, row: usize, cell: usize) -> Option<&mut XmlElement> {
        let tr = self.tbl.children_named_mut("tr").nth(row)?;
        let position = *grid_slots(tr).get(cell)?;
        match tr.children.get_mut(position)? {
            XmlNode::Element(tc) => Some(tc),
            _ => None,
        }
    }
}

impl TableView for DocxTable<'_> {
    fn row_count(&self) -> usize {
        self.tbl.children_named("tr").count()
    }

    fn cell_count(&self, row: usize) -> usize {
        self.tbl
            .children_named("tr")
            .nth(row)
            .map_or(0, |tr| grid_slots(tr).len())
    }

    fn cell_text(&self, row: usize, cell: usize) -> Option<String> {
        let tc = self.cell(row, cell)?;
        Some(
            tc.children_named("p")
                .map(paragraph_text)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn write_cell(&mut self, row: usize, cell: usize, text: &str, format: &CellFormat) {
        if let Some(tc) = self.cell_mut(row, cell) {
            fill_cell(tc, text, format);
        }
    }

    fn for_each_cell(&mut self, f: &mut dyn FnMut(&mut dyn Region)) {
        for tr in self.tbl.children_named_mut("tr") {
            for tc in tr.children_named_mut("tc") {
                f(&mut DocxBlock { el: tc });
            }
        }
    }
}

/// Child positions of a row's cells, one slot per grid column covered
fn grid_slots(tr: &XmlElement) -> Vec<usize> {
    let mut slots = Vec::new();
    for (position, node) in tr.children.iter().enumerate() {
        let XmlNode::Element(tc) = node else { continue };
        if !tc.is("tc") {
            continue;
        }
        let span = tc
            .find(&["tcPr", "gridSpan"])
            .and_then(|span| span.attr("val"))
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        slots.extend(std::iter::repeat(position).take(span));
    }
    slots
}

fn paragraph_text(p: &XmlElement) -> String {
    p.children_named("r").map(run_text).collect()
}

fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.elements() {
        match child.local_name() {
            "t" => text.push_str(&child.text_content()),
            "tab" | "ptab" => text.push('\t'),
            "br" => {
                if matches!(child.attr("type"), None | Some("textWrapping")) {
                    text.push('\n');
                }
            }
            "cr" => text.push('\n'),
            "noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

/// Replace a run's content with `text`, keeping its `w:rPr`
fn set_run_text(run: &mut XmlElement, text: &str) {
    run.retain_elements(&["rPr"]);
    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush_text(run, &mut pending);
                let tab = XmlElement::new(run.qualify("tab"));
                run.children.push(XmlNode::Element(tab));
            }
            '\n' | '\r' => {
                flush_text(run, &mut pending);
                let br = XmlElement::new(run.qualify("br"));
                run.children.push(XmlNode::Element(br));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(run, &mut pending);
}

fn flush_text(run: &mut XmlElement, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut t = XmlElement::new(run.qualify("t"));
    if pending.starts_with(char::is_whitespace) || pending.ends_with(char::is_whitespace) {
        t = t.with_attr("xml:space", "preserve");
    }
    run.children
        .push(XmlNode::Element(t.with_text(std::mem::take(pending))));
}

/// Replace everything but the cell properties with one centered paragraph
fn fill_cell(tc: &mut XmlElement, text: &str, format: &CellFormat) {
    tc.retain_elements(&["tcPr"]);

    let val = tc.qualify("val");
    let run_props = XmlElement::new(tc.qualify("rPr"))
        .with_child(
            XmlElement::new(tc.qualify("rFonts"))
                .with_attr(tc.qualify("ascii"), format.font_face.as_str())
                .with_attr(tc.qualify("hAnsi"), format.font_face.as_str()),
        )
        .with_child(
            XmlElement::new(tc.qualify("sz"))
                .with_attr(val.as_str(), format.size_half_points().to_string()),
        );
    let mut run = XmlElement::new(tc.qualify("r")).with_child(run_props);
    set_run_text(&mut run, text);

    let paragraph = XmlElement::new(tc.qualify("p"))
        .with_child(
            XmlElement::new(tc.qualify("pPr"))
                .with_child(XmlElement::new(tc.qualify("jc")).with_attr(val, "center")),
        )
        .with_child(run);
    tc.children.push(XmlNode::Element(paragraph));
}

/// Every `w:sectPr` of the body in document order
fn section_properties(body: &XmlElement) -> Vec<&XmlElement> {
    let mut sections = Vec::new();
    for el in body.elements() {
        if el.is("p") {
            if let Some(sect) = el.find(&["pPr", "sectPr"]) {
                sections.push(sect);
            }
        } else if el.is("sectPr") {
            sections.push(el);
        }
    }
    sections
}

fn entry<'a>(entries: &'a [PackageEntry], name: &str) -> Option<&'a PackageEntry> {
    entries.iter().find(|e| !e.is_dir && e.name == name)
}

fn parse_part(entries: &[PackageEntry], name: &str) -> Result<XmlDocument, DocxError> {
    let entry = entry(entries, name).ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
    XmlDocument::from_bytes(&entry.data).map_err(|source| DocxError::Xml {
        part: name.to_string(),
        source,
    })
}

fn find_main_part(entries: &[PackageEntry]) -> Result<String, DocxError> {
    if entry(entries, PACKAGE_RELS).is_some() {
        let rels = parse_part(entries, PACKAGE_RELS)?;
        let target = rels
            .root
            .children_named("Relationship")
            .find(|rel| rel.attr("Type").is_some_and(|t| t.ends_with("/officeDocument")))
            .and_then(|rel| rel.attr("Target"));
        if let Some(target) = target {
            return Ok(resolve_target("", target));
        }
    }
    Ok(DEFAULT_MAIN_PART.to_string())
}

/// Internal relationships of a part: id to resolved package path
fn relationships(
    entries: &[PackageEntry],
    rels_part: &str,
    base_dir: &str,
) -> Result<HashMap<String, String>, DocxError> {
    let rels = parse_part(entries, rels_part)?;
    Ok(rels
        .root
        .children_named("Relationship")
        .filter(|rel| rel.attr("TargetMode") != Some("External"))
        .filter_map(|rel| {
            let id = rel.attr("Id")?;
            let target = rel.attr("Target")?;
            Some((id.to_string(), resolve_target(base_dir, target)))
        })
        .collect())
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
