//! Integration tests for the docfill CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Helper to get a docfill command
fn docfill() -> Command {
    Command::cargo_bin("docfill").unwrap()
}

fn zip_bytes(entries: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn run_xml(text: &str) -> String {
    let text = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

fn result_row(discriminator: &str) -> String {
    let mut cells = vec![discriminator.to_string()];
    cells.extend((1..14).map(|i| format!("c{i}")));
    let cells: String = cells
        .iter()
        .map(|c| format!("<w:tc><w:p>{}</w:p></w:tc>", run_xml(c)))
        .collect();
    format!("<w:tr>{cells}</w:tr>")
}

/// Template with tokens in the body, a header and a result table
fn write_template(path: &Path) {
    let body = format!(
        "<w:p>{}</w:p><w:p>{}</w:p><w:tbl>{}{}</w:tbl>",
        run_xml("Equipment: <Equipment name> (<SN>)"),
        run_xml("Report <CLR>"),
        result_row("1"),
        result_row("2"),
    );
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}<w:sectPr><w:headerReference w:type="default" r:id="rIdH"/></w:sectPr></w:body></w:document>"#
    );
    let header = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:p>{}</w:p></w:hdr>"#,
        run_xml("Dept <DEPT>")
    );
    let bytes = zip_bytes(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_string(),
        ),
        ("word/document.xml", document),
        (
            "word/_rels/document.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rIdH" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/></Relationships>"#.to_string(),
        ),
        ("word/header1.xml", header),
    ]);
    fs::write(path, bytes).unwrap();
}

/// Single-sheet workbook with inline strings
fn write_workbook(path: &Path, rows: &[&[&str]]) {
    let rows: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let cells: String = cells
                .iter()
                .enumerate()
                .map(|(c, text)| {
                    let column = (b'A' + c as u8) as char;
                    format!(r#"<c r="{column}{}" t="inlineStr"><is><t>{text}</t></is></c>"#, r + 1)
                })
                .collect();
            format!(r#"<row r="{}">{cells}</row>"#, r + 1)
        })
        .collect();
    let bytes = zip_bytes(&[
        (
            "xl/workbook.xml",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#),
        ),
    ]);
    fs::write(path, bytes).unwrap();
}

fn archive_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn document_xml(archive: &Path, entry: &str) -> String {
    let mut archive = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    let mut inner = Vec::new();
    archive
        .by_name(entry)
        .unwrap()
        .read_to_end(&mut inner)
        .unwrap();

    let mut docx = ZipArchive::new(Cursor::new(inner)).unwrap();
    let mut xml = String::new();
    for part in ["word/header1.xml", "word/document.xml"] {
        docx.by_name(part)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
    }
    xml
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    docfill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("spreadsheet"));
}

#[test]
fn test_version_displays() {
    docfill()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("docfill"));
}

#[test]
fn test_unknown_command_fails() {
    docfill()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_completions_bash() {
    docfill()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docfill"));
}

// ============================================================================
// Fields Command Tests
// ============================================================================

#[test]
fn test_fields_template_header() {
    let output = docfill().args(["fields", "--template"]).output().unwrap();
    assert!(output.status.success());
    insta::assert_snapshot!(
        String::from_utf8_lossy(&output.stdout),
        @"Equipment name,MK,MO,SN,ID,DEPT,D Date,E date,CLR,ULR,TEM,HUM"
    );
}

#[test]
fn test_fields_table() {
    docfill()
        .arg("fields")
        .assert()
        .success()
        .stdout(predicate::str::contains("<Equipment name>"))
        .stdout(predicate::str::contains("<E date>"));
}

// ============================================================================
// Generate Command Tests
// ============================================================================

#[test]
fn test_generate_from_csv() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    let sheet = tmp.path().join("equipment.csv");
    let out = tmp.path().join("out.zip");
    write_template(&template);
    fs::write(
        &sheet,
        "Equipment name,SN,DEPT,CLR\nInfusion pump,abc123,icu,X1\nMonitor,m-2,er,X2\nScale,s3,lab,X3\n",
    )
    .unwrap();

    docfill()
        .args(["generate", "--seed", "7", "-o"])
        .arg(&out)
        .arg(&sheet)
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 document(s)"));

    assert_eq!(
        archive_names(&out),
        vec!["EST - X1.docx", "EST - X2.docx", "EST - X3.docx"]
    );

    let xml = document_xml(&out, "EST - X1.docx");
    assert!(xml.contains("Dept ICU"));
    assert!(xml.contains("Equipment: INFUSION PUMP (ABC123)"));
    assert!(xml.contains("Report X1"));
    assert!(xml.contains("µA"));
    assert!(!xml.contains("&lt;SN&gt;"));
}

#[test]
fn test_generate_from_xlsx() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    let sheet = tmp.path().join("equipment.xlsx");
    let out = tmp.path().join("out.zip");
    write_template(&template);
    write_workbook(
        &sheet,
        &[&[" CLR ", "SN", "Notes"], &["R-10", "q1", "ignored"]],
    );

    docfill()
        .args(["generate", "--prefix", "CAL ", "-o"])
        .arg(&out)
        .arg(&sheet)
        .arg(&template)
        .assert()
        .success();

    assert_eq!(archive_names(&out), vec!["CAL R-10.docx"]);
    let xml = document_xml(&out, "CAL R-10.docx");
    assert!(xml.contains("(Q1)"));
    // no Equipment name column
    assert!(xml.contains("Equipment:  (Q1)"));
}

#[test]
fn test_generate_duplicate_clr_warns() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    let sheet = tmp.path().join("equipment.csv");
    let out = tmp.path().join("out.zip");
    write_template(&template);
    fs::write(&sheet, "SN,CLR\na,DUP\nb,DUP\n").unwrap();

    docfill()
        .args(["generate", "-o"])
        .arg(&out)
        .arg(&sheet)
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 document(s)"))
        .stderr(predicate::str::contains("overwrote"));

    assert_eq!(archive_names(&out), vec!["EST - DUP.docx"]);
}

#[test]
fn test_generate_bad_template_fails() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    let sheet = tmp.path().join("equipment.csv");
    fs::write(&template, "not a word document").unwrap();
    fs::write(&sheet, "SN,CLR\na,X1\n").unwrap();

    docfill()
        .args(["generate", "-o"])
        .arg(tmp.path().join("out.zip"))
        .arg(&sheet)
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load template"));

    assert!(!tmp.path().join("out.zip").exists());
}

#[test]
fn test_generate_missing_spreadsheet_fails() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    write_template(&template);

    docfill()
        .args(["generate", "-o"])
        .arg(tmp.path().join("out.zip"))
        .arg(tmp.path().join("absent.csv"))
        .arg(&template)
        .assert()
        .failure();
}

#[test]
fn test_generate_config_file_prefix() {
    let tmp = TempDir::new().unwrap();
    let template = tmp.path().join("template.docx");
    let sheet = tmp.path().join("equipment.csv");
    let config = tmp.path().join("docfill.yaml");
    let out = tmp.path().join("out.zip");
    write_template(&template);
    fs::write(&sheet, "CLR\n42\n").unwrap();
    fs::write(&config, "file_prefix: 'Cert '\n").unwrap();

    docfill()
        .arg("--config")
        .arg(&config)
        .args(["generate", "-q", "-o"])
        .arg(&out)
        .arg(&sheet)
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(archive_names(&out), vec!["Cert 42.docx"]);
}

#[test]
fn test_bad_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("docfill.yaml");
    fs::write(&config, "unknown_key: 1\n").unwrap();

    docfill()
        .arg("--config")
        .arg(&config)
        .args(["serve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}
