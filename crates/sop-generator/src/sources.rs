//! Text extraction from uploaded reference files.
//!
//! Extraction is best effort: an unsupported extension or a file that fails
//! to parse yields empty text, never an error.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use calamine::Reader as _;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use sop_core::SourceDocument;

/// Preview length in characters.
pub const PREVIEW_CHARS: usize = 1500;

/// Full text and preview of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub preview: String,
}

impl ExtractedText {
    fn from_text(text: String) -> Self {
        let preview = text.chars().take(PREVIEW_CHARS).collect();
        Self { text, preview }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot read source file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),
    #[error("cell reference out of range: {0}")]
    CellOutOfRange(String),
    #[error("pdf: {0}")]
    Pdf(String),
}

/// Extract text from `bytes`, choosing the parser by `file_name` extension.
pub fn extract(file_name: &str, bytes: &[u8]) -> ExtractedText {
    let lower = file_name.to_lowercase();
    let extension = lower.rsplit_once('.').map_or("", |(_, ext)| ext);

    let parsed = match extension {
        "txt" | "csv" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "docx" => docx_text(bytes),
        "xlsx" | "xls" => spreadsheet_text(bytes),
        "pdf" => pdf_text(bytes),
        _ => {
            tracing::debug!(file = file_name, "unsupported source format, no text extracted");
            Ok(String::new())
        }
    };

    match parsed {
        Ok(text) => ExtractedText::from_text(text),
        Err(e) => {
            tracing::warn!(file = file_name, error = %e, "source extraction failed");
            ExtractedText::default()
        }
    }
}

/// Read and extract a file from disk.
pub fn extract_path(path: &Path) -> Result<ExtractedText, SourceError> {
    let bytes = std::fs::read(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract(&file_name(path), &bytes))
}

/// Source document (file name plus preview) for a file on disk.
pub fn source_document(path: &Path) -> Result<SourceDocument, SourceError> {
    let extracted = extract_path(path)?;
    Ok(SourceDocument::new(file_name(path), extracted.preview))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_part(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, ParseError> {
    let mut part = archive.by_name(name)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Paragraph text of `word/document.xml`, one paragraph per line.
fn docx_text(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let xml = read_part(&mut archive, "word/document.xml")?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_run => current.push('\t'),
                b"br" if in_run => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Widest worksheet a reader accepts (column `XFD`).
const SHEET_COLUMNS_MAX: u32 = 16_384;
/// Tallest worksheet a reader accepts.
const SHEET_ROWS_MAX: u32 = 1_048_576;
/// Largest cell rectangle one sheet may span.
const SHEET_CELLS_MAX: u64 = 1_000_000;

fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<c\b[^>]*?\sr="([A-Za-z]*)([0-9]*)""#).expect("cell reference pattern is valid")
    })
}

/// One-based column number of the letters in a cell reference.
///
/// `None` past column `XFD`.
fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let column = letters.bytes().try_fold(0u32, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)
    })?;
    (column <= SHEET_COLUMNS_MAX).then_some(column)
}

/// Reject worksheets whose cell references would make the reader allocate
/// an oversized grid.
fn check_cell_bounds(archive: &mut zip::ZipArchive<Cursor<&[u8]>>) -> Result<(), ParseError> {
    let sheets: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();

    for name in sheets {
        let xml = read_part(archive, &name)?;
        let mut columns = (u32::MAX, 0u32);
        let mut rows = (u32::MAX, 0u32);
        for caps in cell_ref_re().captures_iter(&xml) {
            let out_of_range = || ParseError::CellOutOfRange(format!("{}{}", &caps[1], &caps[2]));
            let column = column_number(&caps[1]).ok_or_else(out_of_range)?;
            let row = caps[2]
                .parse::<u32>()
                .ok()
                .filter(|r| (1..=SHEET_ROWS_MAX).contains(r))
                .ok_or_else(out_of_range)?;
            columns = (columns.0.min(column), columns.1.max(column));
            rows = (rows.0.min(row), rows.1.max(row));
        }
        if columns.1 > 0 {
            let cells = u64::from(columns.1 - columns.0 + 1) * u64::from(rows.1 - rows.0 + 1);
            if cells > SHEET_CELLS_MAX {
                return Err(ParseError::CellOutOfRange(format!("{name} spans {cells} cells")));
            }
        }
    }
    Ok(())
}

/// Every non-empty row of every worksheet, one row per line, cells
/// tab-separated. Handles both `.xlsx` and legacy `.xls` workbooks.
fn spreadsheet_text(bytes: &[u8]) -> Result<String, ParseError> {
    if let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) {
        check_cell_bounds(&mut archive)?;
    }

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let mut lines = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        for row in range.rows() {
            let mut cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            if !cells.is_empty() {
                lines.push(cells.join("\t"));
            }
        }
    }
    Ok(lines.join("\n"))
}

/// Text layer of a PDF.
///
/// The PDF parser panics on some malformed files; that is reported as a
/// parse failure like any other.
fn pdf_text(bytes: &[u8]) -> Result<String, ParseError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(ParseError::Pdf(e.to_string())),
        Err(_) => Err(ParseError::Pdf("parser panicked".to_string())),
    }
}
