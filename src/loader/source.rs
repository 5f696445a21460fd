//! Tabular Source Trait - Abstract interface for mapping document readers

use crate::error::Result;
use std::path::Path;

/// One data row of a tabular document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRow {
    /// Line (or record) number in the document, counting the header as 1
    pub line: u64,

    /// Cell values aligned with `RawTable::headers`; blank cells are `None`
    pub cells: Vec<Option<String>>,
}

/// Header plus rows, exactly as read - no validation applied
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, numbering it after the previous one.
    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        let line = self.rows.last().map(|r| r.line + 1).unwrap_or(2);
        self.rows.push(RawRow { line, cells });
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Normalize a raw cell: trimmed, and blank means absent.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tabular Source Trait
///
/// Implementations:
/// - DelimitedSource: comma/tab/pipe/semicolon separated text
/// - SpreadsheetSource: first sheet of an xlsx/xlsm/xls/ods workbook
/// - ColumnarSource: parquet and JSON exports of a spreadsheet sheet
pub trait TabularSource {
    /// Read the whole document into memory
    fn read_table(&self) -> Result<RawTable>;

    /// Short format name used in log lines
    fn format_name(&self) -> &str;
}

/// File formats recognised by extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    Spreadsheet,
    Parquet,
    Json,
    JsonLines,
}

impl SourceFormat {
    /// Pick a reader from the extension. Anything unrecognised, including no
    /// extension at all, is read as comma-separated text.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "tsv" | "tab" => SourceFormat::Delimited(b'\t'),
            "psv" => SourceFormat::Delimited(b'|'),
            "ssv" => SourceFormat::Delimited(b';'),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SourceFormat::Spreadsheet,
            "parquet" => SourceFormat::Parquet,
            "json" => SourceFormat::Json,
            "jsonl" | "ndjson" => SourceFormat::JsonLines,
            _ => SourceFormat::Delimited(b','),
        }
    }
}
