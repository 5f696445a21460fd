//! Spreadsheet Source - first sheet of an xlsx/xlsm/xls/ods workbook
//!
//! The first used row is the header. Cells are rendered as text and then
//! cleaned like delimited cells; empty cells are null and rows with no
//! value at all are skipped.

use crate::error::{ReconError, Result};
use crate::loader::source::{clean_cell, RawRow, RawTable, TabularSource};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};

pub struct SpreadsheetSource {
    path: PathBuf,
}

impl SpreadsheetSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn parse_error(err: calamine::Error) -> ReconError {
    match err {
        calamine::Error::Io(e) => ReconError::Io(e),
        other => ReconError::format(format!("Error parsing file: {}", other)),
    }
}

/// Render one cell as loader text.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => clean_cell(s),
        other => clean_cell(&other.to_string()),
    }
}

impl TabularSource for SpreadsheetSource {
    fn read_table(&self) -> Result<RawTable> {
        // calamine wraps open failures in its per-format errors
        std::fs::metadata(&self.path)?;
        let mut workbook = open_workbook_auto(&self.path).map_err(parse_error)?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(parse_error)?,
            None => return Ok(RawTable::default()),
        };

        // Sheet row numbers are 1-based and the range may not start at A1
        let first_line = range.start().map(|(row, _)| u64::from(row) + 1).unwrap_or(1);
        let mut rows = range.rows();

        let headers = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell_text(cell).unwrap_or_default())
                .collect::<Vec<_>>(),
            None => return Ok(RawTable::default()),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Ok(RawTable::default());
        }

        let mut table = RawTable::new(headers);
        for (offset, row) in rows.enumerate() {
            let cells = (0..table.headers.len())
                .map(|idx| row.get(idx).and_then(cell_text))
                .collect::<Vec<_>>();
            if cells.iter().all(Option::is_none) {
                continue;
            }

            table.rows.push(RawRow {
                line: first_line + 1 + offset as u64,
                cells,
            });
        }

        Ok(table)
    }

    fn format_name(&self) -> &str {
        "spreadsheet"
    }
}
