//! Delimited Source - comma/tab/pipe separated mapping documents

use crate::error::{ReconError, Result};
use crate::loader::source::{clean_cell, RawRow, RawTable, TabularSource};
use csv::ReaderBuilder;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Delimited Source - wraps delimited text and converts it into a raw table.
pub struct DelimitedSource {
    text: String,
    delimiter: u8,
}

impl DelimitedSource {
    pub fn new(text: String, delimiter: u8) -> Self {
        Self { text, delimiter }
    }

    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(text, delimiter))
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl TabularSource for DelimitedSource {
    fn read_table(&self) -> Result<RawTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(self.text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| ReconError::format(format!("Error parsing file: {}", e)))?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                if idx == 0 {
                    h.trim_start_matches(UTF8_BOM).to_string()
                } else {
                    h.to_string()
                }
            })
            .collect::<Vec<_>>();

        // A completely blank document still yields one empty header field
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(RawTable::default());
        }

        let mut table = RawTable::new(headers);
        for result in rdr.records() {
            let record = result.map_err(|e| ReconError::format(format!("Error parsing file: {}", e)))?;
            let cells = (0..table.headers.len())
                .map(|idx| record.get(idx).and_then(clean_cell))
                .collect::<Vec<_>>();

            match record.position() {
                Some(position) => table.rows.push(RawRow {
                    line: position.line(),
                    cells,
                }),
                None => table.push_row(cells),
            }
        }

        Ok(table)
    }

    fn format_name(&self) -> &str {
        match self.delimiter {
            b'\t' => "tsv",
            b'|' => "psv",
            b';' => "ssv",
            _ => "csv",
        }
    }
}
