//! Columnar Source - parquet and JSON exports of a mapping sheet
//!
//! Every column is cast to text so the loader sees the same shape it gets
//! from delimited files; nulls stay null.

use crate::error::{ReconError, Result};
use crate::loader::source::{clean_cell, RawTable, SourceFormat, TabularSource};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct ColumnarSource {
    path: PathBuf,
    format: SourceFormat,
}

impl ColumnarSource {
    pub fn new(path: impl AsRef<Path>, format: SourceFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    fn read_frame(&self) -> Result<DataFrame> {
        let file = File::open(&self.path)?;
        let frame = match self.format {
            SourceFormat::Parquet => ParquetReader::new(file).finish(),
            SourceFormat::Json => JsonReader::new(file)
                .with_json_format(JsonFormat::Json)
                .finish(),
            SourceFormat::JsonLines => JsonReader::new(file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(),
            SourceFormat::Delimited(_) | SourceFormat::Spreadsheet => {
                return Err(ReconError::format(format!(
                    "'{}' is not a columnar export",
                    self.path.display()
                )))
            }
        };

        frame.map_err(|e| ReconError::format(format!("Error parsing file: {}", e)))
    }
}

/// Flatten a data frame into header + text rows.
pub fn frame_to_table(frame: &DataFrame) -> Result<RawTable> {
    let headers = frame
        .get_columns()
        .iter()
        .map(|s| s.name().to_string())
        .collect::<Vec<_>>();

    let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(headers.len());
    for series in frame.get_columns() {
        let as_text = series.cast(&DataType::String)?;
        let values = as_text
            .str()?
            .into_iter()
            .map(|value| value.and_then(clean_cell))
            .collect::<Vec<_>>();
        columns.push(values);
    }

    let mut table = RawTable::new(headers);
    for row_idx in 0..frame.height() {
        let cells = columns
            .iter()
            .map(|column| column.get(row_idx).cloned().flatten())
            .collect();
        table.push_row(cells);
    }

    Ok(table)
}

impl TabularSource for ColumnarSource {
    fn read_table(&self) -> Result<RawTable> {
        let frame = self.read_frame()?;
        frame_to_table(&frame)
    }

    fn format_name(&self) -> &str {
        match self.format {
            SourceFormat::Parquet => "parquet",
            SourceFormat::Json => "json",
            SourceFormat::JsonLines => "jsonl",
            SourceFormat::Delimited(_) => "delimited",
            SourceFormat::Spreadsheet => "spreadsheet",
        }
    }
}
