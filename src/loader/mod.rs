//! Mapping Loader - reads and validates mapping documents
//!
//! Validation is strict and ordered (first failure wins):
//! 1. empty documents are rejected
//! 2. header names are trimmed and lower-cased
//! 3. the three required columns must exist
//! 4. none of the required columns may be entirely blank
//! 5. no row may leave a required column blank
//!
//! Only then are rows materialized into `MappingEntry` values. A partially
//! filled row fails the whole load: a reconciliation query built from an
//! incomplete mapping would under-report coverage.

pub mod columnar;
pub mod delimited;
pub mod source;
pub mod spreadsheet;

pub use columnar::ColumnarSource;
pub use delimited::DelimitedSource;
pub use source::{RawRow, RawTable, SourceFormat, TabularSource};
pub use spreadsheet::SpreadsheetSource;

use crate::error::{ReconError, Result};
use crate::mapping::{MappingEntry, MappingSet};
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

pub const SOURCE_COLUMN: &str = "source_column";
pub const TARGET_COLUMN: &str = "target_column";
pub const TRANSFORMATION: &str = "transformation";
pub const IS_KEY: &str = "is_key";
pub const JOIN_KEY: &str = "join_key";

/// Required columns, in the order they are checked
pub const REQUIRED_COLUMNS: [&str; 3] = [SOURCE_COLUMN, TARGET_COLUMN, TRANSFORMATION];

/// How many offending line numbers an incomplete-rows error lists
const MAX_REPORTED_LINES: usize = 10;

/// Values of the key flag that mean "not a key"; anything else non-blank is a key
const FALSE_FLAGS: [&str; 7] = ["false", "0", "no", "n", "f", "none", "null"];

/// Positions of the interesting columns within a validated header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub source_column: usize,
    pub target_column: usize,
    pub transformation: usize,
    pub is_key: Option<usize>,
    pub join_key: Option<usize>,
}

pub struct MappingLoader;

impl MappingLoader {
    /// Load a mapping document, picking the reader from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<MappingSet> {
        let path = path.as_ref();
        let source: Box<dyn TabularSource> = match SourceFormat::from_path(path) {
            SourceFormat::Delimited(delimiter) => Box::new(DelimitedSource::from_path(path, delimiter)?),
            SourceFormat::Spreadsheet => Box::new(SpreadsheetSource::new(path)),
            other => Box::new(ColumnarSource::new(path, other)),
        };

        let table = source.read_table().map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to read mapping document");
            e
        })?;

        debug!(
            path = %path.display(),
            format = source.format_name(),
            rows = table.row_count(),
            "Read mapping document"
        );

        let mappings = Self::load_table(table)?;
        info!(path = %path.display(), mappings = mappings.len(), "Loaded mapping document");
        Ok(mappings)
    }

    /// Load delimited text that is already in memory (e.g. an uploaded file body).
    pub fn load_str(text: &str, delimiter: u8) -> Result<MappingSet> {
        let table = DelimitedSource::new(text.to_string(), delimiter).read_table()?;
        Self::load_table(table)
    }

    /// Validate an already-read table and materialize its rows.
    pub fn load_table(table: RawTable) -> Result<MappingSet> {
        let index = Self::validate_format(&table).map_err(|e| {
            warn!(error = %e, "Mapping document rejected");
            e
        })?;

        let entries = table
            .rows
            .iter()
            .map(|row| Self::materialize(row, &index))
            .collect::<Vec<_>>();

        MappingSet::new(entries)
    }

    /// Run the ordered structural checks, returning where each column lives.
    pub fn validate_format(table: &RawTable) -> Result<ColumnIndex> {
        if table.is_empty() {
            return Err(ReconError::format(
                "File is empty. Please provide a mapping file with data.",
            ));
        }

        // First header wins when two normalize to the same name
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (idx, header) in table.headers.iter().enumerate() {
            positions.entry(normalize_header(header)).or_insert(idx);
        }

        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !positions.contains_key(**c))
            .sorted()
            .join(", ");
        if !missing.is_empty() {
            let found = positions
                .keys()
                .filter(|k| !k.is_empty())
                .sorted()
                .join(", ");
            let found = if found.is_empty() { "none".to_string() } else { found };
            return Err(ReconError::format(format!(
                "Missing required columns: {}\n\nExpected columns: {}\n\nFound columns: {}",
                missing,
                REQUIRED_COLUMNS.join(", "),
                found
            )));
        }

        let index = ColumnIndex {
            source_column: positions[SOURCE_COLUMN],
            target_column: positions[TARGET_COLUMN],
            transformation: positions[TRANSFORMATION],
            is_key: positions.get(IS_KEY).copied(),
            join_key: positions.get(JOIN_KEY).copied(),
        };

        let required = [
            (SOURCE_COLUMN, index.source_column),
            (TARGET_COLUMN, index.target_column),
            (TRANSFORMATION, index.transformation),
        ];

        for (name, col) in required {
            if table.rows.iter().all(|row| cell(row, col).is_none()) {
                return Err(ReconError::format(format!(
                    "Column '{}' is empty. All required columns must have at least some data.",
                    name
                )));
            }
        }

        let incomplete = table
            .rows
            .iter()
            .filter(|row| required.iter().any(|(_, col)| cell(row, *col).is_none()))
            .map(|row| row.line)
            .collect::<Vec<_>>();

        if !incomplete.is_empty() {
            let mut lines = incomplete.iter().take(MAX_REPORTED_LINES).join(", ");
            if incomplete.len() > MAX_REPORTED_LINES {
                lines.push_str(", ...");
            }
            return Err(ReconError::format(format!(
                "Found {} row(s) with missing required data (source_column, target_column, or transformation). Please fill in all required fields. Check line(s): {}",
                incomplete.len(),
                lines
            )));
        }

        Ok(index)
    }

    fn materialize(row: &RawRow, index: &ColumnIndex) -> MappingEntry {
        let text = |col: usize| cell(row, col).unwrap_or_default().to_string();
        let flagged = |col: Option<usize>| {
            col.and_then(|col| cell(row, col))
                .map(parse_key_flag)
                .unwrap_or(false)
        };
        // Either flag column marks a key
        let is_key = flagged(index.is_key) || flagged(index.join_key);

        MappingEntry {
            source_column: text(index.source_column),
            target_column: text(index.target_column),
            transformation: text(index.transformation),
            is_key,
        }
    }
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Interpret a key-flag cell. Blank and the usual "false" spellings are false.
pub fn parse_key_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    !value.is_empty() && !FALSE_FLAGS.contains(&value.as_str())
}

fn cell(row: &RawRow, col: usize) -> Option<&str> {
    row.cells
        .get(col)
        .and_then(|c| c.as_deref())
        .filter(|c| !c.trim().is_empty())
}
