//! Mapping model - one loaded mapping document and the facts derived from it
//!
//! A `MappingSet` is immutable once built. Derived views (distinct columns,
//! transformations by target, detected source tables) are computed once at
//! construction so concurrent readers never recompute or lock.

use crate::error::{ReconError, Result};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

lazy_static! {
    /// Identifier immediately followed by a dot: `orders.` in `orders.id`.
    static ref TABLE_REFERENCE: Regex = Regex::new(r"(\w+)\.").expect("valid table reference pattern");
}

/// One declared correspondence between a source column (or expression) and a target column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Source column name (may be empty for computed targets)
    #[serde(default)]
    pub source_column: String,

    /// Target column name - never empty
    pub target_column: String,

    /// Opaque SQL scalar expression, or empty for a direct copy
    #[serde(default)]
    pub transformation: String,

    /// Part of the identity used to correlate source and target rows
    #[serde(default)]
    pub is_key: bool,
}

impl MappingEntry {
    pub fn new(
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        transformation: impl Into<String>,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target_column: target_column.into(),
            transformation: transformation.into(),
            is_key: false,
        }
    }

    pub fn with_key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn has_transformation(&self) -> bool {
        !self.transformation.trim().is_empty()
    }

    pub fn has_source_column(&self) -> bool {
        !self.source_column.trim().is_empty()
    }
}

/// Ordered, validated sequence of mapping entries
#[derive(Debug, Clone)]
pub struct MappingSet {
    entries: Vec<MappingEntry>,
    source_columns: Vec<String>,
    target_columns: Vec<String>,
    transformations_by_target: BTreeMap<String, String>,
    detected_source_tables: Vec<String>,
}

impl MappingSet {
    /// Build a mapping set from entries. Fails if there are no entries or any
    /// entry has an empty target column.
    pub fn new(entries: Vec<MappingEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ReconError::format(
                "No usable mapping rows found. Please provide a mapping file with data.",
            ));
        }

        if let Some(position) = entries.iter().position(|e| e.target_column.trim().is_empty()) {
            return Err(ReconError::format(format!(
                "Mapping entry {} has an empty target_column. Every mapping needs a target column.",
                position + 1
            )));
        }

        let source_columns = entries
            .iter()
            .filter(|e| e.has_source_column())
            .map(|e| e.source_column.clone())
            .sorted()
            .dedup()
            .collect();

        let target_columns = entries
            .iter()
            .map(|e| e.target_column.clone())
            .sorted()
            .dedup()
            .collect();

        // Last occurrence of a target wins
        let mut transformations_by_target = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.has_transformation()) {
            transformations_by_target.insert(entry.target_column.clone(), entry.transformation.clone());
        }

        let detected_source_tables = extract_source_tables(entries.iter().map(|e| e.transformation.as_str()));

        Ok(Self {
            entries,
            source_columns,
            target_columns,
            transformations_by_target,
            detected_source_tables,
        })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }

    /// Sorted distinct non-empty source column names
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    /// Sorted distinct target column names
    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    pub fn transformations_by_target(&self) -> &BTreeMap<String, String> {
        &self.transformations_by_target
    }

    /// Sorted distinct identifiers that appear as `identifier.` in any transformation
    pub fn detected_source_tables(&self) -> &[String] {
        &self.detected_source_tables
    }

    pub fn summary(&self) -> MappingSummary {
        MappingSummary {
            total_mappings: self.entries.len(),
            source_columns: self.source_columns.clone(),
            target_columns: self.target_columns.clone(),
            transformations: self.transformations_by_target.clone(),
            detected_source_tables: self.detected_source_tables.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a MappingSet {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Summary statistics for a loaded mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    pub total_mappings: usize,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
    /// Transformation text keyed by target column
    pub transformations: BTreeMap<String, String>,
    pub detected_source_tables: Vec<String>,
}

impl MappingSummary {
    pub fn is_empty(&self) -> bool {
        self.total_mappings == 0
    }
}

/// Extract candidate table names from transformation expressions.
///
/// Heuristic, not a SQL parser: every run of word characters immediately
/// followed by a dot counts, so alias-qualified columns and numeric literals
/// like `1.5` (yielding `1`) are reported too.
pub fn extract_source_tables<'a, I>(transformations: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tables = BTreeSet::new();
    for transformation in transformations {
        for capture in TABLE_REFERENCE.captures_iter(transformation) {
            tables.insert(capture[1].to_string());
        }
    }
    tables.into_iter().collect()
}
