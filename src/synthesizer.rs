//! Query Synthesizer - deterministic reconciliation SQL from a mapping
//!
//! Both directions share one builder parameterized by `Direction`, so the
//! source-minus-target and target-minus-source scripts differ only in operand
//! order, labels and the fallback join aliases.
//!
//! Transformations are trusted, opaque SQL: whitespace is collapsed and the
//! text is otherwise emitted verbatim. No SQL validity checking happens here.

use crate::mapping::{MappingEntry, MappingSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const SOURCE_CTE: &str = "source_transformed";
pub const TARGET_CTE: &str = "target_data";

/// Rows shown by the detail half of each reconciliation query
pub const DETAIL_LIMIT: usize = 100;

/// Condition used when no join key is available at all
const ALWAYS_TRUE: &str = "1=1";

/// Column tested for NULL in the fallback when no join key is available
const FALLBACK_NULL_COLUMN: &str = "id";

/// A table name with an optional schema qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Build from an optional schema; blank schemas are treated as absent.
    pub fn qualified(name: impl Into<String>, schema: Option<&str>) -> Self {
        let schema = schema.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            schema,
            name: name.into(),
        }
    }

    /// `schema.name` when a schema is present, otherwise `name`
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Which side the set difference is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    SourceMinusTarget,
    TargetMinusSource,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::SourceMinusTarget => "SOURCE_MINUS_TARGET",
            Direction::TargetMinusSource => "TARGET_MINUS_SOURCE",
        }
    }

    /// Key used in generated query maps
    pub fn key(&self) -> &'static str {
        match self {
            Direction::SourceMinusTarget => "source_minus_target",
            Direction::TargetMinusSource => "target_minus_source",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Direction::SourceMinusTarget => "Source MINUS Target",
            Direction::TargetMinusSource => "Target MINUS Source",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Direction::SourceMinusTarget => {
                "This query shows records that exist in source but not in target after transformation"
            }
            Direction::TargetMinusSource => {
                "This query shows records that exist in target but not in transformed source"
            }
        }
    }

    fn missing_issue(&self) -> &'static str {
        match self {
            Direction::SourceMinusTarget => "Missing in Target",
            Direction::TargetMinusSource => "Missing in Source",
        }
    }

    /// (minuend CTE, alias) and (subtrahend CTE, alias)
    fn operands(&self) -> ((&'static str, &'static str), (&'static str, &'static str)) {
        match self {
            Direction::SourceMinusTarget => ((SOURCE_CTE, "s"), (TARGET_CTE, "t")),
            Direction::TargetMinusSource => ((TARGET_CTE, "t"), (SOURCE_CTE, "s")),
        }
    }
}

/// How the fallback join keys were chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrigin {
    /// Entries marked `is_key` by the mapping author
    Flagged,
    /// Nothing flagged; the first mapping's column stands in
    FirstColumnDefault,
    /// No usable column at all; the fallback joins on an always-true condition
    None,
}

/// Join keys driving the commented LEFT JOIN fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKeySelection {
    pub keys: Vec<String>,
    pub origin: KeyOrigin,
}

impl JoinKeySelection {
    /// Infer keys: flagged entries (target column preferred, else source
    /// column); otherwise the first entry's column as a single default key.
    pub fn infer(entries: &[MappingEntry]) -> Self {
        let flagged = entries
            .iter()
            .filter(|e| e.is_key)
            .filter_map(key_column)
            .collect::<Vec<_>>();

        if !flagged.is_empty() {
            return Self {
                keys: flagged,
                origin: KeyOrigin::Flagged,
            };
        }

        match entries.first().and_then(key_column) {
            Some(first) => Self {
                keys: vec![first],
                origin: KeyOrigin::FirstColumnDefault,
            },
            None => Self {
                keys: Vec::new(),
                origin: KeyOrigin::None,
            },
        }
    }

    /// `a.k1 = b.k1 AND a.k2 = b.k2`, or `1=1` without keys
    pub fn join_condition(&self, left_alias: &str, right_alias: &str) -> String {
        if self.keys.is_empty() {
            return ALWAYS_TRUE.to_string();
        }

        self.keys
            .iter()
            .map(|key| format!("{}.{} = {}.{}", left_alias, key, right_alias, key))
            .join(" AND ")
    }

    /// Column checked for NULL to find unmatched rows
    pub fn null_probe(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or(FALLBACK_NULL_COLUMN)
    }
}

fn key_column(entry: &MappingEntry) -> Option<String> {
    [&entry.target_column, &entry.source_column]
        .into_iter()
        .find(|c| !c.trim().is_empty())
        .cloned()
}

/// Collapse runs of whitespace (including newlines) to single spaces.
pub fn normalize_whitespace(expression: &str) -> String {
    expression.split_whitespace().join(" ")
}

/// Reconciliation SQL generator bound to one mapping set
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    mappings: Arc<MappingSet>,
    join_keys: JoinKeySelection,
}

impl QuerySynthesizer {
    pub fn new(mappings: Arc<MappingSet>) -> Self {
        let join_keys = JoinKeySelection::infer(mappings.entries());
        Self { mappings, join_keys }
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    pub fn join_keys(&self) -> &JoinKeySelection {
        &self.join_keys
    }

    /// SELECT list items, one per mapping entry, joined with `,\n`.
    pub fn select_clause(&self, source_alias: &str) -> String {
        self.mappings
            .iter()
            .filter(|entry| !entry.target_column.trim().is_empty())
            .map(|entry| {
                let expression = if entry.has_transformation() {
                    normalize_whitespace(&entry.transformation)
                } else if entry.has_source_column() {
                    format!("{}.{}", source_alias, entry.source_column)
                } else {
                    "NULL".to_string()
                };
                format!("    {} AS {}", expression, entry.target_column)
            })
            .join(",\n")
    }

    pub fn source_minus_target(&self, source: &TableRef, target: &TableRef) -> String {
        self.reconciliation_query(Direction::SourceMinusTarget, source, target)
    }

    pub fn target_minus_source(&self, source: &TableRef, target: &TableRef) -> String {
        self.reconciliation_query(Direction::TargetMinusSource, source, target)
    }

    /// Both directions in one script, separated by a comment line.
    pub fn complete_validation(&self, source: &TableRef, target: &TableRef) -> String {
        format!(
            "-- Complete Bidirectional Validation Query\n\
             -- Generated from ETL Mapping Document\n\
             \n\
             {}\n\
             \n\
             -- ========================================\n\
             \n\
             {}\n",
            self.source_minus_target(source, target),
            self.target_minus_source(source, target)
        )
    }

    pub fn query(&self, direction: Direction, source: &TableRef, target: &TableRef) -> String {
        self.reconciliation_query(direction, source, target)
    }

    fn reconciliation_query(&self, direction: Direction, source: &TableRef, target: &TableRef) -> String {
        let mut sql = String::new();

        sql.push_str(&format!("-- {} Validation Query\n", direction.title()));
        sql.push_str(&format!("-- {}\n\n", direction.description()));
        sql.push_str(&self.ctes(source, target));
        sql.push_str(&Self::difference_rows(direction));
        sql.push('\n');
        sql.push_str(&self.left_join_fallback(direction));

        sql
    }

    fn ctes(&self, source: &TableRef, target: &TableRef) -> String {
        format!(
            "WITH {source_cte} AS (\n  SELECT\n{select}\n  FROM {source_full} {source_alias}\n),\n\
             {target_cte} AS (\n  SELECT *\n  FROM {target_full}\n)\n",
            source_cte = SOURCE_CTE,
            select = self.select_clause(&source.name),
            source_full = source.full_name(),
            source_alias = source.name,
            target_cte = TARGET_CTE,
            target_full = target.full_name(),
        )
    }

    fn difference_rows(direction: Direction) -> String {
        let ((minuend, _), (subtrahend, _)) = direction.operands();
        let difference = format!(
            "FROM (\n  SELECT * FROM {}\n  EXCEPT\n  SELECT * FROM {}\n) diff\n",
            minuend, subtrahend
        );

        format!(
            "SELECT \n  '{label}' AS validation_type,\n  COUNT(*) AS record_count\n{difference}\
             UNION ALL\n\
             SELECT \n  'DETAIL' AS validation_type,\n  NULL AS record_count\n{difference}\
             LIMIT {limit};  -- Show first {limit} discrepancies\n",
            label = direction.label(),
            difference = difference,
            limit = DETAIL_LIMIT,
        )
    }

    fn left_join_fallback(&self, direction: Direction) -> String {
        let ((minuend, left), (subtrahend, right)) = direction.operands();

        format!(
            "-- Alternative using LEFT JOIN for databases that don't support EXCEPT:\n\
             /*\n\
             SELECT \n  {left}.*,\n  '{issue}' AS issue\n\
             FROM {minuend} {left}\n\
             LEFT JOIN {subtrahend} {right}\n  ON {condition}\n\
             WHERE {right}.{probe} IS NULL;\n\
             */\n",
            left = left,
            right = right,
            issue = direction.missing_issue(),
            minuend = minuend,
            subtrahend = subtrahend,
            condition = self.join_keys.join_condition(left, right),
            probe = self.join_keys.null_probe(),
        )
    }
}
