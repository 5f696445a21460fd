//! Validation report - generated queries plus the facts they were built from
//!
//! Written as one `<key>.sql` file per query and a `report.json` with the
//! whole structure, so a run can be reviewed or executed later.

use crate::error::Result;
use crate::mapping::MappingSummary;
use crate::orchestrator::{GeneratedQuerySet, QueryMode};
use crate::synthesizer::TableRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub mapping_file: Option<PathBuf>,
    pub source: TableRef,
    pub target: TableRef,
    pub mode: QueryMode,
    pub summary: MappingSummary,
    #[serde(flatten)]
    pub queries: GeneratedQuerySet,
}

impl ValidationReport {
    pub fn new(
        mapping_file: Option<PathBuf>,
        source: TableRef,
        target: TableRef,
        mode: QueryMode,
        summary: MappingSummary,
        queries: GeneratedQuerySet,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            mapping_file,
            source,
            target,
            mode,
            summary,
            queries,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write every query and the JSON report into `dir`, creating it if needed.
    /// Returns the written paths, SQL files first in key order.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.queries.len() + 1);
        for (key, sql) in &self.queries.queries {
            let path = dir.join(format!("{}.sql", key));
            fs::write(&path, sql)?;
            written.push(path);
        }

        let report_path = dir.join(REPORT_FILE);
        fs::write(&report_path, self.to_json()?)?;
        written.push(report_path);

        info!(dir = %dir.display(), files = written.len(), "Wrote validation report");
        Ok(written)
    }
}
