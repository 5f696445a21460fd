//! Environment configuration
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binary). Command-line flags take precedence over anything set here.

use crate::error::Result;
use crate::orchestrator::QueryMode;
use std::collections::HashMap;
use std::path::PathBuf;

pub const SOURCE_SCHEMA_VAR: &str = "ETL_RECON_SOURCE_SCHEMA";
pub const TARGET_SCHEMA_VAR: &str = "ETL_RECON_TARGET_SCHEMA";
pub const MODE_VAR: &str = "ETL_RECON_MODE";
pub const OUTPUT_DIR_VAR: &str = "ETL_RECON_OUTPUT_DIR";
pub const LOG_VAR: &str = "ETL_RECON_LOG";

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconConfig {
    pub source_schema: Option<String>,
    pub target_schema: Option<String>,
    pub mode: QueryMode,
    pub output_dir: Option<PathBuf>,
    /// `tracing` filter directive used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            source_schema: None,
            target_schema: None,
            mode: QueryMode::Both,
            output_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ReconConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode = match non_blank(MODE_VAR) {
            Some(mode) => mode.parse()?,
            None => QueryMode::default(),
        };

        Ok(Self {
            source_schema: non_blank(SOURCE_SCHEMA_VAR),
            target_schema: non_blank(TARGET_SCHEMA_VAR),
            mode,
            output_dir: non_blank(OUTPUT_DIR_VAR).map(PathBuf::from),
            log_level: non_blank(LOG_VAR).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
