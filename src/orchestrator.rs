//! Validation Orchestrator - load once, then generate on demand
//!
//! ```text
//! Unloaded --load()--> Loaded
//! ```
//!
//! There is no way back to `Unloaded`; loading a different mapping needs a
//! fresh orchestrator. Generation is a pure function of the bound mapping and
//! the arguments, so a loaded orchestrator can serve concurrent readers.

use crate::error::{ReconError, Result};
use crate::loader::MappingLoader;
use crate::mapping::{MappingSet, MappingSummary};
use crate::synthesizer::{Direction, JoinKeySelection, QuerySynthesizer, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Source table used when none is given and none can be detected
pub const DEFAULT_SOURCE_TABLE: &str = "source_table";

pub const COMPLETE_KEY: &str = "complete";

/// Which reconciliation queries to generate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    #[default]
    Both,
    SourceMinusTarget,
    TargetMinusSource,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Both => "both",
            QueryMode::SourceMinusTarget => "source_minus_target",
            QueryMode::TargetMinusSource => "target_minus_source",
        }
    }

    pub fn includes(&self, direction: Direction) -> bool {
        match self {
            QueryMode::Both => true,
            QueryMode::SourceMinusTarget => direction == Direction::SourceMinusTarget,
            QueryMode::TargetMinusSource => direction == Direction::TargetMinusSource,
        }
    }
}

impl FromStr for QueryMode {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "both" => Ok(QueryMode::Both),
            "source_minus_target" => Ok(QueryMode::SourceMinusTarget),
            "target_minus_source" => Ok(QueryMode::TargetMinusSource),
            _ => Err(ReconError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated SQL keyed by `source_minus_target`, `target_minus_source` and `complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuerySet {
    pub queries: BTreeMap<String, String>,

    /// Keys used by the commented LEFT JOIN fallback, and how they were chosen
    pub join_keys: JoinKeySelection,
}

impl GeneratedQuerySet {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.queries.get(key).map(String::as_str)
    }

    pub fn source_minus_target(&self) -> Option<&str> {
        self.get(Direction::SourceMinusTarget.key())
    }

    pub fn target_minus_source(&self) -> Option<&str> {
        self.get(Direction::TargetMinusSource.key())
    }

    pub fn complete(&self) -> Option<&str> {
        self.get(COMPLETE_KEY)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

enum SessionState {
    Unloaded,
    Loaded {
        mappings: Arc<MappingSet>,
        synthesizer: QuerySynthesizer,
    },
}

pub struct ValidationOrchestrator {
    state: SessionState,
}

impl Default for ValidationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationOrchestrator {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unloaded,
        }
    }

    /// Start in the loaded state from an already-built mapping.
    pub fn from_mapping_set(mappings: MappingSet) -> Self {
        let mut orchestrator = Self::new();
        orchestrator.bind(mappings);
        orchestrator
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SessionState::Loaded { .. })
    }

    /// Load and validate a mapping document, binding a synthesizer to it.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<MappingSet>> {
        if self.is_loaded() {
            return Err(ReconError::AlreadyLoaded);
        }

        let mappings = MappingLoader::load(path)?;
        Ok(self.bind(mappings))
    }

    /// Same as `load`, for delimited text already in memory.
    pub fn load_str(&mut self, text: &str, delimiter: u8) -> Result<Arc<MappingSet>> {
        if self.is_loaded() {
            return Err(ReconError::AlreadyLoaded);
        }

        let mappings = MappingLoader::load_str(text, delimiter)?;
        Ok(self.bind(mappings))
    }

    fn bind(&mut self, mappings: MappingSet) -> Arc<MappingSet> {
        let mappings = Arc::new(mappings);
        let synthesizer = QuerySynthesizer::new(Arc::clone(&mappings));
        debug!(
            mappings = mappings.len(),
            join_keys = ?synthesizer.join_keys().keys,
            "Bound query synthesizer"
        );

        self.state = SessionState::Loaded {
            mappings: Arc::clone(&mappings),
            synthesizer,
        };
        mappings
    }

    pub fn mappings(&self) -> Option<&MappingSet> {
        match &self.state {
            SessionState::Loaded { mappings, .. } => Some(mappings.as_ref()),
            SessionState::Unloaded => None,
        }
    }

    pub fn synthesizer(&self) -> Result<&QuerySynthesizer> {
        match &self.state {
            SessionState::Loaded { synthesizer, .. } => Ok(synthesizer),
            SessionState::Unloaded => Err(ReconError::NotLoaded),
        }
    }

    /// Generate the requested reconciliation queries; `Both` adds `complete`.
    pub fn generate_validation_queries(
        &self,
        source: &TableRef,
        target: &TableRef,
        mode: QueryMode,
    ) -> Result<GeneratedQuerySet> {
        let synthesizer = self.synthesizer()?;
        let mut queries = BTreeMap::new();

        for direction in [Direction::SourceMinusTarget, Direction::TargetMinusSource] {
            if mode.includes(direction) {
                queries.insert(direction.key().to_string(), synthesizer.query(direction, source, target));
            }
        }

        if mode == QueryMode::Both {
            queries.insert(COMPLETE_KEY.to_string(), synthesizer.complete_validation(source, target));
        }

        info!(
            source = %source,
            target = %target,
            mode = %mode,
            queries = queries.len(),
            "Generated validation queries"
        );

        Ok(GeneratedQuerySet {
            queries,
            join_keys: synthesizer.join_keys().clone(),
        })
    }

    /// Summary statistics of the loaded mapping; empty when nothing is loaded.
    pub fn get_summary(&self) -> MappingSummary {
        self.mappings().map(MappingSet::summary).unwrap_or_default()
    }

    /// First detected source table, or `source_table` if there is none.
    pub fn default_source_table(&self) -> String {
        self.mappings()
            .and_then(|m| m.detected_source_tables().first().cloned())
            .unwrap_or_else(|| DEFAULT_SOURCE_TABLE.to_string())
    }
}
