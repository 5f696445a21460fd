//! Mapping-to-SQL reconciliation compiler
//!
//! Loads a declarative column mapping (source column, target column,
//! transformation, key flag), validates it, and compiles it into SQL that
//! checks whether the transformation was applied correctly:
//!
//! ```rust,ignore
//! use etl_recon::prelude::*;
//!
//! let mut orchestrator = ValidationOrchestrator::new();
//! orchestrator.load("mappings/orders.csv")?;
//!
//! let queries = orchestrator.generate_validation_queries(
//!     &TableRef::new("orders").with_schema("staging"),
//!     &TableRef::new("fact_orders"),
//!     QueryMode::Both,
//! )?;
//! println!("{}", queries.complete().unwrap_or_default());
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod observability;
pub mod orchestrator;
pub mod report;
pub mod synthesizer;

pub mod prelude {
    pub use crate::error::{ReconError, Result};
    pub use crate::loader::MappingLoader;
    pub use crate::mapping::{MappingEntry, MappingSet, MappingSummary};
    pub use crate::orchestrator::{GeneratedQuerySet, QueryMode, ValidationOrchestrator};
    pub use crate::synthesizer::{Direction, JoinKeySelection, KeyOrigin, QuerySynthesizer, TableRef};
}
