use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    /// Malformed, empty or incomplete mapping input. The message is meant to
    /// be shown to the mapping author as-is.
    #[error("{0}")]
    Format(String),

    #[error("Mappings not loaded. Call load() first.")]
    NotLoaded,

    #[error("Mappings already loaded. Create a new orchestrator to load a different mapping file.")]
    AlreadyLoaded,

    #[error("Invalid query mode: '{0}'. Expected: both, source_minus_target, or target_minus_source")]
    InvalidMode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl ReconError {
    pub fn format(message: impl Into<String>) -> Self {
        ReconError::Format(message.into())
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ReconError::Format(_))
    }
}

impl From<polars::error::PolarsError> for ReconError {
    fn from(err: polars::error::PolarsError) -> Self {
        ReconError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
