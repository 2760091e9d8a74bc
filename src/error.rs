//! Error types shared across the analysis core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur while composing or executing an analysis workflow.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A purpose or objective value outside the closed enumerations.
    #[error("Unknown {kind}: '{value}'")]
    UnknownCategory { kind: &'static str, value: String },

    /// A workflow was requested without any objective.
    #[error("At least one objective must be selected")]
    NoObjectives,

    /// An imported workflow record is structurally invalid.
    #[error("Invalid workflow record: {0}")]
    InvalidRecord(String),

    /// The backend answered, but with an empty output.
    ///
    /// Only ever observed inside the generation adapter's escalation chain.
    #[error("Generation backend returned an empty result")]
    EmptyGenerationResult,

    /// Hard transport, authentication or rate-limit failure.
    #[error("Generation backend failed: {0}")]
    GenerationBackendFailure(String),

    /// A re-run was requested for a step that has no record yet.
    #[error("Step '{0}' has not been executed yet")]
    StepNotExecuted(String),

    /// The declarative step-definition source is absent.
    #[error("Configuration file not found: {0}")]
    ConfigurationMissing(PathBuf),

    /// The step-definition source exists but is malformed.
    #[error("Invalid step definition: {0}")]
    InvalidDefinition(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Build an `UnknownCategory` error.
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownCategory { kind, value: value.into() }
    }

    /// Whether this error must halt step progression.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::GenerationBackendFailure(_))
    }
}
