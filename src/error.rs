//! Error handling for Scaffold
//!
//! Configuration problems degrade to defaults inside the toggle layer and
//! per-layer failures are absorbed by the conductor, so most of these
//! variants surface only in logs and provenance.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::Layer;

/// Result type alias for Scaffold operations
pub type Result<T> = std::result::Result<T, ScaffoldError>;

/// Main error type for Scaffold operations
#[derive(Error, Debug)]
pub enum ScaffoldError {
    // Plan Errors
    #[error("No operator bound for layer '{layer}'")]
    UnboundLayer { layer: Layer },

    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    // Execution Errors
    #[error("Operator '{operator_id}' failed on layer '{layer}': {reason}")]
    OperatorFailed {
        layer: Layer,
        operator_id: String,
        reason: String,
    },

    #[error("Generation backend error: {reason}")]
    Generation { reason: String },

    // Experiment Errors
    #[error("Invalid experiment configuration: {reason}")]
    InvalidExperiment { reason: String },

    // Profile / Settings Errors
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ScaffoldError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ScaffoldError::UnboundLayer { .. } => "UNBOUND_LAYER",
            ScaffoldError::UnknownLayer { .. } => "UNKNOWN_LAYER",
            ScaffoldError::OperatorFailed { .. } => "OPERATOR_FAILED",
            ScaffoldError::Generation { .. } => "GENERATION_ERROR",
            ScaffoldError::InvalidExperiment { .. } => "INVALID_EXPERIMENT",
            ScaffoldError::FileRead { .. } => "FILE_READ_ERROR",
            ScaffoldError::InvalidProfile { .. } => "INVALID_PROFILE",
            ScaffoldError::Io(_) => "IO_ERROR",
            ScaffoldError::Serialization(_) => "SERIALIZATION_ERROR",
            ScaffoldError::Yaml(_) => "YAML_ERROR",
        }
    }

    /// Check if this error is absorbed by the pipeline instead of aborting it
    ///
    /// Recoverable errors leave an empty layer slot (or a default profile);
    /// the rest abort the compilation that raised them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScaffoldError::OperatorFailed { .. }
                | ScaffoldError::Generation { .. }
                | ScaffoldError::FileRead { .. }
                | ScaffoldError::InvalidProfile { .. }
                | ScaffoldError::Yaml(_)
        )
    }

    /// Shorthand used by operators to report a failure on their own layer
    pub fn operator_failed(
        layer: Layer,
        operator_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ScaffoldError::OperatorFailed {
            layer,
            operator_id: operator_id.into(),
            reason: reason.into(),
        }
    }
}
