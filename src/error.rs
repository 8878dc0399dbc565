//! Error types for Redline
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::GatewayError;

/// All error types that can occur in a comparison run
#[derive(Debug, Error)]
pub enum RedlineError {
    /// Input document could not be turned into text
    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// A stage reads a key that nothing upstream produces
    #[error("Stage '{stage}' is missing required input '{key}'")]
    MissingDependency { stage: String, key: String },

    /// Write-once violation on the pipeline state
    #[error("State key already set: {0}")]
    KeyAlreadySet(String),

    /// Read of a key that was never written
    #[error("State key not found: {0}")]
    KeyNotFound(String),

    /// Prompt template could not be compiled or rendered
    #[error("Template error: {0}")]
    Template(String),

    /// The LLM gateway failed while a stage was running
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: GatewayError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RedlineError {
    /// Build a load error for the given path
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RedlineError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The gateway error behind a failed stage, if any
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            RedlineError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for Redline operations
pub type Result<T> = std::result::Result<T, RedlineError>;
