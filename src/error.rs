//! Error taxonomy for the fraud scoring service

use thiserror::Error;

/// Result alias used across the library
pub type ShieldResult<T> = std::result::Result<T, ShieldError>;

/// Errors raised by provisioning, loading and scoring.
///
/// `ArtifactLoad` is fatal at startup. The other two are scoped to a single
/// interaction and are reported back to the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShieldError {
    /// Artifact missing, corrupt, or structurally invalid
    #[error("artifact load failed: {0}")]
    ArtifactLoad(String),

    /// Malformed user input (wrong field count, non-numeric value, missing columns)
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Failure inside the inference call
    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl ShieldError {
    pub fn artifact(msg: impl Into<String>) -> Self {
        ShieldError::ArtifactLoad(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ShieldError::InvalidRecord(msg.into())
    }

    pub fn prediction(msg: impl Into<String>) -> Self {
        ShieldError::Prediction(msg.into())
    }

    /// Short machine-readable kind, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ShieldError::ArtifactLoad(_) => "artifact_load",
            ShieldError::InvalidRecord(_) => "invalid_record",
            ShieldError::Prediction(_) => "prediction",
        }
    }

    pub fn is_invalid_record(&self) -> bool {
        matches!(self, ShieldError::InvalidRecord(_))
    }
}
