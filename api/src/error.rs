//! Error types for the prediction service.
//!
//! `PredictError` is the closed taxonomy every prediction request can fail
//! with. Handlers branch on [`PredictErrorKind`] to pick a response, never on
//! message text.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictErrorKind {
    ServiceUnavailable,
    Validation,
    UnknownCategory,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("Model or encoder not loaded. Please train the model first.")]
    ServiceUnavailable,

    #[error("{0}")]
    Validation(String),

    #[error("Menu '{0}' not found in trained data.")]
    UnknownCategory(String),

    #[error("Internal prediction error: {0}")]
    Internal(String),
}

impl PredictError {
    pub fn kind(&self) -> PredictErrorKind {
        match self {
            PredictError::ServiceUnavailable => PredictErrorKind::ServiceUnavailable,
            PredictError::Validation(_) => PredictErrorKind::Validation,
            PredictError::UnknownCategory(_) => PredictErrorKind::UnknownCategory,
            PredictError::Internal(_) => PredictErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PredictError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PredictError::Internal(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("invalid encoder: {0}")]
    InvalidEncoder(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;
pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
