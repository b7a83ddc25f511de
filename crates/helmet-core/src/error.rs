//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Invalid --set value: {message}")]
    InvalidSet { message: String },

    #[error("missing required value: {key}")]
    MissingRequired { key: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Chart requires Kubernetes {constraint}, target is {actual}")]
    IncompatibleKubeVersion { constraint: String, actual: String },
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationErrorInfo {
    /// JSON pointer to the offending value, `(root)` for the document itself
    pub path: String,

    /// Human-readable message
    pub message: String,
}

pub type Result<T> = std::result::Result<T, CoreError>;
