//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`] so `main` can pick the exit code
//! from the failure class while still printing the original help text.

use helmet_core::CoreError;
use helmet_render::RenderError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Values rejected by values.schema.json or malformed --set input
    #[error("Validation failed: {message}")]
    #[diagnostic(code(helmet::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Rendering failed
    #[error("Render failed: {message}")]
    #[diagnostic(code(helmet::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart directory or Chart.yaml problem
    #[error("Chart error: {message}")]
    #[diagnostic(code(helmet::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Linting failed with errors
    #[error("Linting failed with {errors} error(s) and {warnings} warning(s)")]
    #[diagnostic(code(helmet::cli::lint))]
    LintFailed { errors: usize, warnings: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(helmet::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(helmet::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::LintFailed { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a render error with help text
    pub fn render_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a lint failure error
    pub fn lint_failed(errors: usize, warnings: usize) -> Self {
        Self::LintFailed { errors, warnings }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ChartNotFound { .. } => CliError::Chart {
                message,
                help: Some("pass the path of a directory containing Chart.yaml".to_string()),
            },
            CoreError::InvalidChart { .. }
            | CoreError::YamlParse(_)
            | CoreError::JsonParse(_) => CliError::Chart {
                message,
                help: None,
            },
            CoreError::InvalidSet { .. } => CliError::validation_with_help(
                message,
                "use --set key=value, with dotted keys for nested values",
            ),
            CoreError::InvalidSchema { .. } | CoreError::InvalidVersion(_) => {
                CliError::Validation {
                    message,
                    help: None,
                }
            }
            CoreError::MissingRequired { .. } | CoreError::IncompatibleKubeVersion { .. } => {
                CliError::Render {
                    message,
                    help: None,
                }
            }
            CoreError::Io(_) => CliError::Io { message },
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        if let RenderError::Core(core) = err {
            return core.into();
        }
        CliError::Render {
            message: err.to_string(),
            help: err.help().map(|h| h.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
