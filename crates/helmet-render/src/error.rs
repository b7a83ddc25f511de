//! Render error types

use helmet_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Main render error type
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    /// A value marked as required is absent or empty
    #[error("missing required value: {key}")]
    #[diagnostic(
        code(helmet::render::missing_required),
        help("set it in a values file or with --set <key>=<value>")
    )]
    MissingRequired { key: String },

    /// A value is present but cannot be used
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(helmet::render::invalid_value))]
    InvalidValue {
        key: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The merged values do not match the expected shape
    #[error("values do not match the chart layout: {0}")]
    #[diagnostic(
        code(helmet::render::values_shape),
        help("run `helmet show defaults` to see the expected layout")
    )]
    ValuesShape(#[source] serde_json::Error),

    #[error("library chart `{name}` cannot be rendered")]
    #[diagnostic(
        code(helmet::render::library_chart),
        help("library charts only provide helpers; render an application chart instead")
    )]
    LibraryChart { name: String },

    #[error(transparent)]
    #[diagnostic(code(helmet::render::core))]
    Core(CoreError),

    #[error("YAML error: {0}")]
    #[diagnostic(code(helmet::render::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(helmet::render::json))]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// Create an invalid value error
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
            help: None,
        }
    }

    /// Create an invalid value error with help text
    pub fn invalid_with_help(
        key: impl Into<String>,
        message: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for RenderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingRequired { key } => Self::MissingRequired { key },
            other => Self::Core(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
