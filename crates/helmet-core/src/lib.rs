//! Helmet Core - chart values and metadata
//!
//! This crate provides the foundational types used by the renderer and CLI:
//! - `Values`: Configuration values with deep merge and required-key checks
//! - `Chart`: Chart.yaml metadata and chart directory loading
//! - `ReleaseInfo`: Release name/namespace used for naming and labels
//! - `RenderContext`: Everything a manifest helper may look at
//! - `names`: Kubernetes-safe name helpers (63 character limit)
//! - `SchemaValidator`: values.schema.json validation

pub mod chart;
pub mod context;
pub mod error;
pub mod names;
pub mod release;
pub mod schema;
pub mod values;

pub use chart::{Chart, ChartType, LoadedChart, Maintainer};
pub use context::{Capabilities, KubeVersion, RenderContext};
pub use error::{CoreError, Result, ValidationErrorInfo};
pub use release::ReleaseInfo;
pub use schema::{SchemaValidator, ValidationResult};
pub use values::{Values, parse_set_values};
