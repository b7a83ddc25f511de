//! Chart definition and loading

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::values::Values;

/// The only Chart.yaml apiVersion we understand
pub const CHART_API_VERSION: &str = "v2";

/// Chart.yaml contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// API version (v2)
    pub api_version: String,

    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,

    /// Version of the packaged application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Chart type
    #[serde(default, rename = "type")]
    pub chart_type: ChartType,

    /// Kubernetes version constraint (SemVer requirement, e.g. ">=1.25.0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Chart type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Application,
    /// Helpers only, cannot be rendered on its own
    Library,
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartType::Application => write!(f, "application"),
            ChartType::Library => write!(f, "library"),
        }
    }
}

/// Maintainer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Chart {
    /// Parse and validate Chart.yaml contents
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let chart: Chart = serde_yaml::from_str(yaml)?;
        chart.validate()?;
        Ok(chart)
    }

    fn validate(&self) -> Result<()> {
        if self.api_version != CHART_API_VERSION {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "Unsupported API version: {}. Expected: {}",
                    self.api_version, CHART_API_VERSION
                ),
            });
        }

        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                message: "name must not be empty".to_string(),
            });
        }

        if let Some(constraint) = &self.kube_version {
            parse_kube_requirement(constraint)?;
        }

        Ok(())
    }

    /// Check the chart's kubeVersion constraint against a target version
    ///
    /// Charts without a constraint accept every version.
    pub fn check_kube_version(&self, target: &Version) -> Result<()> {
        let Some(constraint) = &self.kube_version else {
            return Ok(());
        };

        let req = parse_kube_requirement(constraint)?;
        // Pre-release suffixes like "-gke.100" would never match a plain requirement
        let comparable = Version::new(target.major, target.minor, target.patch);

        if req.matches(&comparable) {
            Ok(())
        } else {
            Err(CoreError::IncompatibleKubeVersion {
                constraint: constraint.clone(),
                actual: target.to_string(),
            })
        }
    }

    pub fn is_library(&self) -> bool {
        self.chart_type == ChartType::Library
    }
}

/// Parse a Kubernetes version requirement, tolerating a leading 'v'
fn parse_kube_requirement(constraint: &str) -> Result<VersionReq> {
    let normalized = constraint.replace(">=v", ">=").replace("^v", "^").replace("~v", "~");
    Ok(VersionReq::parse(normalized.trim_start_matches('v'))?)
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Chart loaded from disk
#[derive(Debug, Clone)]
pub struct LoadedChart {
    /// Chart.yaml
    pub chart: Chart,

    /// Root directory of the chart
    pub root: PathBuf,

    /// Default values from values.yaml (empty if the file is absent)
    pub values: Values,

    /// values.schema.json contents, if present
    pub schema: Option<serde_json::Value>,
}

impl LoadedChart {
    /// Load a chart from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let chart_file = root.join("Chart.yaml");
        if !chart_file.exists() {
            return Err(CoreError::InvalidChart {
                message: format!("Chart.yaml not found in {}", root.display()),
            });
        }

        let chart = Chart::from_yaml(&std::fs::read_to_string(&chart_file)?)?;

        let values_path = root.join("values.yaml");
        let values = if values_path.exists() {
            Values::from_file(&values_path)?
        } else {
            Values::new()
        };

        let schema_path = root.join("values.schema.json");
        let schema = if schema_path.exists() {
            let content = std::fs::read_to_string(&schema_path)?;
            Some(serde_json::from_str(&content)?)
        } else {
            None
        };

        tracing::debug!(
            chart = %chart.name,
            version = %chart.version,
            has_schema = schema.is_some(),
            "loaded chart"
        );

        Ok(Self {
            chart,
            root,
            values,
            schema,
        })
    }
}
