//! Render context

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::chart::Chart;
use crate::error::Result;
use crate::release::ReleaseInfo;
use crate::values::Values;

/// Everything the manifest helpers can see
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// User values (merged)
    pub values: Values,

    /// Release information
    pub release: ReleaseInfo,

    /// Chart metadata
    pub chart: Chart,

    /// Cluster capabilities
    pub capabilities: Capabilities,
}

/// Cluster capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Kubernetes version
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: Vec<String>,
}

impl Capabilities {
    /// Whether an API group/version (e.g. "monitoring.coreos.com/v1") is known
    ///
    /// An empty list means "unknown cluster" and accepts everything.
    pub fn has_api_version(&self, api_version: &str) -> bool {
        self.api_versions.is_empty() || self.api_versions.iter().any(|v| v == api_version)
    }
}

/// Kubernetes version info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        // Default to a recent stable Kubernetes version for template/lint
        Self {
            version: "v1.31.0".to_string(),
            major: "1".to_string(),
            minor: "31".to_string(),
        }
    }
}

impl KubeVersion {
    /// Parse "v1.29", "1.29.3" or "v1.28.3-gke.100"
    pub fn parse(version: &str) -> Result<Self> {
        let semver = parse_loose(version)?;
        Ok(Self {
            version: format!("v{}", semver),
            major: semver.major.to_string(),
            minor: semver.minor.to_string(),
        })
    }

    /// Version as SemVer for constraint checks
    pub fn semver(&self) -> Result<Version> {
        parse_loose(&self.version)
    }
}

/// Accept versions with a leading 'v' and a missing patch component
fn parse_loose(version: &str) -> Result<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    let (core, suffix) = match trimmed.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (trimmed, None),
    };

    let mut core = core.to_string();
    while core.matches('.').count() < 2 {
        core.push_str(".0");
    }

    let full = match suffix {
        Some(pre) => format!("{}-{}", core, pre),
        None => core,
    };
    Ok(Version::parse(&full)?)
}

impl RenderContext {
    /// Create a new render context
    pub fn new(values: Values, release: ReleaseInfo, chart: Chart) -> Self {
        Self {
            values,
            release,
            chart,
            capabilities: Capabilities::default(),
        }
    }

    /// Set capabilities
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}
