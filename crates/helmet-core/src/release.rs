//! Release information

use serde::{Deserialize, Serialize};

/// Value of `app.kubernetes.io/managed-by` on everything we render
pub const RELEASE_SERVICE: &str = "Helmet";

/// Release information used for naming and labels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Revision number
    pub revision: u32,

    /// Is this an install operation?
    pub is_install: bool,

    /// Is this an upgrade operation?
    pub is_upgrade: bool,

    /// Service (always "Helmet")
    pub service: String,
}

impl ReleaseInfo {
    /// Create release info for a new install
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: RELEASE_SERVICE.to_string(),
        }
    }

    /// Create release info for an upgrade
    pub fn for_upgrade(name: &str, namespace: &str, revision: u32) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision,
            is_install: false,
            is_upgrade: true,
            service: RELEASE_SERVICE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_and_upgrade() {
        let install = ReleaseInfo::for_install("web", "prod");
        assert_eq!(install.revision, 1);
        assert!(install.is_install && !install.is_upgrade);
        assert_eq!(install.service, "Helmet");

        let upgrade = ReleaseInfo::for_upgrade("web", "prod", 4);
        assert_eq!(upgrade.revision, 4);
        assert!(upgrade.is_upgrade && !upgrade.is_install);
    }
}
