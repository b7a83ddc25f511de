//! Pod annotations that change whenever mounted configuration changes

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::manifest::RenderedManifest;

pub const CONFIG_ANNOTATION: &str = "checksum/config";
pub const SECRET_ANNOTATION: &str = "checksum/secret";

/// Lowercase hex SHA-256 of `content`
#[must_use]
pub fn sha256_hex(content: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(content.as_bytes());
    format!("{:x}", sha.finalize())
}

/// `checksum/*` annotations for the ConfigMap and Secret rendered in this release
pub fn annotations(
    config_map: Option<&RenderedManifest>,
    secret: Option<&RenderedManifest>,
) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    if let Some(manifest) = config_map {
        annotations.insert(CONFIG_ANNOTATION.to_string(), sha256_hex(&manifest.content));
    }
    if let Some(manifest) = secret {
        annotations.insert(SECRET_ANNOTATION.to_string(), sha256_hex(&manifest.content));
    }
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_annotations_follow_content() {
        let cm = RenderedManifest::raw("configmap.yaml", "v1", "ConfigMap", "a", "data: {x: '1'}\n");
        let changed = RenderedManifest::raw("configmap.yaml", "v1", "ConfigMap", "a", "data: {x: '2'}\n");

        let before = annotations(Some(&cm), None);
        let after = annotations(Some(&changed), None);
        assert_ne!(before[CONFIG_ANNOTATION], after[CONFIG_ANNOTATION]);
        assert!(!before.contains_key(SECRET_ANNOTATION));
        assert!(annotations(None, None).is_empty());
    }
}
