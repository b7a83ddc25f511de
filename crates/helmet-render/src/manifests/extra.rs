//! Raw objects from `extraDeploy`

use serde_json::Value as JsonValue;

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

fn has_string(object: &JsonValue, key: &str) -> bool {
    object.get(key).and_then(JsonValue::as_str).is_some_and(|s| !s.is_empty())
}

/// Every entry verbatim, in order
pub fn extra_deploy(scope: &Scope<'_>) -> Result<Vec<RenderedManifest>> {
    let source = scope.source("extra-list.yaml");
    scope
        .values
        .extra_deploy
        .iter()
        .enumerate()
        .map(|(index, object)| {
            if !object.is_object() {
                return Err(RenderError::invalid(
                    format!("extraDeploy[{}]", index),
                    "entries must be Kubernetes objects",
                ));
            }
            for key in ["apiVersion", "kind"] {
                if !has_string(object, key) {
                    return Err(RenderError::invalid(
                        format!("extraDeploy[{}]", index),
                        format!("object has no `{}`", key),
                    ));
                }
            }
            RenderedManifest::from_json(source.clone(), object)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;

    #[test]
    fn test_extra_deploy_verbatim() {
        let fx = Fixture::new(r#"
extraDeploy:
  - apiVersion: v1
    kind: ConfigMap
    metadata: {name: extra}
    data: {a: b}
"#);
        let manifests = extra_deploy(&fx.scope()).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].kind, "ConfigMap");
        assert_eq!(manifests[0].source, "web/templates/extra-list.yaml");

        let doc: JsonValue = serde_yaml::from_str(&manifests[0].content).unwrap();
        assert_eq!(doc["data"]["a"], "b");
    }

    #[test]
    fn test_extra_deploy_requires_kind() {
        let fx = Fixture::new("extraDeploy: [{apiVersion: v1, metadata: {name: x}}]");
        let err = extra_deploy(&fx.scope()).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for `extraDeploy[0]`: object has no `kind`");

        let fx = Fixture::new("extraDeploy: [just-a-string]");
        assert!(extra_deploy(&fx.scope()).is_err());
    }
}
