//! ConfigMap and Secret

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::manifest::RenderedManifest;
use crate::scope::Scope;
use crate::values::stringify;

fn string_data(data: &BTreeMap<String, JsonValue>) -> Result<BTreeMap<String, String>> {
    data.iter()
        .map(|(key, value)| Ok((key.clone(), stringify(value)?)))
        .collect()
}

/// Files mounted at `config.mountPath`
pub fn config_map(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let config = &scope.values.config;
    if config.data.is_empty() || !config.existing_config_map.is_empty() {
        return Ok(None);
    }

    let object = ConfigMap {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        data: Some(string_data(&config.data)?),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("configmap.yaml"), &object).map(Some)
}

/// Environment variables injected with `envFrom`
pub fn secret(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let secret = &scope.values.secret;
    if secret.data.is_empty() || !secret.existing_secret.is_empty() {
        return Ok(None);
    }

    let data = string_data(&secret.data)?
        .into_iter()
        .map(|(key, value)| (key, ByteString(value.into_bytes())))
        .collect();

    let object = Secret {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("secret.yaml"), &object).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;
    use serde_json::json;

    fn parse(manifest: &RenderedManifest) -> JsonValue {
        serde_yaml::from_str(&manifest.content).unwrap()
    }

    #[test]
    fn test_config_map() {
        let fx = Fixture::new(r#"
config:
  data:
    app.conf: "listen 8080"
    workers: 4
"#);
        let manifest = config_map(&fx.scope()).unwrap().unwrap();
        assert_eq!(manifest.source, "web/templates/configmap.yaml");

        let doc = parse(&manifest);
        assert_eq!(doc["kind"], "ConfigMap");
        assert_eq!(doc["metadata"]["name"], "prod-web");
        assert_eq!(doc["metadata"]["namespace"], "apps");
        assert_eq!(doc["data"], json!({"app.conf": "listen 8080", "workers": "4"}));
    }

    #[test]
    fn test_config_map_skipped() {
        assert!(config_map(&Fixture::new("").scope()).unwrap().is_none());

        let fx = Fixture::new("config: {data: {a: b}, existingConfigMap: shared}");
        assert!(config_map(&fx.scope()).unwrap().is_none());
    }

    #[test]
    fn test_secret_is_base64() {
        let fx = Fixture::new("secret: {data: {DB_PASSWORD: hunter2}}");
        let doc = parse(&secret(&fx.scope()).unwrap().unwrap());

        assert_eq!(doc["type"], "Opaque");
        assert_eq!(doc["data"]["DB_PASSWORD"], "aHVudGVyMg==");
    }

    #[test]
    fn test_secret_skipped_with_existing() {
        let fx = Fixture::new("secret: {data: {A: b}, existingSecret: creds}");
        assert!(secret(&fx.scope()).unwrap().is_none());
    }
}
