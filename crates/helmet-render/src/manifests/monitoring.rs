//! Prometheus Operator resources
//!
//! The Prometheus Operator CRDs are not part of k8s-openapi, so these objects
//! are built as JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue, json};

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

pub const MONITORING_API_VERSION: &str = "monitoring.coreos.com/v1";

fn metadata(
    scope: &Scope<'_>,
    namespace: &str,
    extra_labels: &BTreeMap<String, String>,
) -> Result<JsonValue> {
    let mut meta = scope.metadata(&scope.fullname, &BTreeMap::new());
    if !namespace.is_empty() {
        meta.namespace = Some(namespace.to_string());
    }
    if let Some(labels) = meta.labels.as_mut() {
        for (key, value) in extra_labels {
            labels.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    Ok(serde_json::to_value(meta)?)
}

fn insert_if(map: &mut Map<String, JsonValue>, key: &str, value: JsonValue, condition: bool) {
    if condition {
        map.insert(key.to_string(), value);
    }
}

pub fn service_monitor(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.metrics.service_monitor;
    if !settings.enabled {
        return Ok(None);
    }

    let mut endpoint = Map::new();
    endpoint.insert("port".to_string(), json!(settings.port));
    endpoint.insert("path".to_string(), json!(settings.path));
    insert_if(&mut endpoint, "interval", json!(settings.interval), !settings.interval.is_empty());
    insert_if(
        &mut endpoint,
        "scrapeTimeout",
        json!(settings.scrape_timeout),
        !settings.scrape_timeout.is_empty(),
    );
    insert_if(&mut endpoint, "honorLabels", json!(true), settings.honor_labels);
    insert_if(
        &mut endpoint,
        "relabelings",
        json!(settings.relabelings),
        !settings.relabelings.is_empty(),
    );
    insert_if(
        &mut endpoint,
        "metricRelabelings",
        json!(settings.metric_relabelings),
        !settings.metric_relabelings.is_empty(),
    );

    let object = json!({
        "apiVersion": MONITORING_API_VERSION,
        "kind": "ServiceMonitor",
        "metadata": metadata(scope, &settings.namespace, &settings.labels)?,
        "spec": {
            "jobLabel": scope.name,
            "selector": {"matchLabels": scope.selector_labels()},
            "namespaceSelector": {"matchNames": [scope.namespace]},
            "endpoints": [endpoint],
        },
    });
    RenderedManifest::from_json(scope.source("servicemonitor.yaml"), &object).map(Some)
}

pub fn prometheus_rule(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.metrics.prometheus_rule;
    if !settings.enabled {
        return Ok(None);
    }
    if settings.rules.is_empty() {
        return Err(RenderError::MissingRequired {
            key: "metrics.prometheusRule.rules".to_string(),
        });
    }

    let object = json!({
        "apiVersion": MONITORING_API_VERSION,
        "kind": "PrometheusRule",
        "metadata": metadata(scope, &settings.namespace, &settings.labels)?,
        "spec": {
            "groups": [{
                "name": scope.fullname,
                "rules": settings.rules,
            }],
        },
    });
    RenderedManifest::from_json(scope.source("prometheusrule.yaml"), &object).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;

    fn parse(manifest: Option<RenderedManifest>) -> JsonValue {
        serde_yaml::from_str(&manifest.unwrap().content).unwrap()
    }

    #[test]
    fn test_service_monitor() {
        let fx = Fixture::new(r#"
metrics:
  serviceMonitor:
    enabled: true
    namespace: monitoring
    interval: 30s
    labels: {release: kube-prometheus}
"#);
        let manifest = service_monitor(&fx.scope()).unwrap();
        let doc = parse(manifest);

        assert_eq!(doc["apiVersion"], MONITORING_API_VERSION);
        assert_eq!(doc["kind"], "ServiceMonitor");
        assert_eq!(doc["metadata"]["namespace"], "monitoring");
        assert_eq!(doc["metadata"]["labels"]["release"], "kube-prometheus");
        assert_eq!(doc["spec"]["namespaceSelector"]["matchNames"], json!(["apps"]));
        assert_eq!(
            doc["spec"]["endpoints"],
            json!([{"port": "http", "path": "/metrics", "interval": "30s"}])
        );
    }

    #[test]
    fn test_service_monitor_disabled() {
        assert!(service_monitor(&Fixture::new("").scope()).unwrap().is_none());
    }

    #[test]
    fn test_prometheus_rule() {
        let fx = Fixture::new(r#"
metrics:
  prometheusRule:
    enabled: true
    rules:
      - alert: WebDown
        expr: up{job="web"} == 0
"#);
        let doc = parse(prometheus_rule(&fx.scope()).unwrap());
        assert_eq!(doc["kind"], "PrometheusRule");
        assert_eq!(doc["metadata"]["namespace"], "apps");
        assert_eq!(doc["spec"]["groups"][0]["name"], "prod-web");
        assert_eq!(doc["spec"]["groups"][0]["rules"][0]["alert"], "WebDown");
    }

    #[test]
    fn test_prometheus_rule_requires_rules() {
        let fx = Fixture::new("metrics: {prometheusRule: {enabled: true}}");
        let err = prometheus_rule(&fx.scope()).unwrap_err();
        assert_eq!(err.to_string(), "missing required value: metrics.prometheusRule.rules");
    }
}
