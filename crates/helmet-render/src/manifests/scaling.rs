//! HorizontalPodAutoscaler and PodDisruptionBudget

use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

fn utilization_metric(resource: &str, percent: i32) -> MetricSpec {
    MetricSpec {
        type_: "Resource".to_string(),
        resource: Some(ResourceMetricSource {
            name: resource.to_string(),
            target: MetricTarget {
                type_: "Utilization".to_string(),
                average_utilization: Some(percent),
                ..Default::default()
            },
        }),
        ..Default::default()
    }
}

pub fn hpa(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.autoscaling;
    if !settings.enabled {
        return Ok(None);
    }
    if settings.max_replicas < 1 {
        return Err(RenderError::invalid("autoscaling.maxReplicas", "must be at least 1"));
    }
    if settings.min_replicas > settings.max_replicas {
        return Err(RenderError::invalid(
            "autoscaling.minReplicas",
            format!(
                "{} is greater than autoscaling.maxReplicas ({})",
                settings.min_replicas, settings.max_replicas
            ),
        ));
    }

    let metrics: Vec<MetricSpec> = [("cpu", settings.target_cpu), ("memory", settings.target_memory)]
        .into_iter()
        .filter_map(|(resource, target)| target.map(|percent| utilization_metric(resource, percent)))
        .collect();

    let object = HorizontalPodAutoscaler {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: scope.fullname.clone(),
            },
            min_replicas: Some(settings.min_replicas),
            max_replicas: settings.max_replicas,
            metrics: (!metrics.is_empty()).then_some(metrics),
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("hpa.yaml"), &object).map(Some)
}

/// `"2"` becomes `2`, `"50%"` stays a string, `""` counts as unset
fn normalize(value: &Option<IntOrString>) -> Option<IntOrString> {
    match value {
        Some(IntOrString::String(s)) if s.is_empty() => None,
        Some(IntOrString::String(s)) => Some(match s.parse::<i32>() {
            Ok(number) => IntOrString::Int(number),
            Err(_) => IntOrString::String(s.clone()),
        }),
        other => other.clone(),
    }
}

pub fn pdb(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.pdb;
    if !settings.create {
        return Ok(None);
    }

    let min_available = normalize(&settings.min_available);
    let max_unavailable = match (&min_available, normalize(&settings.max_unavailable)) {
        (Some(_), Some(_)) => {
            tracing::warn!("pdb.minAvailable and pdb.maxUnavailable are both set; using minAvailable");
            None
        }
        (Some(_), None) => None,
        (None, Some(max)) => Some(max),
        (None, None) => Some(IntOrString::Int(1)),
    };

    let object = PodDisruptionBudget {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        spec: Some(PodDisruptionBudgetSpec {
            min_available,
            max_unavailable,
            selector: Some(LabelSelector {
                match_labels: Some(scope.selector_labels()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("pdb.yaml"), &object).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;
    use serde_json::{Value as JsonValue, json};

    fn parse(manifest: Option<RenderedManifest>) -> JsonValue {
        serde_yaml::from_str(&manifest.unwrap().content).unwrap()
    }

    #[test]
    fn test_hpa() {
        let fx = Fixture::new("autoscaling: {enabled: true, minReplicas: 2, maxReplicas: 6, targetMemory: 70}");
        let doc = parse(hpa(&fx.scope()).unwrap());

        assert_eq!(doc["apiVersion"], "autoscaling/v2");
        assert_eq!(
            doc["spec"]["scaleTargetRef"],
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "name": "prod-web"})
        );
        assert_eq!(doc["spec"]["minReplicas"], 2);
        assert_eq!(doc["spec"]["maxReplicas"], 6);
        let metrics = doc["spec"]["metrics"].as_array().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0]["resource"]["name"], "cpu");
        assert_eq!(metrics[0]["resource"]["target"]["averageUtilization"], 80);
        assert_eq!(metrics[1]["resource"]["name"], "memory");
    }

    #[test]
    fn test_hpa_bounds() {
        let fx = Fixture::new("autoscaling: {enabled: true, minReplicas: 5, maxReplicas: 2}");
        let err = hpa(&fx.scope()).unwrap_err();
        assert!(err.to_string().contains("autoscaling.minReplicas"));

        assert!(hpa(&Fixture::new("").scope()).unwrap().is_none());
    }

    #[test]
    fn test_pdb_default_max_unavailable() {
        let doc = parse(pdb(&Fixture::new("pdb: {create: true}").scope()).unwrap());
        assert_eq!(doc["apiVersion"], "policy/v1");
        assert_eq!(doc["spec"]["maxUnavailable"], 1);
        assert!(doc["spec"].get("minAvailable").is_none());
    }

    #[test]
    fn test_pdb_min_available_wins() {
        let fx = Fixture::new("pdb: {create: true, minAvailable: '2', maxUnavailable: 1}");
        let doc = parse(pdb(&fx.scope()).unwrap());
        assert_eq!(doc["spec"]["minAvailable"], 2);
        assert!(doc["spec"].get("maxUnavailable").is_none());
    }

    #[test]
    fn test_pdb_percentages() {
        let fx = Fixture::new("pdb: {create: true, maxUnavailable: '50%'}");
        let doc = parse(pdb(&fx.scope()).unwrap());
        assert_eq!(doc["spec"]["maxUnavailable"], "50%");

        let fx = Fixture::new("pdb: {create: true, minAvailable: '', maxUnavailable: ''}");
        let doc = parse(pdb(&fx.scope()).unwrap());
        assert_eq!(doc["spec"]["maxUnavailable"], 1);
    }
}
