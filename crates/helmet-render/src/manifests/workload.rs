//! The application Deployment

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::pod;
use crate::scope::Scope;

/// `checksums` are added to the pod template annotations
pub fn deployment(
    scope: &Scope<'_>,
    checksums: &BTreeMap<String, String>,
) -> Result<Option<RenderedManifest>> {
    let values = scope.values;
    if values.replica_count < 0 {
        return Err(RenderError::invalid("replicaCount", "must not be negative"));
    }

    let strategy = (values.update_strategy != DeploymentStrategy::default())
        .then(|| values.update_strategy.clone());

    let object = Deployment {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        spec: Some(DeploymentSpec {
            // the HPA owns the replica count when enabled
            replicas: (!values.autoscaling.enabled).then_some(values.replica_count),
            revision_history_limit: Some(values.revision_history_limit),
            selector: LabelSelector {
                match_labels: Some(scope.selector_labels()),
                ..Default::default()
            },
            strategy,
            template: pod::template(scope, checksums)?,
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("deployment.yaml"), &object).map(Some)
}
