//! Standard Kubernetes labels
//!
//! <https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/>

use std::collections::BTreeMap;

use helmet_core::names;

use crate::scope::Scope;

pub const CHART: &str = "helm.sh/chart";
pub const NAME: &str = "app.kubernetes.io/name";
pub const INSTANCE: &str = "app.kubernetes.io/instance";
pub const VERSION: &str = "app.kubernetes.io/version";
pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const COMPONENT: &str = "app.kubernetes.io/component";

/// Labels applied to every object
///
/// `commonLabels` go in first so the standard keys cannot be overridden.
pub fn standard_labels(scope: &Scope<'_>) -> BTreeMap<String, String> {
    let mut labels = scope.values.common_labels.clone();
    labels.insert(CHART.to_string(), names::chart_label(&scope.ctx.chart));
    labels.extend(selector_labels(scope));
    if let Some(version) = app_version_label(scope) {
        labels.insert(VERSION.to_string(), version);
    }
    labels.insert(MANAGED_BY.to_string(), scope.ctx.release.service.clone());
    labels
}

/// Labels that select this release's pods
///
/// These end up in immutable selectors, so nothing version-dependent goes here.
pub fn selector_labels(scope: &Scope<'_>) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME.to_string(), scope.name.clone()),
        (INSTANCE.to_string(), names::trunc63(&scope.ctx.release.name)),
    ])
}

/// Prefer the image tag, then the chart appVersion
fn app_version_label(scope: &Scope<'_>) -> Option<String> {
    let tag = scope.values.image.tag.as_str();
    let version = if tag.is_empty() {
        scope.ctx.chart.app_version.as_deref()?
    } else {
        tag
    };
    let label = names::trunc63(&version.replace('+', "_"));
    (!label.is_empty()).then_some(label)
}

/// Merge annotation maps, `overrides` win
pub fn merge_annotations(
    base: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
