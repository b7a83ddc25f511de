//! Rendered manifests, install ordering and multi-document output

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{Metadata, Resource};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::Result;

/// One rendered Kubernetes object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    /// `<chart>/templates/<file>`
    pub source: String,
    pub api_version: String,
    pub kind: String,
    pub name: String,
    /// YAML document without the leading `---`
    pub content: String,
}

impl RenderedManifest {
    /// Serialize a typed object
    pub fn from_resource<K>(source: impl Into<String>, object: &K) -> Result<Self>
    where
        K: Resource + Metadata<Ty = ObjectMeta> + Serialize,
    {
        let manifest = Self {
            source: source.into(),
            api_version: K::API_VERSION.to_string(),
            kind: K::KIND.to_string(),
            name: object.metadata().name.clone().unwrap_or_default(),
            content: serde_yaml::to_string(object)?,
        };
        tracing::debug!(kind = %manifest.kind, name = %manifest.name, "rendered manifest");
        Ok(manifest)
    }

    /// Serialize an untyped object; `apiVersion` and `kind` are read from it
    pub fn from_json(source: impl Into<String>, object: &JsonValue) -> Result<Self> {
        let field = |pointer: &str| {
            object
                .pointer(pointer)
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let manifest = Self {
            source: source.into(),
            api_version: field("/apiVersion"),
            kind: field("/kind"),
            name: field("/metadata/name"),
            content: serde_yaml::to_string(object)?,
        };
        tracing::debug!(kind = %manifest.kind, name = %manifest.name, "rendered manifest");
        Ok(manifest)
    }

    #[cfg(test)]
    pub(crate) fn raw(source: &str, api_version: &str, kind: &str, name: &str, content: &str) -> Self {
        Self {
            source: source.to_string(),
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    pub fn category(&self) -> ResourceCategory {
        ResourceCategory::from_resource(&self.kind, &self.api_version)
    }

    /// `# Source:` header followed by the document
    pub fn to_document(&self) -> String {
        let mut doc = format!("---\n# Source: {}\n{}", self.source, self.content);
        if !doc.ends_with('\n') {
            doc.push('\n');
        }
        doc
    }
}

/// Install order of resource kinds
///
/// Lower values are applied first, so dependencies exist before dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceCategory {
    Crd = 0,
    Namespace = 1,
    /// ResourceQuota, LimitRange
    NamespaceConfig = 2,
    /// ClusterRole, ClusterRoleBinding
    ClusterRbac = 10,
    /// Role, RoleBinding, ServiceAccount
    NamespacedRbac = 11,
    /// ConfigMap, Secret
    Config = 20,
    /// PersistentVolume, PersistentVolumeClaim, StorageClass
    Storage = 21,
    /// NetworkPolicy, Service, Ingress
    Network = 30,
    /// Deployment, StatefulSet, DaemonSet, ReplicaSet, Pod
    Workload = 40,
    /// Job, CronJob
    Batch = 50,
    /// HorizontalPodAutoscaler, PodDisruptionBudget
    Autoscaling = 60,
    /// Objects from non-core API groups (ServiceMonitor, PrometheusRule, ...)
    CustomResource = 70,
    Other = 100,
}

impl ResourceCategory {
    pub fn from_resource(kind: &str, api_version: &str) -> Self {
        match kind {
            "CustomResourceDefinition" => Self::Crd,
            "Namespace" => Self::Namespace,
            "ResourceQuota" | "LimitRange" => Self::NamespaceConfig,
            "ClusterRole" | "ClusterRoleBinding" => Self::ClusterRbac,
            "Role" | "RoleBinding" | "ServiceAccount" => Self::NamespacedRbac,
            "ConfigMap" | "Secret" => Self::Config,
            "PersistentVolume" | "PersistentVolumeClaim" | "StorageClass" => Self::Storage,
            "NetworkPolicy" | "Service" | "Endpoints" | "Ingress" | "IngressClass" => Self::Network,
            "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Pod" => Self::Workload,
            "Job" | "CronJob" => Self::Batch,
            "HorizontalPodAutoscaler" | "VerticalPodAutoscaler" | "PodDisruptionBudget" => {
                Self::Autoscaling
            }
            _ if is_custom_api_version(api_version) => Self::CustomResource,
            _ => Self::Other,
        }
    }
}

/// Whether an apiVersion belongs to an API group outside Kubernetes itself
///
/// `v1` and `apps/v1` are core; `monitoring.coreos.com/v1` is not.
pub fn is_custom_api_version(api_version: &str) -> bool {
    match api_version.split_once('/') {
        Some((group, _)) => group.contains('.') && !group.ends_with(".k8s.io"),
        None => false,
    }
}

/// Stable sort into install order; objects of the same category keep emit order
pub fn sort_for_install(manifests: &mut [RenderedManifest]) {
    manifests.sort_by_key(RenderedManifest::category);
}

/// Join manifests into one multi-document YAML stream
pub fn to_multi_document(manifests: &[RenderedManifest]) -> String {
    manifests
        .iter()
        .map(RenderedManifest::to_document)
        .collect::<Vec<_>>()
        .join("")
}
