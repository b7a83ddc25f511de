//! Typed chart values
//!
//! `AppValues::default()` is the built-in values file. The renderer serializes
//! it, merges the chart and user layers on top, and deserializes the result
//! back, so every key documented here always has a value.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::{
    Affinity, EnvVar, Probe, ResourceRequirements, Toleration, TopologySpreadConstraint, Volume,
    VolumeMount,
};
use k8s_openapi::api::networking::v1::{IngressTLS, NetworkPolicyEgressRule, NetworkPolicyIngressRule};
use k8s_openapi::api::rbac::v1::PolicyRule;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

use crate::error::{RenderError, Result};
use helmet_core::Values;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppValues {
    #[serde(deserialize_with = "lenient::string")]
    pub name_override: String,
    #[serde(deserialize_with = "lenient::string")]
    pub fullname_override: String,
    #[serde(deserialize_with = "lenient::string")]
    pub namespace_override: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub common_labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient::string_map")]
    pub common_annotations: BTreeMap<String, String>,
    pub global: GlobalValues,
    pub image: ImageValues,
    pub replica_count: i32,
    pub revision_history_limit: i32,
    pub update_strategy: DeploymentStrategy,
    #[serde(deserialize_with = "lenient::string_list")]
    pub command: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub args: Vec<String>,
    pub env: BTreeMap<String, JsonValue>,
    pub extra_env_vars: Vec<EnvVar>,
    pub container_ports: BTreeMap<String, i32>,
    pub liveness_probe: ProbeValues,
    pub readiness_probe: ProbeValues,
    pub startup_probe: ProbeValues,
    pub custom_liveness_probe: Probe,
    pub custom_readiness_probe: Probe,
    pub custom_startup_probe: Probe,
    #[serde(deserialize_with = "lenient::string")]
    pub resources_preset: String,
    pub resources: ResourceRequirements,
    pub pod_security_context: SecurityContextValues,
    pub container_security_context: SecurityContextValues,
    #[serde(deserialize_with = "lenient::string_map")]
    pub pod_labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient::string_map")]
    pub pod_annotations: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient::string_map")]
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub affinity: Affinity,
    #[serde(deserialize_with = "lenient::string")]
    pub pod_affinity_preset: String,
    #[serde(deserialize_with = "lenient::string")]
    pub pod_anti_affinity_preset: String,
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,
    #[serde(deserialize_with = "lenient::string")]
    pub priority_class_name: String,
    pub extra_volumes: Vec<Volume>,
    pub extra_volume_mounts: Vec<VolumeMount>,
    pub wait_for: WaitForValues,
    pub config: ConfigValues,
    pub secret: SecretValues,
    pub service: ServiceValues,
    pub ingress: IngressValues,
    pub network_policy: NetworkPolicyValues,
    pub rbac: RbacValues,
    pub service_account: ServiceAccountValues,
    pub pdb: PdbValues,
    pub autoscaling: AutoscalingValues,
    pub metrics: MetricsValues,
    pub persistence: PersistenceValues,
    pub extra_deploy: Vec<JsonValue>,
}

impl Default for AppValues {
    fn default() -> Self {
        Self {
            name_override: String::new(),
            fullname_override: String::new(),
            namespace_override: String::new(),
            common_labels: BTreeMap::new(),
            common_annotations: BTreeMap::new(),
            global: GlobalValues::default(),
            image: ImageValues::default(),
            replica_count: 1,
            revision_history_limit: 10,
            update_strategy: DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                ..Default::default()
            },
            command: Vec::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            extra_env_vars: Vec::new(),
            container_ports: BTreeMap::from([("http".to_string(), 8080)]),
            liveness_probe: ProbeValues::liveness(),
            readiness_probe: ProbeValues::readiness(),
            startup_probe: ProbeValues::startup(),
            custom_liveness_probe: Probe::default(),
            custom_readiness_probe: Probe::default(),
            custom_startup_probe: Probe::default(),
            resources_preset: "none".to_string(),
            resources: ResourceRequirements::default(),
            pod_security_context: SecurityContextValues::pod(),
            container_security_context: SecurityContextValues::container(),
            pod_labels: BTreeMap::new(),
            pod_annotations: BTreeMap::new(),
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
            affinity: Affinity::default(),
            pod_affinity_preset: String::new(),
            pod_anti_affinity_preset: "soft".to_string(),
            topology_spread_constraints: Vec::new(),
            priority_class_name: String::new(),
            extra_volumes: Vec::new(),
            extra_volume_mounts: Vec::new(),
            wait_for: WaitForValues::default(),
            config: ConfigValues::default(),
            secret: SecretValues::default(),
            service: ServiceValues::default(),
            ingress: IngressValues::default(),
            network_policy: NetworkPolicyValues::default(),
            rbac: RbacValues::default(),
            service_account: ServiceAccountValues::default(),
            pdb: PdbValues::default(),
            autoscaling: AutoscalingValues::default(),
            metrics: MetricsValues::default(),
            persistence: PersistenceValues::default(),
            extra_deploy: Vec::new(),
        }
    }
}

impl AppValues {
    /// The built-in defaults as a values tree
    pub fn defaults() -> Result<Values> {
        Ok(Values::from_serialize(&AppValues::default())?)
    }

    /// Interpret merged values
    pub fn from_values(values: &Values) -> Result<Self> {
        serde_json::from_value(values.inner().clone()).map_err(RenderError::ValuesShape)
    }

    /// Whether container resources come from `resourcesPreset`
    pub fn uses_resources_preset(&self) -> bool {
        self.resources == ResourceRequirements::default()
            && !matches!(self.resources_preset.as_str(), "" | "none")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalValues {
    /// Overrides `image.registry` (and the wait-for image registry)
    #[serde(deserialize_with = "lenient::string")]
    pub image_registry: String,
    pub image_pull_secrets: Vec<PullSecret>,
}

/// Pull secret given either as a bare name or as `{name: ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PullSecret {
    Name(String),
    Reference { name: String },
}

impl PullSecret {
    pub fn name(&self) -> &str {
        match self {
            PullSecret::Name(name) | PullSecret::Reference { name } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageValues {
    #[serde(deserialize_with = "lenient::string")]
    pub registry: String,
    #[serde(deserialize_with = "lenient::string")]
    pub repository: String,
    /// Falls back to the chart appVersion
    #[serde(deserialize_with = "lenient::string")]
    pub tag: String,
    #[serde(deserialize_with = "lenient::string")]
    pub digest: String,
    #[serde(deserialize_with = "lenient::string")]
    pub pull_policy: String,
    pub pull_secrets: Vec<PullSecret>,
}

impl Default for ImageValues {
    fn default() -> Self {
        Self {
            registry: "docker.io".to_string(),
            repository: String::new(),
            tag: String::new(),
            digest: String::new(),
            pull_policy: "IfNotPresent".to_string(),
            pull_secrets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeValues {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub path: String,
    /// Container port name or number
    #[serde(deserialize_with = "lenient::string")]
    pub port: String,
    pub initial_delay_seconds: i32,
    pub period_seconds: i32,
    pub timeout_seconds: i32,
    pub failure_threshold: i32,
    pub success_threshold: i32,
}

impl Default for ProbeValues {
    fn default() -> Self {
        Self::liveness()
    }
}

impl ProbeValues {
    pub fn liveness() -> Self {
        Self {
            enabled: true,
            path: "/".to_string(),
            port: "http".to_string(),
            initial_delay_seconds: 30,
            period_seconds: 10,
            timeout_seconds: 5,
            failure_threshold: 6,
            success_threshold: 1,
        }
    }

    pub fn readiness() -> Self {
        Self {
            initial_delay_seconds: 5,
            ..Self::liveness()
        }
    }

    pub fn startup() -> Self {
        Self {
            enabled: false,
            initial_delay_seconds: 10,
            failure_threshold: 30,
            ..Self::liveness()
        }
    }
}

/// A Kubernetes security context plus an `enabled` switch
///
/// The remaining keys are kept as-is and checked against the Kubernetes schema
/// when the pod is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContextValues {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub spec: Map<String, JsonValue>,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for SecurityContextValues {
    fn default() -> Self {
        Self {
            enabled: true,
            spec: Map::new(),
        }
    }
}

impl SecurityContextValues {
    fn from_json(enabled: bool, spec: JsonValue) -> Self {
        let spec = match spec {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        Self { enabled, spec }
    }

    pub fn pod() -> Self {
        Self::from_json(
            true,
            json!({
                "fsGroup": 1001,
                "fsGroupChangePolicy": "Always",
            }),
        )
    }

    pub fn container() -> Self {
        Self::from_json(
            true,
            json!({
                "runAsUser": 1001,
                "runAsGroup": 1001,
                "runAsNonRoot": true,
                "allowPrivilegeEscalation": false,
                "readOnlyRootFilesystem": true,
                "privileged": false,
                "capabilities": {"drop": ["ALL"]},
                "seccompProfile": {"type": "RuntimeDefault"},
            }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitForValues {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub image: String,
    #[serde(deserialize_with = "lenient::string")]
    pub image_pull_policy: String,
    pub timeout_seconds: u32,
    pub interval_seconds: u32,
    pub services: Vec<WaitForService>,
}

impl Default for WaitForValues {
    fn default() -> Self {
        Self {
            enabled: false,
            image: "busybox:1.36".to_string(),
            image_pull_policy: "IfNotPresent".to_string(),
            timeout_seconds: 300,
            interval_seconds: 2,
            services: Vec::new(),
        }
    }
}

/// A dependency that must accept connections before the app starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForService {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub host: String,
    pub port: u16,
    /// HTTP path; when set the check is an HTTP GET instead of a TCP connect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "lenient::optional_string")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigValues {
    /// File name -> contents; non-string scalars are stringified
    pub data: BTreeMap<String, JsonValue>,
    #[serde(deserialize_with = "lenient::string")]
    pub mount_path: String,
    /// Mount this ConfigMap instead of rendering one
    #[serde(deserialize_with = "lenient::string")]
    pub existing_config_map: String,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            mount_path: "/etc/config".to_string(),
            existing_config_map: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretValues {
    /// Variable name -> plain text value, exposed to the container as env vars
    pub data: BTreeMap<String, JsonValue>,
    #[serde(deserialize_with = "lenient::string")]
    pub existing_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceValues {
    #[serde(rename = "type")]
    #[serde(deserialize_with = "lenient::string")]
    pub type_: String,
    pub ports: BTreeMap<String, i32>,
    pub node_ports: BTreeMap<String, i32>,
    #[serde(rename = "clusterIP")]
    #[serde(deserialize_with = "lenient::string")]
    pub cluster_ip: String,
    #[serde(rename = "loadBalancerIP")]
    #[serde(deserialize_with = "lenient::string")]
    pub load_balancer_ip: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub load_balancer_source_ranges: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub external_traffic_policy: String,
    #[serde(deserialize_with = "lenient::string")]
    pub session_affinity: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub annotations: BTreeMap<String, String>,
}

impl Default for ServiceValues {
    fn default() -> Self {
        Self {
            type_: "ClusterIP".to_string(),
            ports: BTreeMap::from([("http".to_string(), 80)]),
            node_ports: BTreeMap::new(),
            cluster_ip: String::new(),
            load_balancer_ip: String::new(),
            load_balancer_source_ranges: Vec::new(),
            external_traffic_policy: String::new(),
            session_affinity: String::new(),
            annotations: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressValues {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub ingress_class_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub hostname: String,
    #[serde(deserialize_with = "lenient::string")]
    pub path: String,
    #[serde(deserialize_with = "lenient::string")]
    pub path_type: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub annotations: BTreeMap<String, String>,
    /// Terminate TLS with the secret `<hostname>-tls`
    pub tls: bool,
    pub extra_hosts: Vec<IngressHost>,
    pub extra_tls: Vec<IngressTLS>,
    /// Service port name the ingress routes to
    #[serde(deserialize_with = "lenient::string")]
    pub service_port: String,
}

impl Default for IngressValues {
    fn default() -> Self {
        Self {
            enabled: false,
            ingress_class_name: String::new(),
            hostname: String::new(),
            path: "/".to_string(),
            path_type: "ImplementationSpecific".to_string(),
            annotations: BTreeMap::new(),
            tls: false,
            extra_hosts: Vec::new(),
            extra_tls: Vec::new(),
            service_port: "http".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressHost {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "lenient::optional_string")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkPolicyValues {
    pub enabled: bool,
    pub allow_external: bool,
    pub allow_external_egress: bool,
    pub extra_ingress: Vec<NetworkPolicyIngressRule>,
    pub extra_egress: Vec<NetworkPolicyEgressRule>,
}

impl Default for NetworkPolicyValues {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_external: true,
            allow_external_egress: true,
            extra_ingress: Vec::new(),
            extra_egress: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RbacValues {
    pub create: bool,
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAccountValues {
    pub create: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub annotations: BTreeMap<String, String>,
    pub automount_service_account_token: bool,
}

impl Default for ServiceAccountValues {
    fn default() -> Self {
        Self {
            create: true,
            name: String::new(),
            annotations: BTreeMap::new(),
            automount_service_account_token: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdbValues {
    pub create: bool,
    pub min_available: Option<IntOrString>,
    pub max_unavailable: Option<IntOrString>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoscalingValues {
    pub enabled: bool,
    pub min_replicas: i32,
    pub max_replicas: i32,
    /// Average CPU utilization in percent
    #[serde(rename = "targetCPU")]
    pub target_cpu: Option<i32>,
    /// Average memory utilization in percent
    pub target_memory: Option<i32>,
}

impl Default for AutoscalingValues {
    fn default() -> Self {
        Self {
            enabled: false,
            min_replicas: 1,
            max_replicas: 3,
            target_cpu: Some(80),
            target_memory: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsValues {
    pub service_monitor: ServiceMonitorValues,
    pub prometheus_rule: PrometheusRuleValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceMonitorValues {
    pub enabled: bool,
    /// Defaults to the release namespace
    #[serde(deserialize_with = "lenient::string")]
    pub namespace: String,
    #[serde(deserialize_with = "lenient::string")]
    pub interval: String,
    #[serde(deserialize_with = "lenient::string")]
    pub scrape_timeout: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub labels: BTreeMap<String, String>,
    pub honor_labels: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub path: String,
    #[serde(deserialize_with = "lenient::string")]
    pub port: String,
    pub relabelings: Vec<JsonValue>,
    pub metric_relabelings: Vec<JsonValue>,
}

impl Default for ServiceMonitorValues {
    fn default() -> Self {
        Self {
            enabled: false,
            namespace: String::new(),
            interval: String::new(),
            scrape_timeout: String::new(),
            labels: BTreeMap::new(),
            honor_labels: false,
            path: "/metrics".to_string(),
            port: "http".to_string(),
            relabelings: Vec::new(),
            metric_relabelings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrometheusRuleValues {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub namespace: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub labels: BTreeMap<String, String>,
    pub rules: Vec<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceValues {
    pub enabled: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub existing_claim: String,
    /// `-` renders an explicit empty storageClassName (disables dynamic provisioning)
    #[serde(deserialize_with = "lenient::string")]
    pub storage_class: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub access_modes: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub size: String,
    #[serde(deserialize_with = "lenient::string")]
    pub mount_path: String,
    #[serde(deserialize_with = "lenient::string_map")]
    pub annotations: BTreeMap<String, String>,
}

impl Default for PersistenceValues {
    fn default() -> Self {
        Self {
            enabled: false,
            existing_claim: String::new(),
            storage_class: String::new(),
            access_modes: vec!["ReadWriteOnce".to_string()],
            size: "8Gi".to_string(),
            mount_path: "/data".to_string(),
            annotations: BTreeMap::new(),
        }
    }
}

/// Deserializers that take any scalar where a string is expected
///
/// YAML and `--set` turn `1.27`, `2` or `true` into numbers and booleans.
/// Fields such as image tags, label values and claim names keep their text
/// form instead of failing. `null` reads as empty.
mod lenient {
    use std::collections::BTreeMap;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value as JsonValue;

    fn scalar<E: Error>(value: JsonValue) -> Result<String, E> {
        match value {
            JsonValue::String(s) => Ok(s),
            JsonValue::Null => Ok(String::new()),
            JsonValue::Bool(_) | JsonValue::Number(_) => Ok(value.to_string()),
            JsonValue::Array(_) => Err(E::custom("invalid type: sequence, expected a string")),
            JsonValue::Object(_) => Err(E::custom("invalid type: map, expected a string")),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        scalar(JsonValue::deserialize(deserializer)?)
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::Null => Ok(None),
            value => scalar(value).map(Some),
        }
    }

    pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::Null => Ok(Vec::new()),
            JsonValue::Array(items) => items.into_iter().map(scalar).collect(),
            _ => Err(D::Error::custom("invalid type: expected a sequence of strings")),
        }
    }

    pub fn string_map<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::Null => Ok(BTreeMap::new()),
            JsonValue::Object(map) => map
                .into_iter()
                .map(|(key, value)| Ok((key, scalar(value)?)))
                .collect(),
            _ => Err(D::Error::custom("invalid type: expected a map of strings")),
        }
    }
}

/// Render a values map entry as ConfigMap/Secret text
pub(crate) fn stringify(value: &JsonValue) -> Result<String> {
    Ok(match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => serde_yaml::to_string(value)?,
    })
}
