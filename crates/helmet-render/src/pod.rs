//! Pod template assembly for the main workload

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, ConfigMapVolumeSource, Container, ContainerPort, EnvFromSource, EnvVar,
    PersistentVolumeClaimVolumeSource, PodAffinity, PodAffinityTerm, PodAntiAffinity,
    PodSecurityContext, PodSpec, PodTemplateSpec, SecretEnvSource, SecurityContext, Volume,
    VolumeMount, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::de::DeserializeOwned;

use crate::error::{RenderError, Result};
use crate::scope::Scope;
use crate::suggestions;
use crate::values::{SecurityContextValues, stringify};
use crate::{image, probes, resources, wait_for};

/// Accepted values for `podAffinityPreset` / `podAntiAffinityPreset`
pub const AFFINITY_PRESETS: &[&str] = &["", "soft", "hard"];

const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";
const CONFIG_VOLUME: &str = "config";
const DATA_VOLUME: &str = "data";

/// Name of the ConfigMap mounted into the pod, if any
pub fn config_map_name(scope: &Scope<'_>) -> Option<String> {
    let config = &scope.values.config;
    if !config.existing_config_map.is_empty() {
        Some(config.existing_config_map.clone())
    } else if !config.data.is_empty() {
        Some(scope.fullname.clone())
    } else {
        None
    }
}

/// Name of the Secret injected through `envFrom`, if any
pub fn secret_name(scope: &Scope<'_>) -> Option<String> {
    let secret = &scope.values.secret;
    if !secret.existing_secret.is_empty() {
        Some(secret.existing_secret.clone())
    } else if !secret.data.is_empty() {
        Some(scope.fullname.clone())
    } else {
        None
    }
}

/// Name of the PVC mounted at `persistence.mountPath`, if any
pub fn claim_name(scope: &Scope<'_>) -> Option<String> {
    let persistence = &scope.values.persistence;
    if !persistence.enabled {
        None
    } else if !persistence.existing_claim.is_empty() {
        Some(persistence.existing_claim.clone())
    } else {
        Some(scope.fullname.clone())
    }
}

fn security_context<T: DeserializeOwned>(
    key: &str,
    settings: &SecurityContextValues,
) -> Result<Option<T>> {
    if !settings.enabled {
        return Ok(None);
    }
    let spec = serde_json::Value::Object(settings.spec.clone());
    serde_json::from_value(spec)
        .map(Some)
        .map_err(|e| RenderError::invalid(key, e.to_string()))
}

pub fn pod_security_context(scope: &Scope<'_>) -> Result<Option<PodSecurityContext>> {
    security_context("podSecurityContext", &scope.values.pod_security_context)
}

pub fn container_security_context(scope: &Scope<'_>) -> Result<Option<SecurityContext>> {
    security_context(
        "containerSecurityContext",
        &scope.values.container_security_context,
    )
}

fn affinity_term(scope: &Scope<'_>) -> PodAffinityTerm {
    PodAffinityTerm {
        label_selector: Some(LabelSelector {
            match_labels: Some(scope.selector_labels()),
            ..Default::default()
        }),
        namespaces: Some(vec![scope.namespace.clone()]),
        topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
        ..Default::default()
    }
}

/// (preferred, required) terms for one preset
fn preset_terms(
    scope: &Scope<'_>,
    key: &str,
    preset: &str,
) -> Result<(Option<Vec<WeightedPodAffinityTerm>>, Option<Vec<PodAffinityTerm>>)> {
    match preset {
        "" => Ok((None, None)),
        "soft" => Ok((
            Some(vec![WeightedPodAffinityTerm {
                weight: 1,
                pod_affinity_term: affinity_term(scope),
            }]),
            None,
        )),
        "hard" => Ok((None, Some(vec![affinity_term(scope)]))),
        other => Err(RenderError::invalid_with_help(
            key,
            format!("unknown affinity preset `{}`", other),
            suggestions::unknown_help(other, &AFFINITY_PRESETS[1..]),
        )),
    }
}

/// Explicit `affinity`, else the affinity presets
pub fn affinity(scope: &Scope<'_>) -> Result<Option<Affinity>> {
    let values = scope.values;
    if values.affinity != Affinity::default() {
        return Ok(Some(values.affinity.clone()));
    }

    let (preferred, required) =
        preset_terms(scope, "podAffinityPreset", &values.pod_affinity_preset)?;
    let pod_affinity = (preferred.is_some() || required.is_some()).then(|| PodAffinity {
        preferred_during_scheduling_ignored_during_execution: preferred,
        required_during_scheduling_ignored_during_execution: required,
    });

    let (preferred, required) =
        preset_terms(scope, "podAntiAffinityPreset", &values.pod_anti_affinity_preset)?;
    let pod_anti_affinity = (preferred.is_some() || required.is_some()).then(|| PodAntiAffinity {
        preferred_during_scheduling_ignored_during_execution: preferred,
        required_during_scheduling_ignored_during_execution: required,
    });

    if pod_affinity.is_none() && pod_anti_affinity.is_none() {
        return Ok(None);
    }
    Ok(Some(Affinity {
        pod_affinity,
        pod_anti_affinity,
        ..Default::default()
    }))
}

fn env(scope: &Scope<'_>) -> Result<Vec<EnvVar>> {
    let mut vars = scope
        .values
        .env
        .iter()
        .map(|(name, value)| {
            Ok(EnvVar {
                name: name.clone(),
                value: Some(stringify(value)?),
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>>>()?;
    vars.extend(scope.values.extra_env_vars.iter().cloned());
    Ok(vars)
}

fn volume_mounts(scope: &Scope<'_>) -> Vec<VolumeMount> {
    let values = scope.values;
    let mut mounts = Vec::new();
    if config_map_name(scope).is_some() {
        mounts.push(VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: values.config.mount_path.clone(),
            read_only: Some(true),
            ..Default::default()
        });
    }
    if claim_name(scope).is_some() {
        mounts.push(VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: values.persistence.mount_path.clone(),
            ..Default::default()
        });
    }
    mounts.extend(values.extra_volume_mounts.iter().cloned());
    mounts
}

fn volumes(scope: &Scope<'_>) -> Vec<Volume> {
    let mut volumes = Vec::new();
    if let Some(name) = config_map_name(scope) {
        volumes.push(Volume {
            name: CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name,
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    if let Some(claim_name) = claim_name(scope) {
        volumes.push(Volume {
            name: DATA_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name,
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    volumes.extend(scope.values.extra_volumes.iter().cloned());
    volumes
}

/// The application container
pub fn main_container(scope: &Scope<'_>) -> Result<Container> {
    let values = scope.values;

    let ports: Vec<ContainerPort> = values
        .container_ports
        .iter()
        .map(|(name, port)| ContainerPort {
            name: Some(name.clone()),
            container_port: *port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        })
        .collect();

    let env_from = secret_name(scope).map(|name| {
        vec![EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name,
                ..Default::default()
            }),
            ..Default::default()
        }]
    });

    let env = env(scope)?;
    let mounts = volume_mounts(scope);

    Ok(Container {
        name: scope.name.clone(),
        image: Some(image::image_ref(scope)),
        image_pull_policy: Some(values.image.pull_policy.clone()),
        command: (!values.command.is_empty()).then(|| values.command.clone()),
        args: (!values.args.is_empty()).then(|| values.args.clone()),
        env: (!env.is_empty()).then_some(env),
        env_from,
        ports: (!ports.is_empty()).then_some(ports),
        liveness_probe: probes::build(&values.liveness_probe, &values.custom_liveness_probe),
        readiness_probe: probes::build(&values.readiness_probe, &values.custom_readiness_probe),
        startup_probe: probes::build(&values.startup_probe, &values.custom_startup_probe),
        resources: resources::resolve(values)?,
        security_context: container_security_context(scope)?,
        volume_mounts: (!mounts.is_empty()).then_some(mounts),
        ..Default::default()
    })
}

/// Pod template with the given extra annotations (config checksums)
pub fn template(
    scope: &Scope<'_>,
    annotations: &BTreeMap<String, String>,
) -> Result<PodTemplateSpec> {
    let values = scope.values;

    let mut labels = values.pod_labels.clone();
    labels.extend(scope.labels());

    let mut pod_annotations = values.pod_annotations.clone();
    pod_annotations.extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));

    let init_containers = wait_for::init_containers(scope)?;
    let pull_secrets = image::pull_secrets(scope)?;
    let volumes = volumes(scope);

    let spec = PodSpec {
        service_account_name: Some(scope.service_account_name()),
        automount_service_account_token: Some(values.service_account.automount_service_account_token),
        image_pull_secrets: (!pull_secrets.is_empty()).then_some(pull_secrets),
        security_context: pod_security_context(scope)?,
        affinity: affinity(scope)?,
        node_selector: (!values.node_selector.is_empty()).then(|| values.node_selector.clone()),
        tolerations: (!values.tolerations.is_empty()).then(|| values.tolerations.clone()),
        topology_spread_constraints: (!values.topology_spread_constraints.is_empty())
            .then(|| values.topology_spread_constraints.clone()),
        priority_class_name: (!values.priority_class_name.is_empty())
            .then(|| values.priority_class_name.clone()),
        init_containers: (!init_containers.is_empty()).then_some(init_containers),
        containers: vec![main_container(scope)?],
        volumes: (!volumes.is_empty()).then_some(volumes),
        ..Default::default()
    };

    Ok(PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            annotations: (!pod_annotations.is_empty()).then_some(pod_annotations),
            ..Default::default()
        }),
        spec: Some(spec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;

    #[test]
    fn test_main_container_defaults() {
        let fx = Fixture::new("image: {repository: acme/web}");
        let container = main_container(&fx.scope()).unwrap();

        assert_eq!(container.name, "web");
        assert_eq!(container.image.as_deref(), Some("docker.io/acme/web:2.1.0"));
        let ports = container.ports.unwrap();
        assert_eq!(ports[0].name.as_deref(), Some("http"));
        assert_eq!(ports[0].container_port, 8080);
        assert!(container.liveness_probe.is_some());
        assert!(container.startup_probe.is_none());
        assert!(container.resources.is_none());
        assert!(container.env_from.is_none());
        assert!(container.volume_mounts.is_none());

        let security = container.security_context.unwrap();
        assert_eq!(security.run_as_non_root, Some(true));
        assert_eq!(security.read_only_root_filesystem, Some(true));
    }

    #[test]
    fn test_env_rendering() {
        let fx = Fixture::new(r#"
env: {LOG_LEVEL: debug, WORKERS: 4}
extraEnvVars: [{name: EXTRA, value: "1"}]
"#);
        let container = main_container(&fx.scope()).unwrap();
        let env = container.env.unwrap();
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["LOG_LEVEL", "WORKERS", "EXTRA"]);
        assert_eq!(env[1].value.as_deref(), Some("4"));
    }

    #[test]
    fn test_config_secret_and_data_mounts() {
        let fx = Fixture::new(r#"
config: {data: {app.conf: "x=1"}}
secret: {existingSecret: creds}
persistence: {enabled: true}
"#);
        let scope = fx.scope();
        let container = main_container(&scope).unwrap();

        let mounts = container.volume_mounts.unwrap();
        assert_eq!(mounts[0].mount_path, "/etc/config");
        assert_eq!(mounts[0].read_only, Some(true));
        assert_eq!(mounts[1].mount_path, "/data");

        let env_from = container.env_from.unwrap();
        assert_eq!(env_from[0].secret_ref.as_ref().unwrap().name, "creds");

        let volumes = volumes(&scope);
        assert_eq!(volumes[0].config_map.as_ref().unwrap().name, "prod-web");
        assert_eq!(
            volumes[1].persistent_volume_claim.as_ref().unwrap().claim_name,
            "prod-web"
        );
    }

    #[test]
    fn test_security_context_disabled() {
        let fx = Fixture::new("podSecurityContext: {enabled: false}");
        assert!(pod_security_context(&fx.scope()).unwrap().is_none());

        let fx = Fixture::new("");
        let pod = pod_security_context(&fx.scope()).unwrap().unwrap();
        assert_eq!(pod.fs_group, Some(1001));
    }

    #[test]
    fn test_invalid_security_context() {
        let fx = Fixture::new("containerSecurityContext: {runAsUser: root}");
        let err = container_security_context(&fx.scope()).unwrap_err();
        assert!(err.to_string().contains("containerSecurityContext"));
    }

    #[test]
    fn test_default_soft_anti_affinity() {
        let fx = Fixture::new("");
        let affinity = affinity(&fx.scope()).unwrap().unwrap();
        assert!(affinity.pod_affinity.is_none());

        let anti = affinity.pod_anti_affinity.unwrap();
        let preferred = anti
            .preferred_during_scheduling_ignored_during_execution
            .unwrap();
        assert_eq!(preferred[0].weight, 1);
        assert_eq!(preferred[0].pod_affinity_term.topology_key, HOSTNAME_TOPOLOGY_KEY);
        assert!(anti.required_during_scheduling_ignored_during_execution.is_none());
    }

    #[test]
    fn test_hard_affinity_and_explicit_override() {
        let fx = Fixture::new("podAffinityPreset: hard\npodAntiAffinityPreset: ''");
        let affinity = affinity(&fx.scope()).unwrap().unwrap();
        let required = affinity
            .pod_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap();
        assert_eq!(required.len(), 1);

        let fx = Fixture::new(r#"
affinity:
  nodeAffinity:
    requiredDuringSchedulingIgnoredDuringExecution:
      nodeSelectorTerms: [{matchExpressions: [{key: zone, operator: In, values: [a]}]}]
"#);
        let affinity = super::affinity(&fx.scope()).unwrap().unwrap();
        assert!(affinity.node_affinity.is_some());
        assert!(affinity.pod_anti_affinity.is_none());
    }

    #[test]
    fn test_unknown_affinity_preset() {
        let fx = Fixture::new("podAntiAffinityPreset: hrad");
        let err = affinity(&fx.scope()).unwrap_err();
        match err {
            RenderError::InvalidValue { key, help, .. } => {
                assert_eq!(key, "podAntiAffinityPreset");
                assert!(help.unwrap().contains("`hard`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_template_annotations_and_labels() {
        let fx = Fixture::new(r#"
podLabels: {tier: web}
podAnnotations: {team: core}
image: {pullSecrets: [regcred]}
"#);
        let extra = BTreeMap::from([("checksum/config".to_string(), "abc".to_string())]);
        let template = template(&fx.scope(), &extra).unwrap();

        let metadata = template.metadata.unwrap();
        let annotations = metadata.annotations.unwrap();
        assert_eq!(annotations["team"], "core");
        assert_eq!(annotations["checksum/config"], "abc");
        let labels = metadata.labels.unwrap();
        assert_eq!(labels["tier"], "web");
        assert_eq!(labels["app.kubernetes.io/instance"], "prod");

        let spec = template.spec.unwrap();
        assert_eq!(spec.service_account_name.as_deref(), Some("prod-web"));
        assert_eq!(spec.automount_service_account_token, Some(false));
        assert_eq!(spec.image_pull_secrets.unwrap().len(), 1);
    }
}
