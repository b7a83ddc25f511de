//! Container resource presets

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::error::{RenderError, Result};
use crate::suggestions;
use crate::values::AppValues;

/// Preset names accepted by `resourcesPreset`
pub const PRESETS: &[&str] = &[
    "none", "nano", "micro", "small", "medium", "large", "xlarge", "2xlarge",
];

/// (cpu request, memory request, cpu limit, memory limit)
fn preset_table(name: &str) -> Option<(&'static str, &'static str, &'static str, &'static str)> {
    Some(match name {
        "nano" => ("100m", "128Mi", "150m", "192Mi"),
        "micro" => ("250m", "256Mi", "375m", "384Mi"),
        "small" => ("500m", "512Mi", "750m", "768Mi"),
        "medium" => ("500m", "1024Mi", "750m", "1536Mi"),
        "large" => ("1", "2048Mi", "1.5", "3072Mi"),
        "xlarge" => ("1", "3072Mi", "3", "6144Mi"),
        "2xlarge" => ("1", "3072Mi", "6", "12288Mi"),
        _ => return None,
    })
}

fn quantities(cpu: &str, memory: &str, storage: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("ephemeral-storage".to_string(), Quantity(storage.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

/// Requirements for a named preset; `none` yields `None`
pub fn preset(name: &str) -> Result<Option<ResourceRequirements>> {
    if name == "none" || name.is_empty() {
        return Ok(None);
    }
    let (cpu_req, mem_req, cpu_lim, mem_lim) = preset_table(name).ok_or_else(|| {
        RenderError::invalid_with_help(
            "resourcesPreset",
            format!("unknown preset `{}`", name),
            suggestions::unknown_help(name, PRESETS),
        )
    })?;

    Ok(Some(ResourceRequirements {
        requests: Some(quantities(cpu_req, mem_req, "50Mi")),
        limits: Some(quantities(cpu_lim, mem_lim, "2Gi")),
        ..Default::default()
    }))
}

/// Explicit `resources` win over `resourcesPreset`
pub fn resolve(values: &AppValues) -> Result<Option<ResourceRequirements>> {
    if values.resources != ResourceRequirements::default() {
        return Ok(Some(values.resources.clone()));
    }

    let resolved = preset(&values.resources_preset)?;
    if resolved.is_some() {
        tracing::warn!(
            preset = %values.resources_preset,
            "resourcesPreset is meant for development; set `resources` explicitly for production"
        );
    }
    Ok(resolved)
}
