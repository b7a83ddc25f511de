//! Container health probes

use k8s_openapi::api::core::v1::{HTTPGetAction, Probe};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::values::ProbeValues;

/// Resolve one probe
///
/// A non-empty custom probe is used verbatim. Otherwise an enabled probe is an
/// HTTP GET on the configured path and port.
pub fn build(settings: &ProbeValues, custom: &Probe) -> Option<Probe> {
    if *custom != Probe::default() {
        return Some(custom.clone());
    }
    if !settings.enabled {
        return None;
    }

    Some(Probe {
        http_get: Some(HTTPGetAction {
            path: Some(settings.path.clone()),
            port: port(&settings.port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(settings.initial_delay_seconds),
        period_seconds: Some(settings.period_seconds),
        timeout_seconds: Some(settings.timeout_seconds),
        failure_threshold: Some(settings.failure_threshold),
        success_threshold: Some(settings.success_threshold),
        ..Default::default()
    })
}

/// A port given by number or by container port name
pub fn port(value: &str) -> IntOrString {
    match value.parse::<i32>() {
        Ok(number) => IntOrString::Int(number),
        Err(_) => IntOrString::String(value.to_string()),
    }
}
