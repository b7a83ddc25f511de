//! Init containers that block until dependencies accept connections

use k8s_openapi::api::core::v1::Container;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RenderError, Result};
use crate::image;
use crate::pod;
use crate::scope::Scope;
use crate::values::{WaitForService, WaitForValues};

static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").expect("valid host regex"));
static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/[A-Za-z0-9._~/-]*$").expect("valid path regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid name regex"));

/// One init container per `waitFor.services` entry, empty when disabled
pub fn init_containers(scope: &Scope<'_>) -> Result<Vec<Container>> {
    let settings = &scope.values.wait_for;
    if !settings.enabled {
        return Ok(Vec::new());
    }
    if settings.interval_seconds == 0 {
        return Err(RenderError::invalid(
            "waitFor.intervalSeconds",
            "must be greater than zero",
        ));
    }

    let image = image::with_global_registry(scope, &settings.image);
    let security_context = pod::container_security_context(scope)?;

    settings
        .services
        .iter()
        .enumerate()
        .map(|(index, service)| {
            validate(index, service)?;
            tracing::debug!(service = %service.name, host = %service.host, "adding wait-for init container");
            Ok(Container {
                name: format!("wait-for-{}", service.name),
                image: Some(image.clone()),
                image_pull_policy: Some(settings.image_pull_policy.clone()),
                command: Some(vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    script(settings, service),
                ]),
                security_context: security_context.clone(),
                ..Default::default()
            })
        })
        .collect()
}

fn validate(index: usize, service: &WaitForService) -> Result<()> {
    let key = |field: &str| format!("waitFor.services[{}].{}", index, field);

    if !NAME_RE.is_match(&service.name) || service.name.len() > 54 {
        return Err(RenderError::invalid(
            key("name"),
            format!("`{}` is not a valid container name suffix", service.name),
        ));
    }
    if !HOST_RE.is_match(&service.host) {
        return Err(RenderError::invalid_with_help(
            key("host"),
            format!("`{}` is not a valid host", service.host),
            "hosts may only contain letters, digits, `.` and `-`",
        ));
    }
    if service.port == 0 {
        return Err(RenderError::invalid(key("port"), "port must be between 1 and 65535"));
    }
    if let Some(path) = &service.path
        && !PATH_RE.is_match(path)
    {
        return Err(RenderError::invalid_with_help(
            key("path"),
            format!("`{}` is not a valid HTTP path", path),
            "paths must start with `/` and contain only URL-safe characters",
        ));
    }
    Ok(())
}

/// Shell loop polling one dependency
///
/// Inputs are validated first, so they are interpolated unquoted.
pub fn script(settings: &WaitForValues, service: &WaitForService) -> String {
    let target = format!("{}:{}", service.host, service.port);
    let check = match &service.path {
        Some(path) => format!("wget -q --spider -T 2 http://{}{}", target, path),
        None => format!("nc -z -w 2 {} {}", service.host, service.port),
    };

    format!(
        "elapsed=0\n\
         until {check} >/dev/null 2>&1; do\n\
         \x20 if [ \"$elapsed\" -ge {timeout} ]; then\n\
         \x20   echo \"timed out after {timeout}s waiting for {name} ({target})\"\n\
         \x20   exit 1\n\
         \x20 fi\n\
         \x20 echo \"waiting for {name} ({target})\"\n\
         \x20 sleep {interval}\n\
         \x20 elapsed=$((elapsed + {interval}))\n\
         done\n\
         echo \"{name} is ready\"\n",
        check = check,
        timeout = settings.timeout_seconds,
        interval = settings.interval_seconds,
        name = service.name,
        target = target,
    )
}
