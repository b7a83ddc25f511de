//! Container image references and pull secrets

use k8s_openapi::api::core::v1::LocalObjectReference;

use crate::error::{RenderError, Result};
use crate::scope::Scope;
use crate::values::PullSecret;

/// Full image reference for the main container
///
/// `<registry>/<repository>` followed by `@<digest>` when a digest is set,
/// otherwise `:<tag>` with the tag defaulting to the chart appVersion and
/// finally `latest`. `global.imageRegistry` replaces `image.registry`.
pub fn image_ref(scope: &Scope<'_>) -> String {
    let image = &scope.values.image;
    let registry = if scope.values.global.image_registry.is_empty() {
        image.registry.as_str()
    } else {
        scope.values.global.image_registry.as_str()
    };

    let repository = if registry.is_empty() {
        image.repository.clone()
    } else {
        format!("{}/{}", registry.trim_end_matches('/'), image.repository)
    };

    if !image.digest.is_empty() {
        return format!("{}@{}", repository, image.digest);
    }

    let tag = if !image.tag.is_empty() {
        image.tag.as_str()
    } else {
        scope.ctx.chart.app_version.as_deref().unwrap_or("latest")
    };
    format!("{}:{}", repository, tag)
}

/// Apply `global.imageRegistry` to an auxiliary image such as the wait-for one
///
/// Images that already name a registry (first path segment contains a dot, a
/// colon or is `localhost`) are left alone.
pub fn with_global_registry(scope: &Scope<'_>, image: &str) -> String {
    let registry = scope.values.global.image_registry.as_str();
    if registry.is_empty() {
        return image.to_string();
    }

    let has_registry = image.split_once('/').is_some_and(|(first, _)| {
        first.contains('.') || first.contains(':') || first == "localhost"
    });
    if has_registry {
        image.to_string()
    } else {
        format!("{}/{}", registry.trim_end_matches('/'), image)
    }
}

/// Global pull secrets followed by the image ones, without duplicates
pub fn pull_secrets(scope: &Scope<'_>) -> Result<Vec<LocalObjectReference>> {
    let mut seen: Vec<&str> = Vec::new();
    let all = scope
        .values
        .global
        .image_pull_secrets
        .iter()
        .chain(scope.values.image.pull_secrets.iter());

    for secret in all.map(PullSecret::name) {
        if secret.is_empty() {
            return Err(RenderError::invalid(
                "image.pullSecrets",
                "pull secret names must not be empty",
            ));
        }
        if !seen.contains(&secret) {
            seen.push(secret);
        }
    }

    Ok(seen
        .into_iter()
        .map(|name| LocalObjectReference {
            name: name.to_string(),
        })
        .collect())
}
