//! Chart renderer
//!
//! Turns a [`RenderContext`] into an ordered list of manifests plus notes.

use helmet_core::{RenderContext, Values};

use crate::checksum;
use crate::error::{RenderError, Result};
use crate::manifest::{self, RenderedManifest};
use crate::manifests;
use crate::notes;
use crate::scope::Scope;
use crate::values::AppValues;

/// Keys every chart must set
pub const ALWAYS_REQUIRED: &[&str] = &["image.repository"];

/// Result of rendering a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Manifests in install order
    pub manifests: Vec<RenderedManifest>,

    /// Access instructions for the rendered release
    pub notes: String,
}

impl RenderResult {
    /// All manifests as one multi-document YAML stream
    pub fn to_multi_document(&self) -> String {
        manifest::to_multi_document(&self.manifests)
    }
}

/// Renderer builder
#[derive(Debug, Default)]
pub struct RendererBuilder {
    required: Vec<String>,
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the render when `key` (a dotted path) is absent or empty
    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    pub fn build(self) -> Renderer {
        Renderer {
            required: self.required,
        }
    }
}

/// The chart renderer
#[derive(Debug, Default)]
pub struct Renderer {
    required: Vec<String>,
}

impl Renderer {
    /// Renderer that only checks the always-required keys
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    /// Built-in defaults with the context values layered on top
    pub fn merged_values(&self, ctx: &RenderContext) -> Result<Values> {
        let mut merged = AppValues::defaults()?;
        merged.merge(&ctx.values);
        Ok(merged)
    }

    /// Required keys for these values, in check order
    pub fn required_keys(&self, values: &Values) -> Vec<String> {
        let mut keys: Vec<String> = ALWAYS_REQUIRED.iter().map(|k| k.to_string()).collect();
        keys.extend(self.required.iter().cloned());

        // Any non-empty claim name counts, including "0" and "false"
        let existing_claim = values
            .get("persistence.existingClaim")
            .is_some_and(|claim| match claim {
                serde_json::Value::Null => false,
                serde_json::Value::String(name) => !name.is_empty(),
                _ => true,
            });
        let persistence_claim = values.is_enabled("persistence.enabled") && !existing_claim;
        let conditional = [
            (persistence_claim, "persistence.size"),
            (values.is_enabled("ingress.enabled"), "ingress.hostname"),
            (
                values.is_enabled("metrics.prometheusRule.enabled"),
                "metrics.prometheusRule.rules",
            ),
        ];
        keys.extend(
            conditional
                .into_iter()
                .filter(|(active, _)| *active)
                .map(|(_, key)| key.to_string()),
        );
        keys
    }

    /// Render every manifest for the release described by `ctx`
    pub fn render(&self, ctx: &RenderContext) -> Result<RenderResult> {
        let chart = &ctx.chart;
        if chart.is_library() {
            return Err(RenderError::LibraryChart {
                name: chart.name.clone(),
            });
        }
        chart.check_kube_version(&ctx.capabilities.kube_version.semver()?)?;

        let raw = self.merged_values(ctx)?;
        let required = self.required_keys(&raw);
        raw.require(required.as_slice())?;
        let values = AppValues::from_values(&raw)?;
        let scope = Scope::new(ctx, &raw, &values);

        tracing::debug!(
            chart = %chart.name,
            release = %ctx.release.name,
            namespace = %scope.namespace,
            "rendering chart"
        );

        if values.metrics.service_monitor.enabled
            && !ctx
                .capabilities
                .has_api_version(manifests::MONITORING_API_VERSION)
        {
            tracing::warn!(
                "metrics.serviceMonitor is enabled but the cluster does not serve {}",
                manifests::MONITORING_API_VERSION
            );
        }

        let config_map = manifests::config_map(&scope)?;
        let secret = manifests::secret(&scope)?;
        let checksums = checksum::annotations(config_map.as_ref(), secret.as_ref());

        let mut rendered: Vec<RenderedManifest> = Vec::new();
        rendered.extend(manifests::service_account(&scope)?);
        rendered.extend(secret);
        rendered.extend(config_map);
        rendered.extend(manifests::rbac(&scope)?);
        rendered.extend(manifests::pvc(&scope)?);
        rendered.extend(manifests::service(&scope)?);
        rendered.extend(manifests::network_policy(&scope)?);
        rendered.extend(manifests::ingress(&scope)?);
        rendered.extend(manifests::deployment(&scope, &checksums)?);
        rendered.extend(manifests::hpa(&scope)?);
        rendered.extend(manifests::pdb(&scope)?);
        rendered.extend(manifests::service_monitor(&scope)?);
        rendered.extend(manifests::prometheus_rule(&scope)?);
        rendered.extend(manifests::extra_deploy(&scope)?);

        manifest::sort_for_install(&mut rendered);
        tracing::debug!(count = rendered.len(), "rendered manifests");

        Ok(RenderResult {
            manifests: rendered,
            notes: notes::render(&scope),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmet_core::{Capabilities, Chart, KubeVersion, ReleaseInfo};

    fn context(chart_yaml: &str, values: &str) -> RenderContext {
        RenderContext::new(
            Values::from_yaml(values).unwrap(),
            ReleaseInfo::for_install("prod", "apps"),
            Chart::from_yaml(chart_yaml).unwrap(),
        )
    }

    const CHART: &str = "apiVersion: v2\nname: web\nversion: 1.0.0\nappVersion: \"2.1.0\"";

    fn kinds(result: &RenderResult) -> Vec<&str> {
        result.manifests.iter().map(|m| m.kind.as_str()).collect()
    }

    #[test]
    fn test_minimal_render() {
        let ctx = context(CHART, "image: {repository: nginx}");
        let result = Renderer::new().render(&ctx).unwrap();

        assert_eq!(kinds(&result), vec!["ServiceAccount", "Service", "Deployment"]);
        assert!(result.notes.contains("port-forward"));
    }

    #[test]
    fn test_full_render_order() {
        let ctx = context(
            CHART,
            r#"
image: {repository: nginx}
config: {data: {app.conf: x}}
secret: {data: {TOKEN: t}}
rbac: {create: true, rules: [{apiGroups: [""], resources: [pods], verbs: [get]}]}
persistence: {enabled: true}
ingress: {enabled: true, hostname: web.example.com}
networkPolicy: {enabled: true}
autoscaling: {enabled: true}
pdb: {create: true}
metrics:
  serviceMonitor: {enabled: true}
extraDeploy:
  - {apiVersion: v1, kind: Namespace, metadata: {name: extra}}
"#,
        );
        let result = Renderer::new().render(&ctx).unwrap();

        assert_eq!(
            kinds(&result),
            vec![
                "Namespace",
                "ServiceAccount",
                "Role",
                "RoleBinding",
                "Secret",
                "ConfigMap",
                "PersistentVolumeClaim",
                "Service",
                "NetworkPolicy",
                "Ingress",
                "Deployment",
                "HorizontalPodAutoscaler",
                "PodDisruptionBudget",
                "ServiceMonitor",
            ]
        );
    }

    #[test]
    fn test_checksums_on_pod_template() {
        let ctx = context(CHART, "image: {repository: nginx}\nconfig: {data: {a: b}}");
        let result = Renderer::new().render(&ctx).unwrap();

        let config_map = result.manifests.iter().find(|m| m.kind == "ConfigMap").unwrap();
        let deployment = result.manifests.iter().find(|m| m.kind == "Deployment").unwrap();
        let doc: serde_json::Value = serde_yaml::from_str(&deployment.content).unwrap();
        assert_eq!(
            doc["spec"]["template"]["metadata"]["annotations"][checksum::CONFIG_ANNOTATION],
            checksum::sha256_hex(&config_map.content).as_str()
        );
    }

    #[test]
    fn test_missing_image_repository() {
        let ctx = context(CHART, "");
        let err = Renderer::new().render(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "missing required value: image.repository");
    }

    #[test]
    fn test_builder_required_keys() {
        let renderer = Renderer::builder().require("config.data").build();
        let ctx = context(CHART, "image: {repository: nginx}");
        let err = renderer.render(&ctx).unwrap_err();
        assert!(matches!(err, RenderError::MissingRequired { ref key } if key == "config.data"));

        let ctx = context(CHART, "image: {repository: nginx}\nconfig: {data: {a: b}}");
        assert!(renderer.render(&ctx).is_ok());
    }

    #[test]
    fn test_conditional_required_keys() {
        let renderer = Renderer::new();
        let values = Values::from_yaml("ingress: {enabled: true}\npersistence: {enabled: true}").unwrap();
        assert_eq!(
            renderer.required_keys(&values),
            vec!["image.repository", "persistence.size", "ingress.hostname"]
        );

        let values = Values::from_yaml("persistence: {enabled: true, existingClaim: data}").unwrap();
        assert_eq!(renderer.required_keys(&values), vec!["image.repository"]);

        for claim in [r#""0""#, r#""false""#, "0"] {
            let values = Values::from_yaml(&format!(
                "persistence: {{enabled: true, existingClaim: {claim}}}"
            ))
            .unwrap();
            assert_eq!(renderer.required_keys(&values), vec!["image.repository"], "{claim}");
        }

        let values = Values::from_yaml("persistence: {enabled: true, existingClaim: \"\"}").unwrap();
        assert_eq!(
            renderer.required_keys(&values),
            vec!["image.repository", "persistence.size"]
        );
    }

    #[test]
    fn test_existing_claim_named_zero_skips_size() {
        let ctx = context(
            CHART,
            "image: {repository: nginx}\npersistence: {enabled: true, existingClaim: \"0\", size: \"\"}",
        );
        let result = Renderer::new().render(&ctx).unwrap();

        assert!(!kinds(&result).contains(&"PersistentVolumeClaim"));
        let deployment = result.manifests.iter().find(|m| m.kind == "Deployment").unwrap();
        let doc: serde_json::Value = serde_yaml::from_str(&deployment.content).unwrap();
        let volumes = doc["spec"]["template"]["spec"]["volumes"].as_array().unwrap();
        assert!(volumes.iter().any(|v| v["persistentVolumeClaim"]["claimName"] == "0"));
    }

    #[test]
    fn test_null_values_fall_back_to_defaults() {
        let ctx = context(
            CHART,
            "image: {repository: nginx, tag: null}\nresources:\nnodeSelector:\ntolerations:\npodAnnotations: ~\n",
        );
        let result = Renderer::new().render(&ctx).unwrap();

        assert_eq!(kinds(&result), vec!["ServiceAccount", "Service", "Deployment"]);
        let deployment = result.manifests.iter().find(|m| m.kind == "Deployment").unwrap();
        assert!(deployment.content.contains("image: docker.io/nginx:2.1.0"));
    }

    #[test]
    fn test_numeric_image_tag() {
        let ctx = context(CHART, "image: {repository: nginx, tag: 1.27}");
        let result = Renderer::new().render(&ctx).unwrap();
        assert!(result.to_multi_document().contains("image: docker.io/nginx:1.27"));

        let mut values = Values::from_yaml("image: {repository: nginx}").unwrap();
        values.merge(&helmet_core::parse_set_values(&["image.tag=2".to_string()]).unwrap());
        let ctx = RenderContext::new(
            values,
            ReleaseInfo::for_install("prod", "apps"),
            Chart::from_yaml(CHART).unwrap(),
        );
        let result = Renderer::new().render(&ctx).unwrap();
        assert!(result.to_multi_document().contains("image: docker.io/nginx:2"));
    }

    #[test]
    fn test_library_chart_rejected() {
        let ctx = context(
            "apiVersion: v2\nname: common\nversion: 1.0.0\ntype: library",
            "image: {repository: nginx}",
        );
        let err = Renderer::new().render(&ctx).unwrap_err();
        assert!(matches!(err, RenderError::LibraryChart { .. }));
    }

    #[test]
    fn test_kube_version_constraint() {
        let chart = format!("{CHART}\nkubeVersion: \">=1.33.0\"");
        let ctx = context(&chart, "image: {repository: nginx}");
        assert!(Renderer::new().render(&ctx).is_err());

        let ctx = ctx.with_capabilities(Capabilities {
            kube_version: KubeVersion::parse("v1.34.0").unwrap(),
            ..Default::default()
        });
        assert!(Renderer::new().render(&ctx).is_ok());
    }

    #[test]
    fn test_render_is_deterministic() {
        let values = r#"
image: {repository: nginx}
env: {B: "2", A: "1"}
config: {data: {z: "1", a: "2"}}
commonLabels: {team: core, app: web}
"#;
        let first = Renderer::new().render(&context(CHART, values)).unwrap();
        let second = Renderer::new().render(&context(CHART, values)).unwrap();
        assert_eq!(first.to_multi_document(), second.to_multi_document());
        assert_eq!(first, second);
    }

    #[test]
    fn test_names_truncated() {
        let ctx = RenderContext::new(
            Values::from_yaml("image: {repository: nginx}").unwrap(),
            ReleaseInfo::for_install(&"r".repeat(70), "apps"),
            Chart::from_yaml(CHART).unwrap(),
        );
        let result = Renderer::new().render(&ctx).unwrap();
        for manifest in &result.manifests {
            assert!(manifest.name.len() <= 63, "{} is too long", manifest.name);
            assert!(!manifest.name.ends_with('-'));
        }
    }
}
