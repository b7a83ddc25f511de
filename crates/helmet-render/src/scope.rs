//! Per-render naming scope shared by every manifest helper

use std::collections::BTreeMap;

use helmet_core::{RenderContext, Values, names};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::labels;
use crate::values::AppValues;

/// Names, labels and typed values computed once per render
#[derive(Debug)]
pub struct Scope<'a> {
    pub ctx: &'a RenderContext,
    /// Merged values (defaults included)
    pub raw: &'a Values,
    pub values: &'a AppValues,
    pub name: String,
    pub fullname: String,
    pub namespace: String,
}

impl<'a> Scope<'a> {
    pub fn new(ctx: &'a RenderContext, raw: &'a Values, values: &'a AppValues) -> Self {
        Self {
            ctx,
            raw,
            values,
            name: names::name(&ctx.chart, raw),
            fullname: names::fullname(&ctx.chart, &ctx.release, raw),
            namespace: names::namespace(&ctx.release, raw),
        }
    }

    /// Standard labels plus `commonLabels`
    pub fn labels(&self) -> BTreeMap<String, String> {
        labels::standard_labels(self)
    }

    /// Labels used in immutable selectors
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        labels::selector_labels(self)
    }

    pub fn service_account_name(&self) -> String {
        names::service_account_name(&self.ctx.chart, &self.ctx.release, self.raw)
    }

    /// `# Source:` path for a manifest file of this chart
    pub fn source(&self, file: &str) -> String {
        format!("{}/templates/{}", self.ctx.chart.name, file)
    }

    /// Metadata for a namespaced object owned by this release
    pub fn metadata(&self, name: &str, annotations: &BTreeMap<String, String>) -> ObjectMeta {
        let annotations = labels::merge_annotations(&self.values.common_annotations, annotations);
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels()),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the manifest tests

    use helmet_core::{Chart, ReleaseInfo, RenderContext, Values};

    use crate::values::AppValues;

    pub struct Fixture {
        pub ctx: RenderContext,
        pub raw: Values,
        pub values: AppValues,
    }

    impl Fixture {
        /// Chart `web` 1.0.0 (appVersion 2.1.0), release `prod` in `apps`
        pub fn new(overrides: &str) -> Self {
            let chart = Chart::from_yaml(
                "apiVersion: v2\nname: web\nversion: 1.0.0\nappVersion: \"2.1.0\"",
            )
            .unwrap();
            let user = Values::from_yaml(overrides).unwrap();
            let mut raw = AppValues::defaults().unwrap();
            raw.merge(&user);
            let values = AppValues::from_values(&raw).unwrap();
            let ctx = RenderContext::new(user, ReleaseInfo::for_install("prod", "apps"), chart);
            Self { ctx, raw, values }
        }

        pub fn scope(&self) -> super::Scope<'_> {
            super::Scope::new(&self.ctx, &self.raw, &self.values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Fixture;

    #[test]
    fn test_scope_names() {
        let fx = Fixture::new("image: {repository: nginx}");
        let scope = fx.scope();
        assert_eq!(scope.name, "web");
        assert_eq!(scope.fullname, "prod-web");
        assert_eq!(scope.namespace, "apps");
        assert_eq!(scope.service_account_name(), "prod-web");
    }

    #[test]
    fn test_metadata_annotations() {
        let fx = Fixture::new("commonAnnotations: {team: core, owner: a}");
        let scope = fx.scope();

        let own = std::collections::BTreeMap::from([("owner".to_string(), "b".to_string())]);
        let meta = scope.metadata("prod-web", &own);
        let annotations = meta.annotations.unwrap();
        assert_eq!(annotations["team"], "core");
        assert_eq!(annotations["owner"], "b");
        assert_eq!(meta.namespace.as_deref(), Some("apps"));

        let bare = Fixture::new("");
        let meta = bare.scope().metadata("x", &Default::default());
        assert!(meta.annotations.is_none());
    }
}
