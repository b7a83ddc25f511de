//! ServiceAccount, Role and RoleBinding

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding, RoleRef, Subject};

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

pub fn service_account(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.service_account;
    if !settings.create {
        return Ok(None);
    }

    let object = ServiceAccount {
        metadata: scope.metadata(&scope.service_account_name(), &settings.annotations),
        automount_service_account_token: Some(settings.automount_service_account_token),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("serviceaccount.yaml"), &object).map(Some)
}

/// Role with `rbac.rules` bound to the release service account
pub fn rbac(scope: &Scope<'_>) -> Result<Vec<RenderedManifest>> {
    let settings = &scope.values.rbac;
    if !settings.create {
        return Ok(Vec::new());
    }
    if settings.rules.is_empty() {
        tracing::warn!("rbac.create is set but rbac.rules is empty; the Role grants nothing");
    }
    if let Some(index) = settings.rules.iter().position(|rule| rule.verbs.is_empty()) {
        return Err(RenderError::invalid(
            format!("rbac.rules[{}].verbs", index),
            "every rule needs at least one verb",
        ));
    }

    let role = Role {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        rules: Some(settings.rules.clone()),
    };

    let binding = RoleBinding {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name: scope.fullname.clone(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: scope.service_account_name(),
            namespace: Some(scope.namespace.clone()),
            ..Default::default()
        }]),
    };

    let source = scope.source("role.yaml");
    Ok(vec![
        RenderedManifest::from_resource(source.clone(), &role)?,
        RenderedManifest::from_resource(source, &binding)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;
    use serde_json::{Value as JsonValue, json};

    fn parse(manifest: &RenderedManifest) -> JsonValue {
        serde_yaml::from_str(&manifest.content).unwrap()
    }

    #[test]
    fn test_service_account() {
        let fx = Fixture::new("serviceAccount: {annotations: {eks.amazonaws.com/role-arn: arn}}");
        let doc = parse(&service_account(&fx.scope()).unwrap().unwrap());

        assert_eq!(doc["metadata"]["name"], "prod-web");
        assert_eq!(doc["metadata"]["annotations"]["eks.amazonaws.com/role-arn"], "arn");
        assert_eq!(doc["automountServiceAccountToken"], false);
    }

    #[test]
    fn test_service_account_not_created() {
        let fx = Fixture::new("serviceAccount: {create: false, name: shared}");
        assert!(service_account(&fx.scope()).unwrap().is_none());
    }

    #[test]
    fn test_role_and_binding() {
        let fx = Fixture::new(r#"
rbac:
  create: true
  rules:
    - apiGroups: [""]
      resources: [pods]
      verbs: [get, list]
"#);
        let manifests = rbac(&fx.scope()).unwrap();
        assert_eq!(manifests.len(), 2);

        let role = parse(&manifests[0]);
        assert_eq!(role["kind"], "Role");
        assert_eq!(role["rules"][0]["verbs"], json!(["get", "list"]));

        let binding = parse(&manifests[1]);
        assert_eq!(binding["kind"], "RoleBinding");
        assert_eq!(binding["roleRef"]["name"], "prod-web");
        assert_eq!(
            binding["subjects"][0],
            json!({"kind": "ServiceAccount", "name": "prod-web", "namespace": "apps"})
        );
    }

    #[test]
    fn test_rule_without_verbs() {
        let fx = Fixture::new("rbac: {create: true, rules: [{apiGroups: [''], resources: [pods], verbs: []}]}");
        let err = rbac(&fx.scope()).unwrap_err();
        assert!(err.to_string().contains("rbac.rules[0].verbs"));
    }
}
