//! Service, Ingress and NetworkPolicy

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, NetworkPolicy, NetworkPolicySpec,
    ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::json;

use crate::error::{RenderError, Result};
use crate::manifest::RenderedManifest;
use crate::scope::Scope;

const SERVICE_TYPES: &[&str] = &["ClusterIP", "NodePort", "LoadBalancer"];

fn exposes_node_ports(service_type: &str) -> bool {
    matches!(service_type, "NodePort" | "LoadBalancer")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn service(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let values = scope.values;
    let settings = &values.service;

    if !SERVICE_TYPES.contains(&settings.type_.as_str()) {
        return Err(RenderError::invalid_with_help(
            "service.type",
            format!("unsupported service type `{}`", settings.type_),
            crate::suggestions::unknown_help(&settings.type_, SERVICE_TYPES),
        ));
    }
    if settings.ports.is_empty() {
        return Err(RenderError::MissingRequired {
            key: "service.ports".to_string(),
        });
    }

    let node_ports = exposes_node_ports(&settings.type_);
    let ports = settings
        .ports
        .iter()
        .map(|(name, port)| ServicePort {
            name: Some(name.clone()),
            port: *port,
            protocol: Some("TCP".to_string()),
            target_port: Some(if values.container_ports.contains_key(name) {
                IntOrString::String(name.clone())
            } else {
                IntOrString::Int(*port)
            }),
            node_port: if node_ports {
                settings.node_ports.get(name).copied()
            } else {
                None
            },
            ..Default::default()
        })
        .collect();

    let is_load_balancer = settings.type_ == "LoadBalancer";
    let object = Service {
        metadata: scope.metadata(&scope.fullname, &settings.annotations),
        spec: Some(ServiceSpec {
            type_: Some(settings.type_.clone()),
            ports: Some(ports),
            selector: Some(scope.selector_labels()),
            cluster_ip: non_empty(&settings.cluster_ip),
            load_balancer_ip: if is_load_balancer {
                non_empty(&settings.load_balancer_ip)
            } else {
                None
            },
            load_balancer_source_ranges: (is_load_balancer
                && !settings.load_balancer_source_ranges.is_empty())
            .then(|| settings.load_balancer_source_ranges.clone()),
            external_traffic_policy: if node_ports {
                non_empty(&settings.external_traffic_policy)
            } else {
                None
            },
            session_affinity: non_empty(&settings.session_affinity),
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("service.yaml"), &object).map(Some)
}

fn ingress_path(scope: &Scope<'_>, path: &str) -> HTTPIngressPath {
    let settings = &scope.values.ingress;
    let port = match settings.service_port.parse::<i32>() {
        Ok(number) => ServiceBackendPort {
            number: Some(number),
            ..Default::default()
        },
        Err(_) => ServiceBackendPort {
            name: Some(settings.service_port.clone()),
            ..Default::default()
        },
    };

    HTTPIngressPath {
        path: Some(path.to_string()),
        path_type: settings.path_type.clone(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: scope.fullname.clone(),
                port: Some(port),
            }),
            ..Default::default()
        },
    }
}

fn ingress_rule(scope: &Scope<'_>, host: &str, path: &str) -> IngressRule {
    IngressRule {
        host: Some(host.to_string()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![ingress_path(scope, path)],
        }),
    }
}

pub fn ingress(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let settings = &scope.values.ingress;
    if !settings.enabled {
        return Ok(None);
    }
    if settings.hostname.is_empty() {
        return Err(RenderError::MissingRequired {
            key: "ingress.hostname".to_string(),
        });
    }

    let mut rules = vec![ingress_rule(scope, &settings.hostname, &settings.path)];
    rules.extend(settings.extra_hosts.iter().map(|host| {
        ingress_rule(scope, &host.name, host.path.as_deref().unwrap_or(&settings.path))
    }));

    let mut tls = Vec::new();
    if settings.tls {
        tls.push(IngressTLS {
            hosts: Some(vec![settings.hostname.clone()]),
            secret_name: Some(format!("{}-tls", settings.hostname)),
        });
    }
    tls.extend(settings.extra_tls.iter().cloned());

    let object = Ingress {
        metadata: scope.metadata(&scope.fullname, &settings.annotations),
        spec: Some(IngressSpec {
            ingress_class_name: non_empty(&settings.ingress_class_name),
            rules: Some(rules),
            tls: (!tls.is_empty()).then_some(tls),
            ..Default::default()
        }),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("ingress.yaml"), &object).map(Some)
}

pub fn network_policy(scope: &Scope<'_>) -> Result<Option<RenderedManifest>> {
    let values = scope.values;
    let settings = &values.network_policy;
    if !settings.enabled {
        return Ok(None);
    }

    let selector = scope.selector_labels();
    let container_ports: Vec<_> = values
        .container_ports
        .values()
        .map(|port| json!({"port": port, "protocol": "TCP"}))
        .collect();

    let mut ingress_rule = json!({ "ports": container_ports });
    if !settings.allow_external {
        let client_label = format!("{}-client", scope.fullname);
        ingress_rule["from"] = json!([
            {"podSelector": {"matchLabels": {client_label: "true"}}},
            {"podSelector": {"matchLabels": selector}},
        ]);
    }
    let mut ingress = vec![ingress_rule];
    for rule in &settings.extra_ingress {
        ingress.push(serde_json::to_value(rule)?);
    }

    let egress = if settings.allow_external_egress {
        vec![json!({})]
    } else {
        let mut egress = vec![json!({
            "ports": [
                {"port": 53, "protocol": "UDP"},
                {"port": 53, "protocol": "TCP"},
            ]
        })];
        for rule in &settings.extra_egress {
            egress.push(serde_json::to_value(rule)?);
        }
        egress
    };

    let spec: NetworkPolicySpec = serde_json::from_value(json!({
        "podSelector": {"matchLabels": selector},
        "policyTypes": ["Ingress", "Egress"],
        "ingress": ingress,
        "egress": egress,
    }))?;

    let object = NetworkPolicy {
        metadata: scope.metadata(&scope.fullname, &BTreeMap::new()),
        spec: Some(spec),
        ..Default::default()
    };
    RenderedManifest::from_resource(scope.source("networkpolicy.yaml"), &object).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;
    use serde_json::Value as JsonValue;

    fn parse(manifest: Option<RenderedManifest>) -> JsonValue {
        serde_yaml::from_str(&manifest.unwrap().content).unwrap()
    }

    #[test]
    fn test_service_defaults() {
        let fx = Fixture::new("");
        let doc = parse(service(&fx.scope()).unwrap());

        assert_eq!(doc["spec"]["type"], "ClusterIP");
        assert_eq!(
            doc["spec"]["ports"],
            json!([{"name": "http", "port": 80, "protocol": "TCP", "targetPort": "http"}])
        );
        assert_eq!(
            doc["spec"]["selector"],
            json!({"app.kubernetes.io/instance": "prod", "app.kubernetes.io/name": "web"})
        );
    }

    #[test]
    fn test_service_numeric_target_port() {
        let fx = Fixture::new("service: {ports: {metrics: 9100}}");
        let doc = parse(service(&fx.scope()).unwrap());
        assert_eq!(doc["spec"]["ports"][0]["targetPort"], 9100);
    }

    #[test]
    fn test_node_ports_only_for_node_port_types() {
        let fx = Fixture::new("service: {nodePorts: {http: 30080}}");
        let doc = parse(service(&fx.scope()).unwrap());
        assert!(doc["spec"]["ports"][0].get("nodePort").is_none());

        let fx = Fixture::new("service: {type: NodePort, nodePorts: {http: 30080}}");
        let doc = parse(service(&fx.scope()).unwrap());
        assert_eq!(doc["spec"]["ports"][0]["nodePort"], 30080);
    }

    #[test]
    fn test_unknown_service_type() {
        let fx = Fixture::new("service: {type: NodePrt}");
        let err = service(&fx.scope()).unwrap_err();
        assert!(err.to_string().contains("service.type"));
    }

    #[test]
    fn test_ingress_requires_hostname() {
        let fx = Fixture::new("ingress: {enabled: true}");
        let err = ingress(&fx.scope()).unwrap_err();
        assert_eq!(err.to_string(), "missing required value: ingress.hostname");
    }

    #[test]
    fn test_ingress_with_tls_and_extra_hosts() {
        let fx = Fixture::new(r#"
ingress:
  enabled: true
  hostname: web.example.com
  ingressClassName: nginx
  tls: true
  extraHosts: [{name: www.example.com, path: /app}]
"#);
        let doc = parse(ingress(&fx.scope()).unwrap());
        let spec = &doc["spec"];

        assert_eq!(spec["ingressClassName"], "nginx");
        assert_eq!(spec["rules"][0]["host"], "web.example.com");
        assert_eq!(
            spec["rules"][0]["http"]["paths"][0],
            json!({
                "path": "/",
                "pathType": "ImplementationSpecific",
                "backend": {"service": {"name": "prod-web", "port": {"name": "http"}}}
            })
        );
        assert_eq!(spec["rules"][1]["http"]["paths"][0]["path"], "/app");
        assert_eq!(
            spec["tls"],
            json!([{"hosts": ["web.example.com"], "secretName": "web.example.com-tls"}])
        );
    }

    #[test]
    fn test_network_policy_open() {
        let fx = Fixture::new("networkPolicy: {enabled: true}");
        let doc = parse(network_policy(&fx.scope()).unwrap());
        let spec = &doc["spec"];

        assert_eq!(spec["policyTypes"], json!(["Ingress", "Egress"]));
        assert_eq!(spec["ingress"], json!([{"ports": [{"port": 8080, "protocol": "TCP"}]}]));
        assert_eq!(spec["egress"], json!([{}]));
    }

    #[test]
    fn test_network_policy_restricted() {
        let fx = Fixture::new(r#"
networkPolicy:
  enabled: true
  allowExternal: false
  allowExternalEgress: false
  extraEgress:
    - to: [{ipBlock: {cidr: 10.0.0.0/8}}]
"#);
        let doc = parse(network_policy(&fx.scope()).unwrap());
        let spec = &doc["spec"];

        let from = &spec["ingress"][0]["from"];
        assert_eq!(from[0]["podSelector"]["matchLabels"]["prod-web-client"], "true");
        assert_eq!(from[1]["podSelector"]["matchLabels"]["app.kubernetes.io/name"], "web");

        let egress = spec["egress"].as_array().unwrap();
        assert_eq!(egress.len(), 2);
        assert_eq!(egress[0]["ports"][0], json!({"port": 53, "protocol": "UDP"}));
        assert_eq!(egress[1]["to"][0]["ipBlock"]["cidr"], "10.0.0.0/8");
    }
}
