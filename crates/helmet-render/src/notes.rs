//! Post-render instructions printed after `helmet template`

use std::fmt::Write as _;

use crate::scope::Scope;

/// First service port, used in access instructions
fn primary_port(scope: &Scope<'_>) -> (String, i32) {
    let ports = &scope.values.service.ports;
    ports
        .get("http")
        .map(|port| ("http".to_string(), *port))
        .or_else(|| ports.iter().next().map(|(name, port)| (name.clone(), *port)))
        .unwrap_or_else(|| ("http".to_string(), 80))
}

pub fn render(scope: &Scope<'_>) -> String {
    let values = scope.values;
    let ns = &scope.namespace;
    let svc = &scope.fullname;
    let mut notes = String::new();

    let chart = &scope.ctx.chart;
    let _ = writeln!(
        notes,
        "CHART NAME: {}\nCHART VERSION: {}\nAPP VERSION: {}\n",
        chart.name,
        chart.version,
        chart.app_version.as_deref().unwrap_or("-"),
    );
    let _ = writeln!(
        notes,
        "Release \"{}\" renders {} in namespace \"{}\".\n",
        scope.ctx.release.name, svc, ns
    );

    let (port_name, port) = primary_port(scope);
    if values.ingress.enabled {
        let scheme = if values.ingress.tls { "https" } else { "http" };
        let _ = writeln!(notes, "Application URL:");
        let _ = writeln!(
            notes,
            "  {}://{}{}",
            scheme, values.ingress.hostname, values.ingress.path
        );
        for host in &values.ingress.extra_hosts {
            let path = host.path.as_deref().unwrap_or(&values.ingress.path);
            let _ = writeln!(notes, "  {}://{}{}", scheme, host.name, path);
        }
    } else {
        match values.service.type_.as_str() {
            "NodePort" => {
                let _ = writeln!(notes, "Get the application URL by running:");
                let _ = writeln!(
                    notes,
                    "  export NODE_PORT=$(kubectl get --namespace {ns} -o jsonpath=\"{{.spec.ports[?(@.name=='{port_name}')].nodePort}}\" services {svc})"
                );
                let _ = writeln!(
                    notes,
                    "  export NODE_IP=$(kubectl get nodes -o jsonpath=\"{{.items[0].status.addresses[0].address}}\")"
                );
                let _ = writeln!(notes, "  echo http://$NODE_IP:$NODE_PORT");
            }
            "LoadBalancer" => {
                let _ = writeln!(
                    notes,
                    "It may take a few minutes for the LoadBalancer IP to be available."
                );
                let _ = writeln!(notes, "Watch its status with:");
                let _ = writeln!(notes, "  kubectl get svc --namespace {ns} -w {svc}");
                let _ = writeln!(notes, "Then get the application URL by running:");
                let _ = writeln!(
                    notes,
                    "  export SERVICE_IP=$(kubectl get svc --namespace {ns} {svc} -o jsonpath=\"{{.status.loadBalancer.ingress[0].ip}}\")"
                );
                let _ = writeln!(notes, "  echo http://$SERVICE_IP:{port}");
            }
            _ => {
                let _ = writeln!(notes, "Get the application URL by running:");
                let _ = writeln!(
                    notes,
                    "  kubectl port-forward --namespace {ns} svc/{svc} 8080:{port}"
                );
                let _ = writeln!(notes, "  echo http://127.0.0.1:8080");
            }
        }
    }

    if values.uses_resources_preset() {
        let _ = writeln!(
            notes,
            "\nWARNING: resources are set from resourcesPreset \"{}\". Set `resources` explicitly for production workloads.",
            values.resources_preset
        );
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::testing::Fixture;

    #[test]
    fn test_cluster_ip_notes() {
        let fx = Fixture::new("");
        let notes = render(&fx.scope());
        assert!(notes.starts_with("CHART NAME: web\nCHART VERSION: 1.0.0\nAPP VERSION: 2.1.0\n"));
        assert!(notes.contains("kubectl port-forward --namespace apps svc/prod-web 8080:80"));
        assert!(!notes.contains("WARNING"));
    }

    #[test]
    fn test_ingress_notes() {
        let fx = Fixture::new("ingress: {enabled: true, hostname: web.example.com, tls: true}");
        let notes = render(&fx.scope());
        assert!(notes.contains("https://web.example.com/"));
        assert!(!notes.contains("port-forward"));
    }

    #[test]
    fn test_node_port_and_load_balancer_notes() {
        let notes = render(&Fixture::new("service: {type: NodePort}").scope());
        assert!(notes.contains("export NODE_PORT="));
        assert!(notes.contains("services prod-web"));

        let notes = render(&Fixture::new("service: {type: LoadBalancer}").scope());
        assert!(notes.contains("kubectl get svc --namespace apps -w prod-web"));
        assert!(notes.contains("echo http://$SERVICE_IP:80"));
    }

    #[test]
    fn test_preset_warning() {
        let notes = render(&Fixture::new("resourcesPreset: small").scope());
        assert!(notes.contains("WARNING: resources are set from resourcesPreset \"small\""));
    }
}
