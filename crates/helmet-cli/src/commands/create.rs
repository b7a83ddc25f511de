//! Create command - scaffold a new chart

use std::fs;
use std::path::Path;

use console::style;
use miette::{IntoDiagnostic, WrapErr};

use crate::error::{CliError, Result};

pub fn run(name: &str, output: &Path) -> Result<()> {
    let chart_dir = output.join(name);

    if chart_dir.exists() {
        return Err(CliError::Chart {
            message: format!("Directory {} already exists", chart_dir.display()),
            help: Some("pick another name or remove the directory".to_string()),
        });
    }

    fs::create_dir_all(&chart_dir)
        .into_diagnostic()
        .wrap_err("Failed to create chart directory")?;

    let files = [
        ("Chart.yaml", chart_yaml(name)),
        ("values.yaml", values_yaml(name)),
        ("values.schema.json", VALUES_SCHEMA.to_string()),
    ];
    for (file, content) in &files {
        fs::write(chart_dir.join(file), content)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", file))?;
    }

    println!(
        "{} Created chart {} in {}",
        style("✓").green(),
        style(name).cyan(),
        chart_dir.display()
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/values.yaml", name);
    println!("  2. Run: helmet lint {}", name);
    println!("  3. Run: helmet template my-release {}", name);

    Ok(())
}

fn chart_yaml(name: &str) -> String {
    format!(
        r#"apiVersion: v2
name: {name}
description: A Helmet chart for {name}
type: application
version: 0.1.0
appVersion: "1.0.0"
"#
    )
}

fn values_yaml(name: &str) -> String {
    format!(
        r#"# Default values for {name}.
# Run `helmet show defaults` for every available key.

replicaCount: 1

image:
  registry: docker.io
  repository: nginx
  tag: ""
  pullPolicy: IfNotPresent

containerPorts:
  http: 8080

service:
  type: ClusterIP
  ports:
    http: 80

ingress:
  enabled: false
  hostname: ""

resources: {{}}

autoscaling:
  enabled: false
  minReplicas: 1
  maxReplicas: 3
"#
    )
}

const VALUES_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "properties": {
    "replicaCount": {
      "type": "integer",
      "minimum": 0
    },
    "image": {
      "type": "object",
      "required": ["repository"],
      "properties": {
        "registry": { "type": "string" },
        "repository": { "type": "string", "minLength": 1 },
        "tag": { "type": ["string", "number"] },
        "pullPolicy": { "enum": ["Always", "IfNotPresent", "Never"] }
      }
    },
    "service": {
      "type": "object",
      "properties": {
        "type": { "enum": ["ClusterIP", "NodePort", "LoadBalancer"] }
      }
    },
    "ingress": {
      "type": "object",
      "properties": {
        "enabled": { "type": "boolean" },
        "hostname": { "type": "string" }
      }
    }
  }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use helmet_core::{LoadedChart, SchemaValidator};

    #[test]
    fn test_scaffold_is_loadable_and_valid() {
        let dir = tempfile::tempdir().unwrap();
        run("web", dir.path()).unwrap();

        let chart = LoadedChart::load(dir.path().join("web")).unwrap();
        assert_eq!(chart.chart.name, "web");
        assert_eq!(chart.chart.app_version.as_deref(), Some("1.0.0"));

        let schema = chart.schema.as_ref().unwrap();
        let result = SchemaValidator::new(schema).unwrap().validate(&chart.values);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        let err = run("web", dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Chart { .. }));
    }
}
