//! Snapshot tests for user-facing command output

use std::fs;
use std::process::Command;

use tempfile::TempDir;

/// Run helmet inside `dir` and capture (stdout, stderr, success)
fn helmet_in(dir: &TempDir, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_helmet"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("HELMET_NAMESPACE")
        .env_remove("HELMET_KUBE_VERSION")
        .env_remove("RUST_LOG")
        .env_remove("CLICOLOR_FORCE")
        .output()
        .expect("Failed to execute helmet");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// A bare chart at `<tmp>/web` without description or appVersion
fn bare_chart(values: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let chart_dir = dir.path().join("web");
    fs::create_dir(&chart_dir).unwrap();
    fs::write(
        chart_dir.join("Chart.yaml"),
        "apiVersion: v2\nname: web\nversion: 1.0.0\n",
    )
    .unwrap();
    fs::write(chart_dir.join("values.yaml"), values).unwrap();
    dir
}

#[test]
fn test_lint_report() {
    let dir = bare_chart("image:\n  repository: nginx\ningres:\n  enabled: true\n");
    let (stdout, _, success) = helmet_in(&dir, &["lint", "web"]);

    assert!(success);
    insta::assert_snapshot!(stdout.trim_end(), @r"
    → Linting chart at web
      ✓ Chart.yaml is valid (web v1.0.0)
      ⚠ Chart.yaml has no description
      ⚠ Chart.yaml has no appVersion
      ⚠ unknown top-level value `ingres` (did you mean `ingress`?)
      - values.schema.json not found (optional)
      ✓ chart renders (3 manifests)

    ✓ Lint passed (3 warnings)
    ");
}

#[test]
fn test_template_notes() {
    let dir = bare_chart("image:\n  repository: nginx\n");
    let (_, stderr, success) = helmet_in(&dir, &["template", "prod", "web"]);

    assert!(success);
    insta::assert_snapshot!(stderr.trim_end(), @r#"
    NOTES:
    CHART NAME: web
    CHART VERSION: 1.0.0
    APP VERSION: -

    Release "prod" renders prod-web in namespace "default".

    Get the application URL by running:
      kubectl port-forward --namespace default svc/prod-web 8080:80
      echo http://127.0.0.1:8080
    "#);
}
