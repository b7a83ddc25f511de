//! Lint command - check a chart without writing anything

use std::path::{Path, PathBuf};

use console::style;
use helmet_core::{LoadedChart, ReleaseInfo, RenderContext, SchemaValidator, Values};
use helmet_render::{AppValues, Renderer, suggestions};

use crate::error::{CliError, Result};
use crate::util::{layered_values, pluralize};

/// Release used for the render check
const LINT_RELEASE: &str = "lint";

#[derive(Debug, Default)]
struct Tally {
    errors: usize,
    warnings: usize,
}

impl Tally {
    fn ok(&self, message: impl std::fmt::Display) {
        println!("  {} {}", style("✓").green(), message);
    }

    fn error(&mut self, message: impl std::fmt::Display) {
        println!("  {} {}", style("✗").red(), message);
        self.errors += 1;
    }

    fn warn(&mut self, message: impl std::fmt::Display) {
        println!("  {} {}", style("⚠").yellow(), message);
        self.warnings += 1;
    }
}

pub fn run(path: &Path, values_files: &[PathBuf], set_values: &[String], strict: bool) -> Result<()> {
    println!("{} Linting chart at {}", style("→").blue(), path.display());

    let mut tally = Tally::default();
    check(path, values_files, set_values, &mut tally);

    println!();
    let failed = tally.errors > 0 || (strict && tally.warnings > 0);
    if failed {
        println!(
            "{} Lint failed: {}, {}",
            style("✗").red().bold(),
            pluralize(tally.errors, "error", "errors"),
            pluralize(tally.warnings, "warning", "warnings")
        );
        return Err(CliError::lint_failed(tally.errors, tally.warnings));
    }

    println!(
        "{} Lint passed ({})",
        style("✓").green().bold(),
        pluralize(tally.warnings, "warning", "warnings")
    );
    Ok(())
}

fn check(path: &Path, values_files: &[PathBuf], set_values: &[String], tally: &mut Tally) {
    let chart = match LoadedChart::load(path) {
        Ok(chart) => {
            tally.ok(format_args!(
                "Chart.yaml is valid ({} v{})",
                chart.chart.name, chart.chart.version
            ));
            chart
        }
        Err(e) => {
            tally.error(format_args!("Chart.yaml: {}", e));
            return;
        }
    };

    let meta = &chart.chart;
    if meta.description.as_deref().is_none_or(str::is_empty) {
        tally.warn("Chart.yaml has no description");
    }
    if meta.app_version.as_deref().is_none_or(str::is_empty) {
        tally.warn("Chart.yaml has no appVersion");
    }

    let values = match layered_values(&chart, values_files, set_values) {
        Ok(values) => values,
        Err(e) => {
            tally.error(format_args!("values: {}", e));
            return;
        }
    };

    check_unknown_keys(&values, tally);
    check_schema(&chart, &values, tally);

    if chart.chart.is_library() {
        tally.warn("library chart: render check skipped");
        return;
    }

    let ctx = RenderContext::new(
        values,
        ReleaseInfo::for_install(LINT_RELEASE, "default"),
        chart.chart.clone(),
    );
    let renderer = Renderer::new();
    match renderer.render(&ctx) {
        Ok(result) => tally.ok(format_args!(
            "chart renders ({})",
            pluralize(result.manifests.len(), "manifest", "manifests")
        )),
        Err(e) => {
            tally.error(format_args!("render: {}", e));
            return;
        }
    }

    let preset_in_use = renderer
        .merged_values(&ctx)
        .and_then(|merged| AppValues::from_values(&merged))
        .is_ok_and(|app| app.uses_resources_preset());
    if preset_in_use {
        tally.warn("resources come from resourcesPreset; set `resources` for production");
    }
}

fn check_unknown_keys(values: &Values, tally: &mut Tally) {
    let (Some(given), Ok(defaults)) = (values.inner().as_object(), AppValues::defaults()) else {
        return;
    };
    let Some(known) = defaults.inner().as_object() else {
        return;
    };
    let known: Vec<&str> = known.keys().map(String::as_str).collect();

    for (key, suggestion) in suggestions::unknown_keys(given.keys().map(String::as_str), &known) {
        match suggestion {
            Some(suggestion) => tally.warn(format_args!(
                "unknown top-level value `{}` (did you mean `{}`?)",
                key, suggestion
            )),
            None => tally.warn(format_args!("unknown top-level value `{}`", key)),
        }
    }
}

fn check_schema(chart: &LoadedChart, values: &Values, tally: &mut Tally) {
    let Some(schema) = &chart.schema else {
        println!("  {} values.schema.json not found (optional)", style("-").dim());
        return;
    };

    match SchemaValidator::new(schema) {
        Ok(validator) => {
            let result = validator.validate(values);
            if result.is_valid {
                tally.ok("values match values.schema.json");
            }
            for error in &result.errors {
                tally.error(format_args!("values.schema.json: {}: {}", error.path, error.message));
            }
        }
        Err(e) => tally.error(format_args!("values.schema.json: {}", e)),
    }
}
