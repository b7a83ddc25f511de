//! Template command - render a chart locally

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use helmet_core::{
    Capabilities, KubeVersion, LoadedChart, ReleaseInfo, RenderContext, SchemaValidator, Values,
};
use helmet_render::{RenderedManifest, Renderer};
use miette::{IntoDiagnostic, WrapErr};

use crate::error::{CliError, Result};
use crate::util::layered_values;

/// Options for `helmet template`
#[derive(Debug, Default)]
pub struct TemplateOptions {
    pub values_files: Vec<PathBuf>,
    pub set_values: Vec<String>,
    pub namespace: String,
    pub kube_version: Option<String>,
    pub api_versions: Vec<String>,
    pub require: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub show_only: Vec<String>,
    pub show_values: bool,
    pub skip_schema: bool,
}

pub fn run(name: &str, chart_path: &Path, opts: &TemplateOptions) -> Result<()> {
    let chart = LoadedChart::load(chart_path)?;
    let values = layered_values(&chart, &opts.values_files, &opts.set_values)?;

    if !opts.skip_schema {
        validate_schema(&chart, &values)?;
    }

    let capabilities = Capabilities {
        kube_version: match &opts.kube_version {
            Some(version) => KubeVersion::parse(version)?,
            None => KubeVersion::default(),
        },
        api_versions: opts.api_versions.clone(),
    };
    let ctx = RenderContext::new(
        values,
        ReleaseInfo::for_install(name, &opts.namespace),
        chart.chart.clone(),
    )
    .with_capabilities(capabilities);

    let renderer = opts
        .require
        .iter()
        .fold(Renderer::builder(), |builder, key| builder.require(key.as_str()))
        .build();

    if opts.show_values {
        let merged = renderer.merged_values(&ctx)?;
        let yaml = serde_yaml::to_string(merged.inner())
            .into_diagnostic()
            .wrap_err("Failed to serialize values")?;
        // stderr, so stdout stays a manifest stream
        eprintln!("{}", style("# Computed Values").cyan().bold().for_stderr());
        eprintln!("---");
        eprint!("{}", yaml);
    }

    let result = renderer.render(&ctx)?;
    let manifests = select(&result.manifests, &opts.show_only)?;

    match &opts.output_dir {
        Some(output_dir) => write_files(output_dir, &manifests, &result.notes)?,
        None => {
            for manifest in &manifests {
                print!("{}", manifest.to_document());
            }
            eprintln!("{}", style("NOTES:").yellow().bold().for_stderr());
            eprint!("{}", result.notes);
        }
    }

    Ok(())
}

/// Reject values that do not satisfy the chart's values.schema.json
pub fn validate_schema(chart: &LoadedChart, values: &Values) -> Result<()> {
    let Some(schema) = &chart.schema else {
        return Ok(());
    };

    let result = SchemaValidator::new(schema)?.validate(values);
    if result.is_valid {
        return Ok(());
    }

    let details = result
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("\n");
    Err(CliError::validation_with_help(
        format!("values do not match values.schema.json\n{}", details),
        "fix the values or pass --skip-schema",
    ))
}

/// Manifests whose source contains one of the filters (all when no filter is given)
fn select<'a>(manifests: &'a [RenderedManifest], show_only: &[String]) -> Result<Vec<&'a RenderedManifest>> {
    if show_only.is_empty() {
        return Ok(manifests.iter().collect());
    }

    let selected: Vec<&RenderedManifest> = manifests
        .iter()
        .filter(|m| show_only.iter().any(|filter| m.source.contains(filter.as_str())))
        .collect();

    if selected.is_empty() {
        return Err(CliError::render_with_help(
            format!("no manifest matches --show-only {}", show_only.join(", ")),
            "sources look like <chart>/templates/deployment.yaml",
        ));
    }
    Ok(selected)
}

/// One file per source path, documents in install order
fn write_files(output_dir: &Path, manifests: &[&RenderedManifest], notes: &str) -> Result<()> {
    let mut files: BTreeMap<&str, String> = BTreeMap::new();
    for manifest in manifests {
        files
            .entry(manifest.source.as_str())
            .or_default()
            .push_str(&manifest.to_document());
    }

    for (source, content) in &files {
        let file_path = output_dir.join(source);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, content)?;
        println!("{} {}", style("wrote").green(), file_path.display());
    }

    let notes_path = output_dir.join("NOTES.txt");
    fs::create_dir_all(output_dir)?;
    fs::write(&notes_path, notes)?;
    println!("{} {}", style("wrote").green(), notes_path.display());

    Ok(())
}
