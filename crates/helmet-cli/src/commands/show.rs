//! Show command - display chart information

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use console::style;
use helmet_core::LoadedChart;
use helmet_render::AppValues;
use miette::{IntoDiagnostic, WrapErr};

use crate::error::Result;

/// What `helmet show` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowTarget {
    /// Chart.yaml metadata
    Chart,
    /// The chart's values.yaml, as written
    Values,
    /// Built-in defaults every chart inherits
    Defaults,
}

pub fn run(target: ShowTarget, path: &Path) -> Result<()> {
    match target {
        ShowTarget::Chart => show_chart(path),
        ShowTarget::Values => show_values(path),
        ShowTarget::Defaults => show_defaults(),
    }
}

fn show_chart(path: &Path) -> Result<()> {
    let chart = LoadedChart::load(path)?;
    let meta = &chart.chart;

    println!("{}", style(&meta.name).cyan().bold());
    println!("{}", style("=".repeat(meta.name.len())).dim());
    println!();

    println!("{}: {}", style("Version").bold(), meta.version);
    if let Some(app_version) = &meta.app_version {
        println!("{}: {}", style("App Version").bold(), app_version);
    }
    if let Some(desc) = &meta.description {
        println!("{}: {}", style("Description").bold(), desc);
    }
    println!("{}: {}", style("Type").bold(), meta.chart_type);
    if let Some(kube_version) = &meta.kube_version {
        println!("{}: {}", style("Kubernetes").bold(), kube_version);
    }
    if let Some(home) = &meta.home {
        println!("{}: {}", style("Home").bold(), home);
    }

    if !meta.keywords.is_empty() {
        println!("{}: {}", style("Keywords").bold(), meta.keywords.join(", "));
    }

    if !meta.sources.is_empty() {
        println!();
        println!("{}:", style("Sources").bold());
        for source in &meta.sources {
            println!("  - {}", source);
        }
    }

    if !meta.maintainers.is_empty() {
        println!();
        println!("{}:", style("Maintainers").bold());
        for maintainer in &meta.maintainers {
            match maintainer.email.as_deref() {
                Some(email) if !email.is_empty() => {
                    println!("  - {} <{}>", maintainer.name, email)
                }
                _ => println!("  - {}", maintainer.name),
            }
        }
    }

    Ok(())
}

fn show_values(path: &Path) -> Result<()> {
    let chart = LoadedChart::load(path)?;
    let values_path = chart.root.join("values.yaml");
    if !values_path.exists() {
        eprintln!(
            "{} {} has no values.yaml",
            style("⚠").yellow(),
            chart.chart.name
        );
        return Ok(());
    }

    let content = fs::read_to_string(&values_path)?;
    print!("{}", content);
    Ok(())
}

fn show_defaults() -> Result<()> {
    let defaults = AppValues::defaults()?;
    let yaml = serde_yaml::to_string(defaults.inner())
        .into_diagnostic()
        .wrap_err("Failed to serialize default values")?;
    print!("{}", yaml);
    Ok(())
}
