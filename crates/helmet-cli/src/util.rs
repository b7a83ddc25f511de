//! Shared helpers for CLI commands

use std::path::PathBuf;

use helmet_core::{LoadedChart, Values, parse_set_values};

use crate::error::{CliError, Result};

/// Chart values.yaml, then each `-f` file in order, then `--set` in order
///
/// Built-in defaults are layered underneath by the renderer.
pub fn layered_values(
    chart: &LoadedChart,
    values_files: &[PathBuf],
    set_values: &[String],
) -> Result<Values> {
    let mut values = chart.values.clone();

    for values_file in values_files {
        let file_values = Values::from_file(values_file).map_err(|e| CliError::Io {
            message: format!("failed to load values file {}: {}", values_file.display(), e),
        })?;
        values.merge(&file_values);
        tracing::debug!(file = %values_file.display(), "merged values file");
    }

    if !set_values.is_empty() {
        values.merge(&parse_set_values(set_values)?);
        tracing::debug!(count = set_values.len(), "applied --set values");
    }

    Ok(values)
}

/// Pick the singular or plural form of a word
#[must_use]
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
