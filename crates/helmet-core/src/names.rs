//! Kubernetes name helpers
//!
//! Object names and label values are limited to 63 characters by the DNS
//! label rules. Every helper here truncates and strips trailing dashes so the
//! result stays valid when the cut lands right after a separator.

use crate::chart::Chart;
use crate::release::ReleaseInfo;
use crate::values::Values;

/// Maximum length of a DNS-1123 label
pub const MAX_NAME_LEN: usize = 63;

/// Truncate to 63 bytes (on a char boundary) and strip trailing '-'
pub fn trunc63(s: &str) -> String {
    let mut end = s.len().min(MAX_NAME_LEN);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim_end_matches('-').to_string()
}

fn string_at<'a>(values: &'a Values, path: &str) -> Option<&'a str> {
    values
        .get(path)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Chart name, or `nameOverride`
pub fn name(chart: &Chart, values: &Values) -> String {
    trunc63(string_at(values, "nameOverride").unwrap_or(chart.name.as_str()))
}

/// Fully qualified app name
///
/// `fullnameOverride` wins. Otherwise the release name is used alone when it
/// already contains the chart name, and `<release>-<name>` when it does not.
pub fn fullname(chart: &Chart, release: &ReleaseInfo, values: &Values) -> String {
    if let Some(full) = string_at(values, "fullnameOverride") {
        return trunc63(full);
    }

    let name = string_at(values, "nameOverride").unwrap_or(chart.name.as_str());
    if release.name.contains(name) {
        trunc63(&release.name)
    } else {
        trunc63(&format!("{}-{}", release.name, name))
    }
}

/// Value of the `helm.sh/chart` label
pub fn chart_label(chart: &Chart) -> String {
    trunc63(&format!("{}-{}", chart.name, chart.version).replace('+', "_"))
}

/// Name of a secondary object, e.g. `<fullname>-metrics`
pub fn component_name(fullname: &str, suffix: &str) -> String {
    trunc63(&format!("{}-{}", fullname, suffix))
}

/// Target namespace, or `namespaceOverride`
pub fn namespace(release: &ReleaseInfo, values: &Values) -> String {
    string_at(values, "namespaceOverride")
        .unwrap_or(release.namespace.as_str())
        .to_string()
}

/// Service account the pods run as
pub fn service_account_name(chart: &Chart, release: &ReleaseInfo, values: &Values) -> String {
    let explicit = string_at(values, "serviceAccount.name");
    if values.is_enabled("serviceAccount.create") {
        explicit
            .map(trunc63)
            .unwrap_or_else(|| fullname(chart, release, values))
    } else {
        explicit.unwrap_or("default").to_string()
    }
}
