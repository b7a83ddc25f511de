//! "Did you mean" hints for mistyped names
//!
//! Uses Levenshtein distance to find the closest known name.

/// Maximum distance still considered a typo
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Closest candidate to `input`, if any is close enough
pub fn closest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Help text for an unknown name: a suggestion when one is close, then the full list
pub fn unknown_help(input: &str, candidates: &[&str]) -> String {
    let allowed = candidates
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ");
    match closest(input, candidates) {
        Some(suggestion) => format!("did you mean `{}`? allowed values: {}", suggestion, allowed),
        None => format!("allowed values: {}", allowed),
    }
}

/// Top-level keys of a values tree that no known key resembles exactly
///
/// Returns `(unknown, suggestion)` pairs in key order.
pub fn unknown_keys<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    known: &[&str],
) -> Vec<(String, Option<String>)> {
    keys.into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| (key.to_string(), closest(key, known).map(str::to_string)))
        .collect()
}
