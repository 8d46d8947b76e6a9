use std::path::PathBuf;

use crate::error::LoadError;

/// Placeholder substituted by [`expand_percentile`].
pub const PERCENTILE_PLACEHOLDER: &str = "{percentile}";

/// Expand a glob pattern into the matching files, sorted by path.
///
/// Zero matches is not an error; an unreadable directory entry is logged and skipped.
pub fn resolve(pattern: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = glob::glob(pattern).map_err(|source| LoadError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                log::warn!("skipping unreadable match for '{pattern}': {e}");
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Fill a `{percentile}` template, e.g. `latency_{percentile}_120s_1.csv` → `latency_p99_120s_1.csv`.
pub fn expand_percentile(template: &str, percentile: &str) -> String {
    template.replace(PERCENTILE_PLACEHOLDER, percentile)
}
