//! File-level entry points: resolve a pattern, load what matches, align it.
//!
//! Every function here degrades to "no data" instead of failing: a missing
//! pattern or a malformed file is logged and the caller simply omits the series.

use super::discover;
use super::loader::load_file;
use super::model::{AlignedSeries, AlignedTable, SampleFrame};
use super::resample::{self, InstanceNaming};

/// Load every readable file matching `pattern`.  Problems are logged, never returned.
pub fn load_matching(pattern: &str) -> Vec<SampleFrame> {
    let paths = match discover::resolve(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            log::warn!("{e}");
            return Vec::new();
        }
    };
    if paths.is_empty() {
        log::warn!("no files found for pattern: {pattern}");
        return Vec::new();
    }

    paths
        .iter()
        .filter_map(|path| match load_file(path) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                None
            }
        })
        .collect()
}

/// Collapse mode: one mean series over every instance matching `pattern`.
pub fn collapse(pattern: &str, smooth: bool) -> Option<AlignedSeries> {
    let frames = load_matching(pattern);
    let series = resample::collapse_frames(&frames, smooth);
    if series.is_none() && !frames.is_empty() {
        log::warn!("no numeric samples for pattern: {pattern}");
    }
    series
}

/// Pivot mode: one forward-filled column per instance matching `pattern`.
pub fn pivot(pattern: &str, naming: &InstanceNaming) -> Option<AlignedTable> {
    let frames = load_matching(pattern);
    let table = resample::pivot_frames(&frames, naming);
    if table.is_none() && !frames.is_empty() {
        log::warn!("no numeric samples for pattern: {pattern}");
    }
    table
}

/// Raw samples of every file matching `pattern`, sorted by time, not resampled.
pub fn raw(pattern: &str) -> Option<Vec<(i64, f64)>> {
    let rows = resample::concat_sorted(&load_matching(pattern));
    (!rows.is_empty()).then_some(rows)
}
