//! One-second resampling and the two aggregation modes built on it.

use std::collections::BTreeMap;

use regex::Regex;

use super::model::{
    AlignedSeries, AlignedTable, InstanceId, JoinedRows, NodeRole, RawSample, SampleFrame,
    SeriesPoint,
};

/// Trailing window (in one-second samples) used when a series asks for smoothing.
pub const SMOOTHING_WINDOW: usize = 10;

/// Longest first-to-last span (seconds) a set of files may cover before it is
/// rejected instead of densified.  Seven days.
pub const MAX_SPAN_SECONDS: i64 = 7 * 24 * 3600;

/// Running sum/count for one bucket.
#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    sum: f64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn bucketize(samples: impl IntoIterator<Item = (i64, f64)>) -> BTreeMap<i64, Bucket> {
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for (ts, v) in samples {
        buckets.entry(ts).or_default().add(v);
    }
    buckets
}

fn span(buckets: &BTreeMap<i64, Bucket>) -> Option<(i64, i64)> {
    Some((*buckets.keys().next()?, *buckets.keys().next_back()?))
}

/// `false` (with a warning) when `first..=last` is too wide to lay out second
/// by second, which usually means a stray timestamp in one of the files.
fn span_fits(first: i64, last: i64, what: &str) -> bool {
    let width = last.saturating_sub(first);
    if width > MAX_SPAN_SECONDS {
        log::warn!(
            "{what}: samples span {width} s ({first}..{last}), more than {MAX_SPAN_SECONDS} s; skipping"
        );
        return false;
    }
    true
}

/// Mean of every sample falling in each second, spanning first to last
/// sample with `None` for empty seconds.
pub fn resample_mean(samples: impl IntoIterator<Item = (i64, f64)>) -> AlignedSeries {
    let buckets = bucketize(samples);
    let Some((first, last)) = span(&buckets) else {
        return AlignedSeries::default();
    };
    let points = (first..=last)
        .map(|timestamp| SeriesPoint {
            timestamp,
            value: buckets.get(&timestamp).and_then(Bucket::mean),
        })
        .collect();
    AlignedSeries::new(points)
}

/// Average several aligned series second by second.  A second where no input
/// has a value stays `None`.
pub fn mean_across(series: &[AlignedSeries]) -> AlignedSeries {
    let first = series.iter().filter_map(AlignedSeries::first_timestamp).min();
    let last = series.iter().filter_map(AlignedSeries::last_timestamp).max();
    let (Some(first), Some(last)) = (first, last) else {
        return AlignedSeries::default();
    };

    let points = (first..=last)
        .map(|timestamp| {
            let mut bucket = Bucket::default();
            for s in series {
                if let Some(v) = s.value_at(timestamp) {
                    bucket.add(v);
                }
            }
            SeriesPoint {
                timestamp,
                value: bucket.mean(),
            }
        })
        .collect();
    AlignedSeries::new(points)
}

/// Carry the last present value forward over gaps.  Points before the first
/// value stay `None`.
pub fn forward_fill(series: &AlignedSeries) -> AlignedSeries {
    let mut carried = None;
    let points = series
        .points
        .iter()
        .map(|p| {
            if p.value.is_some() {
                carried = p.value;
            }
            SeriesPoint {
                timestamp: p.timestamp,
                value: carried,
            }
        })
        .collect();
    AlignedSeries::new(points)
}

/// Trailing moving average.  A point is `None` until `window` samples are
/// available, and whenever the window contains a missing value.
pub fn smooth_trailing(series: &AlignedSeries, window: usize) -> AlignedSeries {
    if window <= 1 {
        return series.clone();
    }
    let points = series
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = if i + 1 < window {
                None
            } else {
                series.points[i + 1 - window..=i]
                    .iter()
                    .map(|q| q.value)
                    .sum::<Option<f64>>()
                    .map(|sum| sum / window as f64)
            };
            SeriesPoint {
                timestamp: p.timestamp,
                value,
            }
        })
        .collect();
    AlignedSeries::new(points)
}

// ---------------------------------------------------------------------------
// Collapse mode
// ---------------------------------------------------------------------------

/// Collapse every sample of `frames` into one mean series.
///
/// When any frame carries a `labels` column the samples are grouped by label
/// (rows without one are grouped by their file stem), each group is resampled
/// on its own, forward-filled across its own span and the groups are averaged.
/// Otherwise the combined samples are resampled and forward-filled directly.
/// Returns `None` when there is nothing to aggregate or the samples span more
/// than [`MAX_SPAN_SECONDS`].
pub fn collapse_frames(frames: &[SampleFrame], smooth: bool) -> Option<AlignedSeries> {
    let mut rows: Vec<(&SampleFrame, &RawSample)> = frames
        .iter()
        .flat_map(|f| f.samples.iter().map(move |s| (f, s)))
        .collect();
    if rows.is_empty() {
        return None;
    }
    rows.sort_by_key(|(_, s)| s.timestamp);
    let first = rows[0].1.timestamp;
    let last = rows[rows.len() - 1].1.timestamp;
    if !span_fits(first, last, "collapse") {
        return None;
    }

    let series = if frames.iter().any(|f| f.has_labels) {
        let mut groups: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
        for (frame, sample) in &rows {
            let key = sample.label.clone().unwrap_or_else(|| frame.stem());
            groups
                .entry(key)
                .or_default()
                .push((sample.timestamp, sample.value));
        }
        let per_label: Vec<AlignedSeries> = groups
            .into_values()
            .map(|rows| forward_fill(&resample_mean(rows)))
            .collect();
        mean_across(&per_label)
    } else {
        forward_fill(&resample_mean(
            rows.iter().map(|(_, s)| (s.timestamp, s.value)),
        ))
    };

    Some(if smooth {
        smooth_trailing(&series, SMOOTHING_WINDOW)
    } else {
        series
    })
}

// ---------------------------------------------------------------------------
// Pivot mode
// ---------------------------------------------------------------------------

/// How pivot mode names the instance a file (or row) belongs to.
#[derive(Debug, Clone)]
pub enum InstanceNaming {
    /// First capture group of the regex applied to the `labels` cell.
    LabelCapture(Regex),
    /// Every row of the file belongs to a node with a known role.
    Role(NodeRole),
    /// Use the file name without extension.
    FileStem,
}

impl InstanceNaming {
    /// Capture the address out of labels such as `instance="10.0.0.7:9100"`.
    pub fn instance_address() -> Self {
        // Constant pattern; cannot fail to compile.
        InstanceNaming::LabelCapture(
            Regex::new(r#"instance="?([^",}\s]+)"#).expect("valid instance regex"),
        )
    }

    /// Resolve the instance of one sample.  Falls back to the file stem when a
    /// label capture does not apply.
    pub fn instance_for(&self, frame: &SampleFrame, sample: &RawSample) -> InstanceId {
        match self {
            InstanceNaming::LabelCapture(re) => sample
                .label
                .as_deref()
                .and_then(|l| re.captures(l))
                .and_then(|c| c.get(1).or_else(|| c.get(0)))
                .map(|m| InstanceId(m.as_str().to_string()))
                .unwrap_or_else(|| InstanceId(frame.stem())),
            InstanceNaming::Role(role) => InstanceId(role.to_string()),
            InstanceNaming::FileStem => InstanceId(frame.stem()),
        }
    }
}

/// Pivot `frames` into one column per instance on a shared one-second axis,
/// forward-filling each column after its first sample.
pub fn pivot_frames(frames: &[SampleFrame], naming: &InstanceNaming) -> Option<AlignedTable> {
    let mut per_instance: BTreeMap<InstanceId, BTreeMap<i64, Bucket>> = BTreeMap::new();
    for frame in frames {
        for sample in &frame.samples {
            per_instance
                .entry(naming.instance_for(frame, sample))
                .or_default()
                .entry(sample.timestamp)
                .or_default()
                .add(sample.value);
        }
    }

    let first = per_instance.values().filter_map(|b| span(b)).map(|s| s.0).min()?;
    let last = per_instance.values().filter_map(|b| span(b)).map(|s| s.1).max()?;
    if !span_fits(first, last, "pivot") {
        return None;
    }
    let timestamps: Vec<i64> = (first..=last).collect();

    let columns = per_instance
        .into_iter()
        .map(|(id, buckets)| {
            let mut carried = None;
            let column = timestamps
                .iter()
                .map(|ts| {
                    if let Some(v) = buckets.get(ts).and_then(Bucket::mean) {
                        carried = Some(v);
                    }
                    carried
                })
                .collect();
            (id, column)
        })
        .collect();

    Some(AlignedTable {
        timestamps,
        columns,
    })
}

// ---------------------------------------------------------------------------
// Raw series helpers
// ---------------------------------------------------------------------------

/// All samples of `frames`, concatenated and sorted by timestamp (stable).
pub fn concat_sorted(frames: &[SampleFrame]) -> Vec<(i64, f64)> {
    let mut rows: Vec<(i64, f64)> = frames
        .iter()
        .flat_map(|f| f.samples.iter().map(|s| (s.timestamp, s.value)))
        .collect();
    rows.sort_by_key(|(ts, _)| *ts);
    rows
}

/// Outer-join named raw series on exact timestamps.  Duplicate timestamps
/// within one series keep the last value.
pub fn outer_join(columns: &[(String, Vec<(i64, f64)>)]) -> JoinedRows {
    let width = columns.len();
    let mut rows: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
    for (idx, (_, samples)) in columns.iter().enumerate() {
        for &(ts, v) in samples {
            rows.entry(ts).or_insert_with(|| vec![None; width])[idx] = Some(v);
        }
    }
    JoinedRows {
        names: columns.iter().map(|(n, _)| n.clone()).collect(),
        rows: rows.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, samples: Vec<RawSample>) -> SampleFrame {
        let has_labels = samples.iter().any(|s| s.label.is_some());
        SampleFrame::new(format!("/data/{name}.csv"), samples, has_labels)
    }

    fn values(series: &AlignedSeries) -> Vec<Option<f64>> {
        series.points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn resample_averages_buckets_and_leaves_gaps_empty() {
        let s = resample_mean(vec![(10, 1.0), (10, 3.0), (13, 5.0)]);
        assert_eq!(s.first_timestamp(), Some(10));
        assert_eq!(values(&s), vec![Some(2.0), None, None, Some(5.0)]);
    }

    #[test]
    fn resample_is_idempotent_on_aligned_input() {
        let once = resample_mean((0..20).map(|t| (100 + t, t as f64 * 0.5)));
        let twice = resample_mean(once.present());
        assert_eq!(once, twice);
    }

    #[test]
    fn resample_of_nothing_is_empty() {
        assert!(resample_mean(Vec::new()).is_empty());
    }

    #[test]
    fn collapse_means_over_labels_present_each_second() {
        let f = frame(
            "cpu_1",
            vec![
                RawSample::labelled(0, 10.0, "a"),
                RawSample::labelled(0, 20.0, "b"),
                RawSample::labelled(1, 30.0, "a"),
                RawSample::labelled(2, 40.0, "b"),
            ],
        );
        let s = collapse_frames(&[f], false).unwrap();
        // second 1: "b" carries 20 forward; second 2 is past the end of "a".
        assert_eq!(values(&s), vec![Some(15.0), Some(25.0), Some(40.0)]);
    }

    #[test]
    fn collapse_without_labels_resamples_combined_rows() {
        let a = frame("w_1", vec![RawSample::new(5, 1.0), RawSample::new(6, 1.0)]);
        let b = frame("w_2", vec![RawSample::new(5, 3.0)]);
        let s = collapse_frames(&[a, b], false).unwrap();
        assert_eq!(values(&s), vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn collapse_groups_unlabelled_rows_by_file() {
        let labelled = frame("w_1", vec![RawSample::labelled(0, 2.0, "pod")]);
        let plain = frame("w_2", vec![RawSample::new(0, 4.0), RawSample::new(0, 8.0)]);
        let s = collapse_frames(&[labelled, plain], false).unwrap();
        // mean of pod (2) and w_2's own bucket mean (6)
        assert_eq!(values(&s), vec![Some(4.0)]);
    }

    #[test]
    fn collapse_fills_sparse_samples_between_observations() {
        let f = frame(
            "net_1",
            vec![RawSample::new(0, 2.0), RawSample::new(60, 4.0)],
        );
        let s = collapse_frames(&[f], false).unwrap();
        assert_eq!(s.len(), 61);
        assert_eq!(s.value_at(30), Some(2.0));
        assert_eq!(s.value_at(60), Some(4.0));
    }

    #[test]
    fn forward_fill_leaves_leading_gap() {
        let s = resample_mean(vec![(0, 1.0), (3, 5.0)]);
        let shifted = AlignedSeries::new(
            std::iter::once(SeriesPoint {
                timestamp: -1,
                value: None,
            })
            .chain(s.points)
            .collect(),
        );
        assert_eq!(
            values(&forward_fill(&shifted)),
            vec![None, Some(1.0), Some(1.0), Some(1.0), Some(5.0)]
        );
    }

    #[test]
    fn outlier_timestamp_skips_instead_of_densifying() {
        let f = frame(
            "cpu_1",
            vec![RawSample::new(0, 1.0), RawSample::new(1_700_000_000, 2.0)],
        );
        assert!(collapse_frames(std::slice::from_ref(&f), true).is_none());
        assert!(pivot_frames(&[f], &InstanceNaming::FileStem).is_none());
    }

    #[test]
    fn collapse_of_empty_frames_is_none() {
        assert!(collapse_frames(&[], false).is_none());
        assert!(collapse_frames(&[frame("x", vec![])], true).is_none());
    }

    #[test]
    fn smoothing_constant_series_settles_at_tenth_sample() {
        let s = resample_mean((0..30).map(|t| (t, 7.5)));
        let smoothed = smooth_trailing(&s, SMOOTHING_WINDOW);
        for (i, p) in smoothed.points.iter().enumerate() {
            if i + 1 < SMOOTHING_WINDOW {
                assert_eq!(p.value, None);
            } else {
                assert!((p.value.unwrap() - 7.5).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn smoothing_window_with_gap_is_missing() {
        let s = resample_mean(vec![(0, 1.0), (1, 1.0), (3, 1.0), (4, 1.0)]);
        let smoothed = smooth_trailing(&s, 2);
        assert_eq!(
            values(&smoothed),
            vec![None, Some(1.0), None, None, Some(1.0)]
        );
    }

    #[test]
    fn pivot_forward_fills_after_first_sample() {
        let a = frame("node_a", vec![RawSample::new(0, 1.0), RawSample::new(3, 4.0)]);
        let b = frame("node_b", vec![RawSample::new(2, 9.0), RawSample::new(2, 11.0)]);
        let table = pivot_frames(&[a, b], &InstanceNaming::FileStem).unwrap();

        assert_eq!(table.timestamps, vec![0, 1, 2, 3]);
        assert_eq!(
            table.column("node_a").unwrap(),
            &[Some(1.0), Some(1.0), Some(1.0), Some(4.0)]
        );
        assert_eq!(table.column("node_b").unwrap(), &[None, None, Some(10.0), Some(10.0)]);
    }

    #[test]
    fn pivot_extracts_instance_address_from_labels() {
        let f = frame(
            "workers",
            vec![
                RawSample::labelled(0, 1.0, r#"{instance="10.0.0.1:9100", job="node"}"#),
                RawSample::labelled(0, 2.0, "instance=10.0.0.2:9100"),
                RawSample::new(0, 3.0),
            ],
        );
        let table = pivot_frames(&[f], &InstanceNaming::instance_address()).unwrap();
        let ids: Vec<_> = table.instances().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["10.0.0.1:9100", "10.0.0.2:9100", "workers"]);
    }

    #[test]
    fn pivot_role_names_every_row() {
        let f = frame("anything", vec![RawSample::labelled(0, 1.0, "x")]);
        let table = pivot_frames(&[f], &InstanceNaming::Role(NodeRole::Broker(2))).unwrap();
        assert!(table.column("broker-2").is_some());
        assert_eq!(table.width(), 1);
    }

    #[test]
    fn pivot_of_nothing_is_none() {
        assert!(pivot_frames(&[], &InstanceNaming::FileStem).is_none());
    }

    #[test]
    fn outer_join_merges_on_timestamp() {
        let joined = outer_join(&[
            ("p50".to_string(), vec![(1, 0.1), (2, 0.2)]),
            ("p99".to_string(), vec![(2, 0.9), (3, 1.0)]),
        ]);
        assert_eq!(
            joined.rows,
            vec![
                (1, vec![Some(0.1), None]),
                (2, vec![Some(0.2), Some(0.9)]),
                (3, vec![None, Some(1.0)]),
            ]
        );
        assert_eq!(joined.column("p99").unwrap()[0], (1, None));
    }

    #[test]
    fn concat_sorted_orders_across_files() {
        let a = frame("a", vec![RawSample::new(5, 1.0)]);
        let b = frame("b", vec![RawSample::new(2, 2.0), RawSample::new(9, 3.0)]);
        assert_eq!(concat_sorted(&[a, b]), vec![(2, 2.0), (5, 1.0), (9, 3.0)]);
    }
}
