use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RawSample – one row of an input file
// ---------------------------------------------------------------------------

/// A single observation as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Seconds since the Unix epoch (fractional input is floored).
    pub timestamp: i64,
    pub value: f64,
    /// Contents of the `labels` column, if the file has one and the cell is non-empty.
    pub label: Option<String>,
}

impl RawSample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            label: None,
        }
    }

    pub fn labelled(timestamp: i64, value: f64, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            label: Some(label.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// SampleFrame – everything read from one file
// ---------------------------------------------------------------------------

/// The samples of one input file plus where they came from.
#[derive(Debug, Clone)]
pub struct SampleFrame {
    pub source: PathBuf,
    pub samples: Vec<RawSample>,
    /// Whether the file declared a `labels` column at all.
    pub has_labels: bool,
    /// Rows discarded because `value` was not numeric.
    pub dropped: usize,
}

impl SampleFrame {
    pub fn new(source: impl Into<PathBuf>, samples: Vec<RawSample>, has_labels: bool) -> Self {
        Self {
            source: source.into(),
            samples,
            has_labels,
            dropped: 0,
        }
    }

    /// File name without directory or extension, used as a fallback instance name.
    pub fn stem(&self) -> String {
        file_stem(&self.source)
    }

    /// Earliest timestamp in the frame.
    pub fn min_timestamp(&self) -> Option<i64> {
        self.samples.iter().map(|s| s.timestamp).min()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// AlignedSeries – one value per second
// ---------------------------------------------------------------------------

/// A point on the one-second grid. `None` means no sample fell in the bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

/// A series with strictly increasing timestamps spaced one second apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    pub points: Vec<SeriesPoint>,
}

impl AlignedSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[1].timestamp == w[0].timestamp + 1));
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Value at an exact second, if it is on the grid and present.
    pub fn value_at(&self, timestamp: i64) -> Option<f64> {
        let first = self.first_timestamp()?;
        let idx = usize::try_from(timestamp - first).ok()?;
        self.points.get(idx).and_then(|p| p.value)
    }

    /// Iterate over the points that carry a value.
    pub fn present(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.timestamp, v)))
    }
}

// ---------------------------------------------------------------------------
// InstanceId / NodeRole
// ---------------------------------------------------------------------------

/// Name of one monitored instance (a pod address, a role name or a file stem).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Role a monitored node plays in the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Manager,
    Broker(u32),
    Worker,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Manager => write!(f, "manager"),
            NodeRole::Broker(n) => write!(f, "broker-{n}"),
            NodeRole::Worker => write!(f, "worker"),
        }
    }
}

// ---------------------------------------------------------------------------
// AlignedTable – one forward-filled column per instance
// ---------------------------------------------------------------------------

/// Per-instance columns on a shared, contiguous one-second axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    pub timestamps: Vec<i64>,
    /// Each column has exactly `timestamps.len()` entries.
    pub columns: BTreeMap<InstanceId, Vec<Option<f64>>>,
}

impl AlignedTable {
    pub fn instances(&self) -> impl Iterator<Item = &InstanceId> {
        self.columns.keys()
    }

    pub fn column(&self, id: &str) -> Option<&[Option<f64>]> {
        self.columns
            .get(&InstanceId::from(id))
            .map(|c| c.as_slice())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// View one column as an `AlignedSeries` sharing the table's axis.
    pub fn series(&self, id: &InstanceId) -> Option<AlignedSeries> {
        let column = self.columns.get(id)?;
        Some(AlignedSeries::new(
            self.timestamps
                .iter()
                .zip(column)
                .map(|(&timestamp, &value)| SeriesPoint { timestamp, value })
                .collect(),
        ))
    }
}

// ---------------------------------------------------------------------------
// JoinedRows – raw series merged on exact timestamps
// ---------------------------------------------------------------------------

/// Several raw series outer-joined on their timestamps (no resampling).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedRows {
    pub names: Vec<String>,
    /// `(timestamp, one value slot per name)`, sorted by timestamp.
    pub rows: Vec<(i64, Vec<Option<f64>>)>,
}

impl JoinedRows {
    pub fn column(&self, name: &str) -> Option<Vec<(i64, Option<f64>)>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|(ts, vals)| (*ts, vals[idx])).collect())
    }
}
