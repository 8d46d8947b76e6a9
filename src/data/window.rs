use super::model::AlignedSeries;

// ---------------------------------------------------------------------------
// Plotted time window
// ---------------------------------------------------------------------------

/// The horizontal extent of a figure: a start instant and an optional length.
///
/// X coordinates are minutes elapsed since `start`.  Without a duration the
/// window is open-ended and only drops samples before the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: i64,
    pub duration_minutes: Option<u32>,
}

impl TimeWindow {
    pub fn new(start: i64, duration_minutes: Option<u32>) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    pub fn elapsed_minutes(&self, timestamp: i64) -> f64 {
        (timestamp - self.start) as f64 / 60.0
    }

    /// Last visible instant, if the window is bounded.
    pub fn end(&self) -> Option<i64> {
        self.duration_minutes
            .map(|m| self.start + i64::from(m) * 60)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && self.end().map_or(true, |end| timestamp <= end)
    }

    /// Continuous line segments of a series in (minutes, value) coordinates.
    /// Segments break at missing values and at the window edges.
    pub fn segments(&self, series: &AlignedSeries) -> Vec<Vec<(f64, f64)>> {
        self.segments_of(series.points.iter().map(|p| (p.timestamp, p.value)))
    }

    pub fn segments_of(
        &self,
        points: impl IntoIterator<Item = (i64, Option<f64>)>,
    ) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();
        for (ts, value) in points {
            match value.filter(|_| self.contains(ts)) {
                Some(v) => current.push((self.elapsed_minutes(ts), v)),
                None if !current.is_empty() => out.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// Raw samples inside the window, in (minutes, value) coordinates.
    pub fn points(&self, samples: &[(i64, f64)]) -> Vec<(f64, f64)> {
        samples
            .iter()
            .filter(|(ts, _)| self.contains(*ts))
            .map(|&(ts, v)| (self.elapsed_minutes(ts), v))
            .collect()
    }
}
