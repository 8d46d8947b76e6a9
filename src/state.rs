use crate::config::{FigureSpec, PanelKind, PanelSpec, SeriesSource, YFormat};
use crate::data::aligner;
use crate::data::discover::{self, expand_percentile};
use crate::data::loader::load_file;
use crate::data::resample::outer_join;
use crate::data::window::TimeWindow;
use crate::error::ReportError;

// ---------------------------------------------------------------------------
// Resolved panel data
// ---------------------------------------------------------------------------

/// One legend entry drawn as a (possibly broken) line, x in elapsed minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub label: String,
    pub segments: Vec<Vec<(f64, f64)>>,
}

/// One legend entry drawn as bars at (minute, height).
#[derive(Debug, Clone, PartialEq)]
pub struct BarData {
    pub label: String,
    pub bars: Vec<(f64, f64)>,
}

/// A panel with everything the renderer needs and nothing it has to load.
#[derive(Debug, Clone)]
pub struct ResolvedPanel {
    pub title: String,
    pub y_label: String,
    pub y_range: Option<(f64, f64)>,
    pub y_format: YFormat,
    pub lines: Vec<LineData>,
    pub bars: Vec<BarData>,
}

impl ResolvedPanel {
    fn empty(spec: &PanelSpec) -> Self {
        Self {
            title: spec.title.clone(),
            y_label: spec.y_label.clone(),
            y_range: spec.y_range,
            y_format: spec.y_format,
            lines: Vec::new(),
            bars: Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.lines.is_empty() || !self.bars.is_empty()
    }

    fn xy(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let lines = self.lines.iter().flat_map(|l| l.segments.iter().flatten());
        let bars = self.bars.iter().flat_map(|b| b.bars.iter());
        lines.chain(bars).copied()
    }

    /// Smallest and largest x over all drawn data.
    pub fn x_extent(&self) -> Option<(f64, f64)> {
        extent(self.xy().map(|(x, _)| x))
    }

    /// Smallest and largest y over all drawn data (bars always include zero).
    pub fn y_extent(&self) -> Option<(f64, f64)> {
        let zero = (!self.bars.is_empty()).then_some(0.0);
        extent(self.xy().map(|(_, y)| y).chain(zero))
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// ---------------------------------------------------------------------------
// Report state
// ---------------------------------------------------------------------------

/// A figure with every panel resolved against the files on disk.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub window: TimeWindow,
    pub panels: Vec<ResolvedPanel>,
    /// Human-readable names of series that had no data.
    pub omitted: Vec<String>,
}

impl ReportState {
    /// Resolve `figure`: find time zero, then align every series.
    ///
    /// Only a missing or unusable start reference is fatal; any other missing
    /// series is recorded in `omitted` and its panel is drawn without it.
    pub fn resolve(figure: &FigureSpec) -> Result<Self, ReportError> {
        let start = start_timestamp(&figure.start_reference)?;
        let window = TimeWindow::new(start, figure.duration_minutes);
        log::info!(
            "time zero {start} from {} (window: {})",
            figure.start_reference,
            figure
                .duration_minutes
                .map_or_else(|| "data extent".to_string(), |m| format!("{m} min"))
        );

        let mut omitted = Vec::new();
        let panels = figure
            .panels
            .iter()
            .map(|spec| resolve_panel(spec, &window, &mut omitted))
            .collect();

        Ok(Self {
            window,
            panels,
            omitted,
        })
    }

    /// Rightmost x of the figure: the window length, or the widest panel's data.
    pub fn x_max(&self) -> f64 {
        match self.window.duration_minutes {
            Some(m) => f64::from(m),
            None => self
                .panels
                .iter()
                .filter_map(|p| p.x_extent().map(|(_, hi)| hi))
                .fold(0.0, f64::max),
        }
    }
}

/// Earliest timestamp of the first file matching `pattern`.
pub fn start_timestamp(pattern: &str) -> Result<i64, ReportError> {
    let first = discover::resolve(pattern)
        .ok()
        .and_then(|paths| paths.into_iter().next())
        .ok_or_else(|| ReportError::MissingStartFile(pattern.to_string()))?;

    let frame = load_file(&first).map_err(|source| ReportError::UnreadableStartFile {
        path: first.clone(),
        source,
    })?;
    frame
        .min_timestamp()
        .ok_or(ReportError::EmptyStartFile(first))
}

fn resolve_panel(
    spec: &PanelSpec,
    window: &TimeWindow,
    omitted: &mut Vec<String>,
) -> ResolvedPanel {
    let mut panel = ResolvedPanel::empty(spec);

    match &spec.kind {
        PanelKind::Lines(series) => {
            for s in series {
                let before = panel.lines.len();
                match &s.source {
                    SeriesSource::Collapse { smooth } => {
                        if let Some(aligned) = aligner::collapse(&s.pattern, *smooth) {
                            panel.lines.push(LineData {
                                label: s.label.clone(),
                                segments: window.segments(&aligned),
                            });
                        }
                    }
                    SeriesSource::Raw => {
                        let visible = aligner::raw(&s.pattern)
                            .map(|rows| window.points(&rows))
                            .filter(|points| !points.is_empty());
                        if let Some(points) = visible {
                            panel.lines.push(LineData {
                                label: s.label.clone(),
                                segments: vec![points],
                            });
                        }
                    }
                    SeriesSource::Pivot(naming) => {
                        if let Some(table) = aligner::pivot(&s.pattern, naming) {
                            let single = table.width() == 1;
                            for id in table.instances() {
                                let column = table.series(id).unwrap_or_default();
                                let label = if single {
                                    s.label.clone()
                                } else {
                                    format!("{} {id}", s.label)
                                };
                                panel.lines.push(LineData {
                                    label,
                                    segments: window.segments(&column),
                                });
                            }
                        }
                    }
                }
                if panel.lines.len() == before {
                    omitted.push(format!("{}: {}", spec.title, s.label));
                }
            }
        }
        PanelKind::LatencyBars {
            template,
            percentiles,
        } => {
            let loaded: Option<Vec<(String, Vec<(i64, f64)>)>> = percentiles
                .iter()
                .map(|p| {
                    aligner::raw(&expand_percentile(template, p)).map(|rows| (p.clone(), rows))
                })
                .collect();

            match loaded {
                Some(columns) => {
                    let joined = outer_join(&columns);
                    for name in &joined.names {
                        let bars = joined
                            .column(name)
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|(ts, _)| window.contains(*ts))
                            .filter_map(|(ts, v)| Some((window.elapsed_minutes(ts), v?)))
                            .collect();
                        panel.bars.push(BarData {
                            label: name.clone(),
                            bars,
                        });
                    }
                }
                None => {
                    log::warn!("latency chart skipped: not every percentile has data");
                    omitted.push(format!("{}: {}", spec.title, percentiles.join("/")));
                }
            }
        }
    }

    panel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(lines: Vec<LineData>, bars: Vec<BarData>) -> ResolvedPanel {
        ResolvedPanel {
            title: "t".into(),
            y_label: "y".into(),
            y_range: None,
            y_format: YFormat::Plain,
            lines,
            bars,
        }
    }

    #[test]
    fn extents_cover_lines_and_bars() {
        let p = panel(
            vec![LineData {
                label: "a".into(),
                segments: vec![vec![(1.0, 5.0)], vec![(3.0, 7.0)]],
            }],
            vec![BarData {
                label: "p99".into(),
                bars: vec![(4.0, 2.0)],
            }],
        );
        assert_eq!(p.x_extent(), Some((1.0, 4.0)));
        assert_eq!(p.y_extent(), Some((0.0, 7.0)));
    }

    #[test]
    fn empty_panel_has_no_extent() {
        let p = panel(vec![], vec![]);
        assert!(!p.has_data());
        assert_eq!(p.x_extent(), None);
        assert_eq!(p.y_extent(), None);
    }

    #[test]
    fn missing_start_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/missing_*.csv", dir.path().display());
        assert!(matches!(
            start_timestamp(&pattern),
            Err(ReportError::MissingStartFile(p)) if p == pattern
        ));
    }

    #[test]
    fn empty_start_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("first.csv");
        std::fs::write(&path, "timestamp,value\n").unwrap();
        assert!(matches!(
            start_timestamp(path.to_str().unwrap()),
            Err(ReportError::EmptyStartFile(_))
        ));
    }
}
