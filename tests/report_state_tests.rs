//! Resolving whole figures against a results directory.

use std::fs;
use std::path::Path;

use clap::Parser;
use stream_plots::app;
use stream_plots::cli::{Cli, Command};
use stream_plots::config::{
    self, FigureSpec, OutputTarget, PanelKind, PanelSpec, SeriesSpec, YFormat,
};
use stream_plots::error::ReportError;
use stream_plots::state::ReportState;

const T0: i64 = 1_700_000_000;

fn write_series(dir: &Path, name: &str, start: i64, minutes: i64, value: f64) {
    let mut body = String::from("timestamp,value\n");
    for m in 0..=minutes {
        body.push_str(&format!("{},{value}\n", start + m * 60));
    }
    fs::write(dir.join(name), body).unwrap();
}

fn figure(dir: &Path, panels: Vec<PanelSpec>, duration: Option<u32>) -> FigureSpec {
    FigureSpec {
        title: None,
        grid: (panels.len(), 1),
        size_px: (800, 600),
        panels,
        start_reference: format!("{}/start_*.csv", dir.display()),
        duration_minutes: duration,
        output: OutputTarget {
            dir: dir.join("plots"),
            name: "report".to_string(),
        },
    }
}

#[test]
fn missing_series_is_omitted_but_others_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "start_1.csv", T0, 10, 1.0);
    write_series(d, "cpu_1.csv", T0 + 60, 5, 30.0);

    let panels = vec![
        PanelSpec::lines(
            "CPU",
            "%",
            vec![
                SeriesSpec::collapse("Workers", format!("{}/cpu_*.csv", d.display()), false),
                SeriesSpec::collapse("Manager", format!("{}/manager_*.csv", d.display()), false),
            ],
        ),
        PanelSpec::lines(
            "Memory",
            "GB",
            vec![SeriesSpec::collapse(
                "Workers",
                format!("{}/mem_*.csv", d.display()),
                false,
            )],
        ),
    ];
    let state = ReportState::resolve(&figure(d, panels, None)).unwrap();

    assert_eq!(state.window.start, T0);
    assert_eq!(state.panels.len(), 2);
    assert_eq!(state.panels[0].lines.len(), 1);
    assert_eq!(state.panels[0].lines[0].label, "Workers");
    assert!(!state.panels[1].has_data());
    assert_eq!(state.omitted, vec!["CPU: Manager", "Memory: Workers"]);

    // cpu starts one minute after time zero and is sampled once a minute;
    // the gaps between samples are filled so the line is unbroken.
    let segments = &state.panels[0].lines[0].segments;
    assert_eq!(segments.len(), 1);
    let line = &segments[0];
    assert_eq!(line.len(), 301);
    assert_eq!(line.first(), Some(&(1.0, 30.0)));
    assert_eq!(line.last(), Some(&(6.0, 30.0)));
    assert!(line.iter().all(|&(_, y)| y == 30.0));
    assert_eq!(state.x_max(), 6.0);
}

#[test]
fn duration_clips_raw_series_and_fixes_x_max() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "start_1.csv", T0, 30, 5000.0);

    let panels = vec![PanelSpec::lines(
        "Input",
        "r/s",
        vec![SeriesSpec::raw("Throughput", format!("{}/start_1.csv", d.display()))],
    )
    .with_y_format(YFormat::Thousands)];
    let state = ReportState::resolve(&figure(d, panels, Some(10))).unwrap();

    let points = &state.panels[0].lines[0].segments[0];
    assert_eq!(points.len(), 11);
    assert_eq!(points.last(), Some(&(10.0, 5000.0)));
    assert_eq!(state.x_max(), 10.0);
}

#[test]
fn raw_series_outside_window_is_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "start_1.csv", T0, 5, 1.0);
    write_series(d, "late_1.csv", T0 + 20 * 60, 3, 7.0);

    let panels = vec![PanelSpec::lines(
        "Output",
        "r/s",
        vec![SeriesSpec::raw("Late", format!("{}/late_1.csv", d.display()))],
    )];
    let state = ReportState::resolve(&figure(d, panels, Some(10))).unwrap();

    assert!(!state.panels[0].has_data());
    assert_eq!(state.omitted, vec!["Output: Late"]);
}

#[test]
fn latency_bars_need_every_percentile() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "start_1.csv", T0, 4, 1.0);
    write_series(d, "latency_p50.csv", T0, 4, 0.5);
    write_series(d, "latency_p99.csv", T0 + 120, 2, 2.0);

    let bars = |percentiles: &[&str]| PanelSpec {
        title: "Latency".to_string(),
        y_label: "Seconds".to_string(),
        y_range: None,
        y_format: YFormat::Plain,
        kind: PanelKind::LatencyBars {
            template: format!("{}/latency_{{percentile}}.csv", d.display()),
            percentiles: percentiles.iter().map(|p| p.to_string()).collect(),
        },
    };

    let state = ReportState::resolve(&figure(d, vec![bars(&["p99", "p50"])], None)).unwrap();
    let panel = &state.panels[0];
    assert_eq!(panel.bars.len(), 2);
    assert_eq!(panel.bars[0].label, "p99");
    assert_eq!(panel.bars[0].bars, vec![(2.0, 2.0), (3.0, 2.0), (4.0, 2.0)]);
    assert_eq!(panel.bars[1].bars.len(), 5);

    let state =
        ReportState::resolve(&figure(d, vec![bars(&["p99", "p90", "p50"])], None)).unwrap();
    assert!(state.panels[0].bars.is_empty());
    assert_eq!(state.omitted, vec!["Latency: p99/p90/p50"]);
}

#[test]
fn pivot_series_get_one_line_per_instance() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "start_1.csv", T0, 2, 1.0);
    write_series(d, "node_a.csv", T0, 2, 1.0);
    write_series(d, "node_b.csv", T0, 2, 2.0);

    let panels = vec![PanelSpec::lines(
        "Per instance",
        "%",
        vec![SeriesSpec::pivot(
            "Worker",
            format!("{}/node_*.csv", d.display()),
            stream_plots::data::resample::InstanceNaming::FileStem,
        )],
    )];
    let state = ReportState::resolve(&figure(d, panels, None)).unwrap();
    let labels: Vec<&str> = state.panels[0]
        .lines
        .iter()
        .map(|l| l.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Worker node_a", "Worker node_b"]);
    // forward-filled: one unbroken segment per instance
    assert!(state.panels[0].lines.iter().all(|l| l.segments.len() == 1));
}

#[test]
fn missing_start_reference_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write_series(d, "cpu_1.csv", T0, 3, 1.0);

    let fig = figure(d, vec![], None);
    assert!(matches!(
        ReportState::resolve(&fig),
        Err(ReportError::MissingStartFile(_))
    ));
    assert!(app::render_report(&fig).is_err());
    assert!(!d.join("plots").exists());
}

#[test]
fn resources_report_aborts_when_results_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().to_str().unwrap();
    let out = dir.path().join("out");
    let cli = Cli::try_parse_from([
        "stream-plots",
        "resources",
        "--path",
        d,
        "--output-path",
        out.to_str().unwrap(),
    ])
    .unwrap();
    let Command::Resources(args) = &cli.command else {
        unreachable!()
    };
    assert_eq!(config::resources_figure(args).panels.len(), 8);

    assert!(app::run(cli).is_err());
    assert!(!out.exists());
}
