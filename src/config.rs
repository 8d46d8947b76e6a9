//! Figure definitions for the three reports.
//!
//! Each report is an explicit [`FigureSpec`] built from its CLI arguments; the
//! renderer and the report state only ever see these structures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::cli::{self, InstancesArgs, ResourcesArgs, ThroughputArgs};
use crate::data::model::NodeRole;
use crate::data::resample::InstanceNaming;

// ---------------------------------------------------------------------------
// Figure structure
// ---------------------------------------------------------------------------

/// Where a series comes from and how it is aligned.
#[derive(Debug, Clone)]
pub enum SeriesSource {
    /// Mean across every matching instance, optionally smoothed.
    Collapse { smooth: bool },
    /// Samples exactly as recorded, sorted by time.
    Raw,
    /// One line per instance.
    Pivot(InstanceNaming),
}

#[derive(Debug, Clone)]
pub struct SeriesSpec {
    /// Legend label.
    pub label: String,
    /// Glob pattern of the input files.
    pub pattern: String,
    pub source: SeriesSource,
}

impl SeriesSpec {
    pub fn collapse(label: &str, pattern: String, smooth: bool) -> Self {
        Self {
            label: label.to_string(),
            pattern,
            source: SeriesSource::Collapse { smooth },
        }
    }

    pub fn raw(label: &str, pattern: String) -> Self {
        Self {
            label: label.to_string(),
            pattern,
            source: SeriesSource::Raw,
        }
    }

    pub fn pivot(label: &str, pattern: String, naming: InstanceNaming) -> Self {
        Self {
            label: label.to_string(),
            pattern,
            source: SeriesSource::Pivot(naming),
        }
    }
}

/// Tick label style for the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YFormat {
    Plain,
    /// `12000` → `12K`
    Thousands,
}

impl YFormat {
    pub fn format(&self, y: f64) -> String {
        match self {
            YFormat::Plain => {
                if (y - y.round()).abs() < 1e-9 {
                    format!("{y:.0}")
                } else {
                    format!("{y:.1}")
                }
            }
            YFormat::Thousands => format!("{:.0}K", y / 1e3),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PanelKind {
    Lines(Vec<SeriesSpec>),
    /// Overlaid bars, one raw file per percentile, drawn in the given order.
    LatencyBars {
        /// Path with a `{percentile}` placeholder.
        template: String,
        percentiles: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct PanelSpec {
    pub title: String,
    pub y_label: String,
    /// Fixed y bounds; fitted to the data when absent.
    pub y_range: Option<(f64, f64)>,
    pub y_format: YFormat,
    pub kind: PanelKind,
}

impl PanelSpec {
    pub fn lines(title: &str, y_label: &str, series: Vec<SeriesSpec>) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            y_range: None,
            y_format: YFormat::Plain,
            kind: PanelKind::Lines(series),
        }
    }

    pub fn with_y_range(mut self, range: Option<(f64, f64)>) -> Self {
        self.y_range = range;
        self
    }

    pub fn with_y_format(mut self, format: YFormat) -> Self {
        self.y_format = format;
        self
    }
}

/// Output location; the figure is written as `<dir>/<name>.svg` and `.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub dir: PathBuf,
    pub name: String,
}

impl OutputTarget {
    pub fn path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{extension}", self.name))
    }
}

#[derive(Debug, Clone)]
pub struct FigureSpec {
    pub title: Option<String>,
    /// Rows × columns; `panels` is laid out row-major.
    pub grid: (usize, usize),
    pub size_px: (u32, u32),
    pub panels: Vec<PanelSpec>,
    /// Pattern whose first file defines time zero for every panel.
    pub start_reference: String,
    pub duration_minutes: Option<u32>,
    pub output: OutputTarget,
}

// ---------------------------------------------------------------------------
// Report builders
// ---------------------------------------------------------------------------

const WORKER_CPU: &str = "generic_workerNodesCPUsPercentageUtilization_60s_*.csv";
const WORKER_MEMORY: &str =
    "generic_workerNodesTotalMemoryUsageWithoutConsidBufferedandCachedGB_*.csv";
const WORKER_NETWORK: &str = "generic_workerNodesNetworkReceiveMB_60s_*.csv";
const MANAGER_CPU: &str = "generic_ManagerPodsCPUsPercentageUtilization60s_*.csv";
const DEFAULT_BROKER_CPU: &str =
    "generic_kafkaBrokerNodesCPUsPercentageUtilization_60s_{broker_id}.csv";
const BROKER_IDS: [u32; 2] = [1, 2];

const CPU_RANGE: (f64, f64) = (0.0, 64.0);
const MEMORY_RANGE: (f64, f64) = (0.0, 4.5);
const NETWORK_RANGE: (f64, f64) = (-5.0, 150.0);

/// `<dir>/exp<exp>_<registers>_<instances>_<metric>`
pub fn experiment_pattern(
    dir: &Path,
    exp: &str,
    registers: &str,
    instances: &str,
    metric: &str,
) -> String {
    format!(
        "{}/exp{exp}_{registers}_{instances}_{metric}",
        dir.display()
    )
}

fn broker_file(pattern: &str, broker_id: u32) -> String {
    pattern.replace("{broker_id}", &broker_id.to_string())
}

/// 4×2 grid: Spark Structured Streaming on the left, Kafka Streams on the right.
pub fn resources_figure(args: &ResourcesArgs) -> FigureSpec {
    let pattern = |exp: &str, metric: &str| {
        experiment_pattern(&args.path, exp, &args.registers, &args.instances, metric)
    };

    let column = |framework: &str, exp: &str, with_manager: bool| -> Vec<PanelSpec> {
        let mut additional: Vec<SeriesSpec> = BROKER_IDS
            .iter()
            .map(|&id| {
                SeriesSpec::collapse(
                    &format!("Kafka Broker {id}"),
                    pattern(exp, &broker_file(&args.kafka_broker_pattern, id)),
                    false,
                )
            })
            .collect();
        if with_manager {
            additional.push(SeriesSpec::collapse(
                "Manager",
                pattern(exp, MANAGER_CPU),
                false,
            ));
        }
        let additional_title = if with_manager {
            format!("{framework} - Additional CPUs usage")
        } else {
            format!("{framework} - Additional nodes CPUs usage")
        };

        vec![
            PanelSpec::lines(
                &format!("{framework} - Worker CPUs Usage"),
                "CPUs Usage (%)",
                vec![SeriesSpec::collapse("Workers", pattern(exp, WORKER_CPU), true)],
            )
            .with_y_range(Some(CPU_RANGE)),
            PanelSpec::lines(
                &format!("{framework} - Worker memory usage"),
                "Memory usage (GB)",
                vec![SeriesSpec::collapse(
                    "Workers",
                    pattern(exp, WORKER_MEMORY),
                    false,
                )],
            )
            .with_y_range(Some(MEMORY_RANGE)),
            PanelSpec::lines(
                &format!("{framework} - Worker network traffic"),
                "MB/s",
                vec![SeriesSpec::collapse(
                    "Workers",
                    pattern(exp, WORKER_NETWORK),
                    true,
                )],
            )
            .with_y_range(Some(NETWORK_RANGE)),
            PanelSpec::lines(&additional_title, "CPUs Usage (%)", additional)
                .with_y_range(Some(CPU_RANGE)),
        ]
    };

    let spark = column("Spark Structured Streaming", &args.spark_exp, true);
    let kafka = column("Kafka Streams", &args.kafka_exp, false);
    let panels = spark
        .into_iter()
        .zip(kafka)
        .flat_map(|(left, right)| [left, right])
        .collect();

    FigureSpec {
        title: Some(format!(
            "Average Resource Consumption for {}/s Load",
            args.registers
        )),
        grid: (4, 2),
        size_px: (2000, 2000),
        panels,
        start_reference: pattern(&args.spark_exp, WORKER_CPU),
        duration_minutes: args.duration,
        output: OutputTarget {
            dir: args.output_path.clone(),
            name: args.output_name.clone().unwrap_or_else(|| {
                format!(
                    "resources-average-{}-exp{}",
                    args.registers, args.spark_exp
                )
            }),
        },
    }
}

/// 4×1 grid: input throughput, output throughput, latency percentiles, input lag.
pub fn throughput_figure(args: &ThroughputArgs) -> FigureSpec {
    let prefix = experiment_pattern(
        &args.input_path,
        &args.exp_id,
        &args.registers,
        &args.instances,
        "",
    );
    let input_tp = format!("{prefix}generic_input_throughput_60s_1.csv");
    let output_tp = format!("{prefix}generic_outputthroughput_60s_1.csv");
    let latency = format!("{prefix}generic_latency_{{percentile}}_120s_1.csv");
    let lag = format!("{prefix}lag-trend_lag trend_1.csv");

    let panels = vec![
        PanelSpec::lines(
            "Application input throughput (read from Kafka)",
            "Input (r/s)",
            vec![SeriesSpec::raw("Throughput", input_tp.clone())],
        )
        .with_y_range(cli::y_range(&args.ylim_input_tp))
        .with_y_format(YFormat::Thousands),
        PanelSpec::lines(
            "Application output throughput (written to Kafka)",
            "Output (r/s)",
            vec![SeriesSpec::raw("Throughput", output_tp)],
        )
        .with_y_range(cli::y_range(&args.ylim_output_tp))
        .with_y_format(YFormat::Thousands),
        PanelSpec {
            title: "Latency".to_string(),
            y_label: "Seconds".to_string(),
            y_range: cli::y_range(&args.ylim_latency),
            y_format: YFormat::Plain,
            kind: PanelKind::LatencyBars {
                template: latency,
                percentiles: ["p99", "p90", "p50"].map(String::from).to_vec(),
            },
        },
        PanelSpec::lines("Input Lag", "Lag", vec![SeriesSpec::raw("Records", lag)])
            .with_y_range(cli::y_range(&args.ylim_lag))
            .with_y_format(YFormat::Thousands),
    ];

    FigureSpec {
        title: None,
        grid: (4, 1),
        size_px: (1200, 1100),
        panels,
        start_reference: input_tp,
        duration_minutes: Some(args.duration),
        output: OutputTarget {
            dir: args.output_path.clone(),
            name: args.output_name.clone(),
        },
    }
}

/// 4×1 grid with one line per worker, plus the manager and brokers by role.
pub fn instances_figure(args: &InstancesArgs) -> Result<FigureSpec> {
    let label_regex = Regex::new(&args.label_pattern)
        .with_context(|| format!("invalid --label-pattern '{}'", args.label_pattern))?;
    let workers = InstanceNaming::LabelCapture(label_regex);
    let pattern = |metric: &str| {
        experiment_pattern(
            &args.input_path,
            &args.exp_id,
            &args.registers,
            &args.instances,
            metric,
        )
    };

    let mut additional = vec![SeriesSpec::pivot(
        "Manager",
        pattern(MANAGER_CPU),
        InstanceNaming::Role(NodeRole::Manager),
    )];
    additional.extend(BROKER_IDS.iter().map(|&id| {
        SeriesSpec::pivot(
            &format!("Kafka Broker {id}"),
            pattern(&broker_file(DEFAULT_BROKER_CPU, id)),
            InstanceNaming::Role(NodeRole::Broker(id)),
        )
    }));

    let panels = vec![
        PanelSpec::lines(
            "Worker CPUs usage per instance",
            "CPUs Usage (%)",
            vec![SeriesSpec::pivot("Worker", pattern(WORKER_CPU), workers.clone())],
        )
        .with_y_range(Some(CPU_RANGE)),
        PanelSpec::lines(
            "Worker memory usage per instance",
            "Memory usage (GB)",
            vec![SeriesSpec::pivot(
                "Worker",
                pattern(WORKER_MEMORY),
                workers.clone(),
            )],
        )
        .with_y_range(Some(MEMORY_RANGE)),
        PanelSpec::lines(
            "Worker network traffic per instance",
            "MB/s",
            vec![SeriesSpec::pivot("Worker", pattern(WORKER_NETWORK), workers)],
        )
        .with_y_range(Some(NETWORK_RANGE)),
        PanelSpec::lines("Additional nodes CPUs usage", "CPUs Usage (%)", additional)
            .with_y_range(Some(CPU_RANGE)),
    ];

    Ok(FigureSpec {
        title: Some(format!(
            "Per-instance Resource Consumption for {}/s Load (exp{})",
            args.registers, args.exp_id
        )),
        grid: (4, 1),
        size_px: (1400, 1800),
        panels,
        start_reference: pattern(WORKER_CPU),
        duration_minutes: args.duration,
        output: OutputTarget {
            dir: args.output_path.clone(),
            name: args
                .output_name
                .clone()
                .unwrap_or_else(|| format!("instances-{}-exp{}", args.registers, args.exp_id)),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["stream-plots"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn series(panel: &PanelSpec) -> &[SeriesSpec] {
        match &panel.kind {
            PanelKind::Lines(s) => s,
            PanelKind::LatencyBars { .. } => panic!("expected a line panel"),
        }
    }

    #[test]
    fn resources_grid_alternates_frameworks() {
        let Command::Resources(args) = parse(&["resources", "--path", "res"]) else {
            unreachable!()
        };
        let fig = resources_figure(&args);
        assert_eq!(fig.grid, (4, 2));
        assert_eq!(fig.panels.len(), 8);
        assert!(fig.panels[0].title.starts_with("Spark"));
        assert!(fig.panels[1].title.starts_with("Kafka Streams"));
        assert_eq!(
            fig.start_reference,
            "res/exp124_5000_3_generic_workerNodesCPUsPercentageUtilization_60s_*.csv"
        );
        assert_eq!(fig.output.path("png"), PathBuf::from("../plots/resources-average-5000-exp124.png"));

        // Spark's additional panel carries the manager, Kafka's does not.
        assert_eq!(series(&fig.panels[6]).len(), 3);
        assert_eq!(series(&fig.panels[7]).len(), 2);
        assert_eq!(
            series(&fig.panels[7])[1].pattern,
            "res/exp123_5000_3_generic_kafkaBrokerNodesCPUsPercentageUtilization_60s_2.csv"
        );
    }

    #[test]
    fn resources_smooths_cpu_and_network_only() {
        let Command::Resources(args) = parse(&["resources"]) else {
            unreachable!()
        };
        let fig = resources_figure(&args);
        let smooth: Vec<bool> = fig
            .panels
            .iter()
            .step_by(2)
            .map(|p| matches!(series(p)[0].source, SeriesSource::Collapse { smooth: true }))
            .collect();
        assert_eq!(smooth, vec![true, false, true, false]);
    }

    #[test]
    fn throughput_paths_and_limits() {
        let Command::Throughput(args) = parse(&[
            "throughput",
            "--input-path",
            "in",
            "--ylim-lag",
            "0",
            "60000",
        ]) else {
            unreachable!()
        };
        let fig = throughput_figure(&args);
        assert_eq!(fig.duration_minutes, Some(65));
        assert_eq!(
            fig.start_reference,
            "in/exp3_10000_3_generic_input_throughput_60s_1.csv"
        );
        assert_eq!(fig.panels[3].y_range, Some((0.0, 60000.0)));
        assert_eq!(fig.panels[3].y_format, YFormat::Thousands);
        assert_eq!(
            series(&fig.panels[3])[0].pattern,
            "in/exp3_10000_3_lag-trend_lag trend_1.csv"
        );
        match &fig.panels[2].kind {
            PanelKind::LatencyBars {
                template,
                percentiles,
            } => {
                assert_eq!(
                    template,
                    "in/exp3_10000_3_generic_latency_{percentile}_120s_1.csv"
                );
                assert_eq!(percentiles, &["p99", "p90", "p50"]);
            }
            PanelKind::Lines(_) => panic!("expected latency bars"),
        }
    }

    #[test]
    fn instances_uses_roles_for_additional_nodes() {
        let Command::Instances(args) = parse(&["instances"]) else {
            unreachable!()
        };
        let fig = instances_figure(&args).unwrap();
        let roles: Vec<String> = series(&fig.panels[3])
            .iter()
            .map(|s| match &s.source {
                SeriesSource::Pivot(InstanceNaming::Role(role)) => role.to_string(),
                other => panic!("unexpected source {other:?}"),
            })
            .collect();
        assert_eq!(roles, vec!["manager", "broker-1", "broker-2"]);
    }

    #[test]
    fn instances_rejects_bad_label_pattern() {
        let Command::Instances(args) = parse(&["instances", "--label-pattern", "("]) else {
            unreachable!()
        };
        assert!(instances_figure(&args).is_err());
    }

    #[test]
    fn y_formats() {
        assert_eq!(YFormat::Thousands.format(12_000.0), "12K");
        assert_eq!(YFormat::Thousands.format(2_400.0), "2K");
        assert_eq!(YFormat::Plain.format(64.0), "64");
        assert_eq!(YFormat::Plain.format(4.5), "4.5");
    }
}
