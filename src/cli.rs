use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stream-plots")]
#[command(about = "Render load-test reports comparing Spark Structured Streaming and Kafka Streams")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Average resource consumption (CPU, memory, network) of both frameworks.
    Resources(ResourcesArgs),
    /// Input/output throughput, latency percentiles and input lag of one experiment.
    Throughput(ThroughputArgs),
    /// Per-instance resource usage of one experiment.
    Instances(InstancesArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ResourcesArgs {
    /// Experiment ID for Kafka Streams.
    #[arg(long, default_value = "123")]
    pub kafka_exp: String,
    /// Experiment ID for Spark Structured Streaming.
    #[arg(long, default_value = "124")]
    pub spark_exp: String,
    /// Registers per second generated by the load test.
    #[arg(long, default_value = "5000")]
    pub registers: String,
    /// Number of worker instances.
    #[arg(long, default_value = "3")]
    pub instances: String,
    /// Directory holding the result CSVs.
    #[arg(long, default_value = "results-local-5k")]
    pub path: PathBuf,
    /// File name of the Kafka broker CPU series; `{broker_id}` becomes 1 and 2.
    #[arg(
        long,
        default_value = "generic_kafkaBrokerNodesCPUsPercentageUtilization_60s_{broker_id}.csv"
    )]
    pub kafka_broker_pattern: String,
    /// Directory for the rendered figures.
    #[arg(long, default_value = "../plots")]
    pub output_path: PathBuf,
    /// Base name of the rendered figures (defaults to resources-average-<registers>-exp<spark-exp>).
    #[arg(long)]
    pub output_name: Option<String>,
    /// Minutes shown on the x axis (defaults to the data extent).
    #[arg(long)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ThroughputArgs {
    /// Experiment ID.
    #[arg(long, default_value = "3")]
    pub exp_id: String,
    /// Registers per second generated by the load test.
    #[arg(long, default_value = "10000")]
    pub registers: String,
    /// Number of worker instances.
    #[arg(long, default_value = "3")]
    pub instances: String,
    /// Directory holding the result CSVs.
    #[arg(long, default_value = "results-local")]
    pub input_path: PathBuf,
    /// Directory for the rendered figures.
    #[arg(long, default_value = "../plots")]
    pub output_path: PathBuf,
    /// Base name of the rendered figures.
    #[arg(long, default_value = "spark-3podskill-final-bar")]
    pub output_name: String,
    /// Minutes shown on the x axis.
    #[arg(long, default_value_t = 65)]
    pub duration: u32,
    /// Y-axis bounds for input throughput, e.g. `--ylim-input-tp 0 15000`.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub ylim_input_tp: Option<Vec<f64>>,
    /// Y-axis bounds for output throughput.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub ylim_output_tp: Option<Vec<f64>>,
    /// Y-axis bounds for latency, in seconds.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub ylim_latency: Option<Vec<f64>>,
    /// Y-axis bounds for input lag.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub ylim_lag: Option<Vec<f64>>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct InstancesArgs {
    /// Experiment ID.
    #[arg(long, default_value = "3")]
    pub exp_id: String,
    /// Registers per second generated by the load test.
    #[arg(long, default_value = "10000")]
    pub registers: String,
    /// Number of worker instances.
    #[arg(long, default_value = "3")]
    pub instances: String,
    /// Directory holding the result CSVs.
    #[arg(long, default_value = "results-local")]
    pub input_path: PathBuf,
    /// Directory for the rendered figures.
    #[arg(long, default_value = "../plots")]
    pub output_path: PathBuf,
    /// Base name of the rendered figures (defaults to instances-<registers>-exp<exp-id>).
    #[arg(long)]
    pub output_name: Option<String>,
    /// Minutes shown on the x axis (defaults to the data extent).
    #[arg(long)]
    pub duration: Option<u32>,
    /// Regex whose first capture group names a worker from its `labels` cell.
    #[arg(long, default_value = r#"instance="?([^",}\s]+)"#)]
    pub label_pattern: String,
}

/// Turn a two-value `--ylim-*` flag into a range.
pub fn y_range(values: &Option<Vec<f64>>) -> Option<(f64, f64)> {
    match values.as_deref() {
        Some([lo, hi]) => Some((*lo, *hi)),
        _ => None,
    }
}
