use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

/// Write a synthetic results directory that every report can be run against.
#[derive(Debug, Parser)]
#[command(name = "generate-sample")]
struct Args {
    /// Experiment IDs to generate (repeatable).
    #[arg(long = "exp", default_values = ["123", "124"])]
    exps: Vec<String>,
    #[arg(long, default_value = "5000")]
    registers: u32,
    #[arg(long, default_value_t = 3)]
    instances: u32,
    /// Length of the synthetic run.
    #[arg(long, default_value_t = 60)]
    minutes: u32,
    /// Seconds between two samples.
    #[arg(long, default_value_t = 15)]
    step: u32,
    #[arg(long, default_value = "results-local-5k")]
    out: PathBuf,
}

const START: i64 = 1_700_000_000;

#[derive(Serialize)]
struct Row<'a> {
    timestamp: i64,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a str>,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Write `timestamp,value[,labels]` rows sampled from `level(elapsed_secs)` plus noise.
fn write_series(
    path: &Path,
    args: &Args,
    label: Option<&str>,
    noise: f64,
    rng: &mut SimpleRng,
    level: impl Fn(f64) -> f64,
) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let end = i64::from(args.minutes) * 60;
    for elapsed in (0..=end).step_by(args.step.max(1) as usize) {
        let value = (level(elapsed as f64) + rng.gauss(0.0, noise)).max(0.0);
        writer.serialize(Row {
            timestamp: START + elapsed,
            value,
            labels: label,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let load = f64::from(args.registers);
    let mut rng = SimpleRng::new(42);
    let mut written = 0;

    for exp in &args.exps {
        let file = |metric: &str| {
            args.out.join(format!(
                "exp{exp}_{}_{}_{metric}",
                args.registers, args.instances
            ))
        };

        for k in 1..=args.instances {
            let label = format!("instance=\"10.0.0.{k}:9100\"");
            let skew = f64::from(k) * 1.5;
            write_series(
                &file(&format!("generic_workerNodesCPUsPercentageUtilization_60s_{k}.csv")),
                &args,
                Some(label.as_str()),
                1.5,
                &mut rng,
                |t| 20.0 + skew + 10.0 * (t / 600.0).sin(),
            )?;
            write_series(
                &file(&format!(
                    "generic_workerNodesTotalMemoryUsageWithoutConsidBufferedandCachedGB_{k}.csv"
                )),
                &args,
                Some(label.as_str()),
                0.05,
                &mut rng,
                |t| 1.5 + 0.0005 * t.min(1800.0) + skew / 10.0,
            )?;
            write_series(
                &file(&format!("generic_workerNodesNetworkReceiveMB_60s_{k}.csv")),
                &args,
                Some(label.as_str()),
                4.0,
                &mut rng,
                |_| load / 100.0 + skew,
            )?;
            written += 3;
        }

        write_series(
            &file("generic_ManagerPodsCPUsPercentageUtilization60s_1.csv"),
            &args,
            None,
            0.5,
            &mut rng,
            |_| 4.0,
        )?;
        for broker in 1..=2u32 {
            write_series(
                &file(&format!(
                    "generic_kafkaBrokerNodesCPUsPercentageUtilization_60s_{broker}.csv"
                )),
                &args,
                None,
                1.0,
                &mut rng,
                |_| 8.0 + f64::from(broker),
            )?;
        }
        write_series(
            &file("generic_input_throughput_60s_1.csv"),
            &args,
            None,
            load * 0.02,
            &mut rng,
            |_| load,
        )?;
        write_series(
            &file("generic_outputthroughput_60s_1.csv"),
            &args,
            None,
            load * 0.03,
            &mut rng,
            |t| if t < 120.0 { load * t / 120.0 } else { load },
        )?;
        for (percentile, base) in [("p50", 0.4), ("p90", 1.1), ("p99", 2.5)] {
            write_series(
                &file(&format!("generic_latency_{percentile}_120s_1.csv")),
                &args,
                None,
                base * 0.1,
                &mut rng,
                |_| base,
            )?;
        }
        write_series(
            &file("lag-trend_lag trend_1.csv"),
            &args,
            None,
            load * 0.05,
            &mut rng,
            |t| load * (t / 600.0).sin().abs(),
        )?;
        written += 9;
    }

    println!(
        "Wrote {written} series for {} experiment(s) to {}",
        args.exps.len(),
        args.out.display()
    );
    Ok(())
}
