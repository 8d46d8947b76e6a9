use anyhow::{Context, Result};

use crate::cli::{Cli, Command};
use crate::config::{self, FigureSpec};
use crate::render;
use crate::state::ReportState;

// ---------------------------------------------------------------------------
// Report pipeline
// ---------------------------------------------------------------------------

/// Build the figure for the selected report, resolve it and save it.
pub fn run(cli: Cli) -> Result<()> {
    let figure = match &cli.command {
        Command::Resources(args) => config::resources_figure(args),
        Command::Throughput(args) => config::throughput_figure(args),
        Command::Instances(args) => config::instances_figure(args)?,
    };
    render_report(&figure)
}

/// Resolve every panel of `figure` against the files on disk and write it out.
///
/// Fails without writing anything when the start reference cannot be read.
pub fn render_report(figure: &FigureSpec) -> Result<()> {
    let state = ReportState::resolve(figure).context("cannot align the x axis")?;

    for name in &state.omitted {
        log::warn!("omitted (no data): {name}");
    }
    log::info!(
        "{} panel(s), {} series omitted",
        state.panels.len(),
        state.omitted.len()
    );

    let written = render::save_figure(figure, &state)?;
    let shown: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
    log::info!("charts saved to {}", shown.join(", "));
    Ok(())
}
