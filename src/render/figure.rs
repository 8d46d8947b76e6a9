use std::path::PathBuf;

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::plot::panel_plot;
use crate::config::FigureSpec;
use crate::state::ReportState;

const TITLE_FONT: f64 = 30.0;

// ---------------------------------------------------------------------------
// Figure layout
// ---------------------------------------------------------------------------

/// Lay out the figure title and the panel grid, then draw every panel.
pub fn draw_figure<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &FigureSpec,
    state: &ReportState,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let body = match &figure.title {
        Some(title) => root.titled(title, ("sans-serif", TITLE_FONT).into_font())?,
        None => root.clone(),
    };

    let x_max = state.x_max();
    let areas = body.split_evenly(figure.grid);
    for (area, panel) in areas.iter().zip(&state.panels) {
        panel_plot(area, panel, x_max)
            .with_context(|| format!("drawing panel '{}'", panel.title))?;
    }

    root.present()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Render `figure` as SVG (vector) and PNG (raster).  Returns the written paths.
pub fn save_figure(figure: &FigureSpec, state: &ReportState) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&figure.output.dir).with_context(|| {
        format!(
            "creating output directory {}",
            figure.output.dir.display()
        )
    })?;

    let svg_path = figure.output.path("svg");
    {
        let root = SVGBackend::new(&svg_path, figure.size_px).into_drawing_area();
        draw_figure(&root, figure, state)
            .with_context(|| format!("rendering {}", svg_path.display()))?;
    }

    let png_path = figure.output.path("png");
    {
        let root = BitMapBackend::new(&png_path, figure.size_px).into_drawing_area();
        draw_figure(&root, figure, state)
            .with_context(|| format!("rendering {}", png_path.display()))?;
    }

    Ok(vec![svg_path, png_path])
}
