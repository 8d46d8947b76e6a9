use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::SeriesColors;
use crate::state::ResolvedPanel;

/// Width of a latency bar, in minutes.
const BAR_WIDTH: f64 = 0.25;
/// Spacing of the x-axis labels, in minutes.
const X_TICK_MINUTES: f64 = 10.0;

const CAPTION_FONT: f64 = 22.0;
const LABEL_FONT: f64 = 16.0;

// ---------------------------------------------------------------------------
// Panel plot
// ---------------------------------------------------------------------------

/// Draw one resolved panel (lines and/or bars) into `area`.
///
/// The x axis always starts at minute zero and ends at `x_max`; the y axis
/// uses the panel's fixed range or the data extent with a small margin.
pub fn panel_plot<DB>(
    area: &DrawingArea<DB, Shift>,
    panel: &ResolvedPanel,
    x_max: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };
    let (y_lo, y_hi) = panel
        .y_range
        .or_else(|| panel.y_extent().map(padded))
        .unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", CAPTION_FONT).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y_lo..y_hi)?;

    let y_format = panel.y_format;
    chart
        .configure_mesh()
        .x_labels(x_tick_count(x_max))
        .light_line_style(WHITE)
        .x_desc("Time (Minutes)")
        .y_desc(panel.y_label.as_str())
        .label_style(("sans-serif", LABEL_FONT).into_font())
        .axis_desc_style(("sans-serif", LABEL_FONT).into_font())
        .x_label_formatter(&|x| format!("{x:.0}"))
        .y_label_formatter(&|y| y_format.format(*y))
        .draw()?;

    // Frame line along the top of the plot area.
    chart.draw_series(LineSeries::new(
        [(0.0, y_hi), (x_max, y_hi)],
        BLACK.stroke_width(1),
    ))?;

    if !panel.has_data() {
        let (w, h) = area.dim_in_pixel();
        area.draw(&Text::new(
            "no data",
            (w as i32 / 2 - 30, h as i32 / 2),
            ("sans-serif", LABEL_FONT).into_font().color(&RED),
        ))?;
        return Ok(());
    }

    let labels = panel
        .bars
        .iter()
        .map(|b| b.label.as_str())
        .chain(panel.lines.iter().map(|l| l.label.as_str()));
    let colors = SeriesColors::new(labels);

    for bar_set in &panel.bars {
        let color = colors.color_for(&bar_set.label);
        chart
            .draw_series(
                bar_set
                    .bars
                    .iter()
                    .filter(|(x, _)| *x >= 0.0 && *x <= x_max)
                    .map(|&(x, y)| {
                        Rectangle::new(bar_corners(x, y, x_max, (y_lo, y_hi)), color.filled())
                    }),
            )?
            .label(bar_set.label.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled())
            });
    }

    for line in &panel.lines {
        let color = colors.color_for(&line.label);
        // Legend anchor; segments below are drawn unlabelled.
        chart
            .draw_series(LineSeries::new(
                std::iter::empty::<(f64, f64)>(),
                color.stroke_width(2),
            ))?
            .label(line.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });

        for segment in &line.segments {
            let visible = segment
                .iter()
                .copied()
                .filter(|(x, _)| *x >= 0.0 && *x <= x_max)
                .map(|(x, y)| (x, y.max(y_lo).min(y_hi)))
                .collect::<Vec<_>>();
            if let [only] = visible.as_slice() {
                chart.draw_series(std::iter::once(Circle::new(*only, 2, color.filled())))?;
            } else {
                chart.draw_series(LineSeries::new(visible, color.stroke_width(2)))?;
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", LABEL_FONT).into_font())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Label count that lands x ticks on whole multiples of ten minutes.  Short
/// windows still get both ends labelled.
fn x_tick_count(x_max: f64) -> usize {
    ((x_max / X_TICK_MINUTES).floor() as usize + 1).max(2)
}

/// Bar rectangle between zero (or the nearest y bound) and `y`, clipped to
/// the plot area and ordered bottom-left to top-right.
fn bar_corners(x: f64, y: f64, x_max: f64, (y_lo, y_hi): (f64, f64)) -> [(f64, f64); 2] {
    let half = BAR_WIDTH / 2.0;
    let base = 0f64.max(y_lo).min(y_hi);
    let top = y.max(y_lo).min(y_hi);
    [
        ((x - half).max(0.0), base.min(top)),
        ((x + half).min(x_max), base.max(top)),
    ]
}

/// Data extent with a 5% margin on both sides; a flat series gets ±1.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let margin = (hi - lo) * 0.05;
    (lo - margin, hi + margin)
}
