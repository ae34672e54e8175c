//! Log-log comparison chart of per-population Ne summaries.
//!
//! The chart is drawn with [`plotters`] into an in-memory RGB buffer and then
//! PNG-encoded with [`image`], so the drawing context is released before any
//! file is touched.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::color::ColorMap;
use crate::config::FigureStyle;
use crate::summary::stats::PopulationSummary;
use crate::summary::time_grid::TimeGrid;

pub const TITLE: &str = "Ne(t) comparison across populations";
pub const X_LABEL: &str = "Time (generations)";
pub const Y_LABEL: &str = "Effective Population Size (Ne)";
pub const DEFAULT_EXTENSION: &str = "png";

const BAND_ALPHA: f64 = 0.25;
const LINE_WIDTH_PT: f64 = 2.0;
const LEGEND_AREA_PT: f64 = 24.0;
const LEGEND_GLYPH_PT: f64 = 16.0;
const FONT: &str = "sans-serif";
const NO_FRAME: RGBAColor = RGBAColor(0, 0, 0, 0.0);

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to create output directory: {0}")]
    Directory(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

/// Destination of the comparison figure: `<dir>/<label1>_<label2>_..._<labelN>.<ext>`.
pub fn output_path(output_dir: &Path, labels: &[&str], extension: &str) -> PathBuf {
    output_dir.join(format!("{}.{extension}", labels.join("_")))
}

/// Render the comparison chart and write it to `output_path`, creating the
/// parent directory if needed and overwriting any existing file.
pub fn render_comparison(
    grid: &TimeGrid,
    summaries: &[PopulationSummary],
    style: &FigureStyle,
    output_path: &Path,
) -> Result<()> {
    validate(grid, summaries)?;

    let (width, height) = style.pixel_size();
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, grid, summaries, style)?;
        root.present()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| PlotError::InvalidData("pixel buffer size mismatch".to_string()))?;
    image.save(output_path)?;
    Ok(())
}

fn validate(grid: &TimeGrid, summaries: &[PopulationSummary]) -> Result<()> {
    if grid.is_empty() {
        return Err(PlotError::InvalidData("time grid is empty".to_string()));
    }
    if summaries.is_empty() {
        return Err(PlotError::InvalidData("no populations to plot".to_string()));
    }
    for s in summaries {
        let n = grid.len();
        if s.median.len() != n || s.low.len() != n || s.high.len() != n {
            return Err(PlotError::InvalidData(format!(
                "summary of '{}' is not aligned to the {n}-point time grid",
                s.label
            )));
        }
    }
    Ok(())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    grid: &TimeGrid,
    summaries: &[PopulationSummary],
    style: &FigureStyle,
) -> Result<()> {
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let px = |pt: f64| style.points(pt).round() as u32;

    let first = grid.times[0];
    let last = grid.times[grid.len() - 1];
    let (x_min, x_max) = log_axis_range(first, last);

    let (y_lo, y_hi) = summaries
        .iter()
        .map(PopulationSummary::range)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| {
            (lo.min(a), hi.max(b))
        });
    let (y_min, y_max) = log_axis_range(y_lo, y_hi);

    let mut chart = ChartBuilder::on(root)
        .caption(TITLE, (FONT, style.points(14.0)))
        .margin(px(8.0))
        .x_label_area_size(px(36.0))
        .y_label_area_size(px(52.0))
        .build_cartesian_2d((x_min..x_max).log_scale(), (y_min..y_max).log_scale())
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .axis_desc_style((FONT, style.points(12.0)))
        .label_style((FONT, style.points(10.0)))
        .x_label_formatter(&|x| format!("{x:.0e}"))
        .y_label_formatter(&|y| format!("{y:.0e}"))
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    let colors = ColorMap::new(summaries.iter().map(|s| s.label.as_str()));
    let line_width = px(LINE_WIDTH_PT);
    // glyph must stay inside the legend area or it runs over the label text
    let legend_area = px(LEGEND_AREA_PT) as i32;
    let legend_len = px(LEGEND_GLYPH_PT) as i32;

    for (summary, (_, color)) in summaries.iter().zip(colors.legend_entries()) {
        let color = *color;

        // credible band: high curve forward, low curve back
        let mut band: Vec<(f64, f64)> = grid
            .times
            .iter()
            .copied()
            .zip(summary.high.iter().copied())
            .collect();
        band.extend(
            grid.times
                .iter()
                .copied()
                .zip(summary.low.iter().copied())
                .rev(),
        );
        chart
            .draw_series(std::iter::once(Polygon::new(
                band,
                color.mix(BAND_ALPHA).filled(),
            )))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(
                grid.times.iter().copied().zip(summary.median.iter().copied()),
                color.stroke_width(line_width),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label(summary.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + legend_len, y)], color.stroke_width(line_width))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font((FONT, style.points(11.0)))
        .legend_area_size(legend_area)
        .background_style(NO_FRAME)
        .border_style(NO_FRAME)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// Axis bounds for a log scale; a collapsed range is widened by a factor of 2
/// on each side.
fn log_axis_range(min: f64, max: f64) -> (f64, f64) {
    if min < max {
        (min, max)
    } else {
        (min / 2.0, max * 2.0)
    }
}
