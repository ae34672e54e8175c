use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::config::PlotConfig;
use crate::data::loader::load_populations;
use crate::plot::{output_path, render_comparison, DEFAULT_EXTENSION};
use crate::summary::export::write_summary_csv;
use crate::summary::stats::summarize_all;
use crate::summary::time_grid::TimeGrid;

/// Load → summarize → render.  Returns the path of the saved figure.
///
/// Any failure aborts the whole run; nothing is written before every input
/// has loaded and every summary has been computed.
pub fn run(config: &PlotConfig) -> Result<PathBuf> {
    config.validate().context("invalid configuration")?;

    let populations = load_populations(&config.populations)?;

    let grid = TimeGrid::from_populations(&populations, config.n_times)
        .context("building the shared time grid")?;
    let summaries = summarize_all(&populations, &grid, config.ci_low, config.ci_high)
        .context("summarizing posterior samples")?;

    if let Some(csv_path) = &config.summary_csv {
        write_summary_csv(csv_path, &grid, &summaries)?;
        info!("Summary table written to {}", csv_path.display());
    }

    let out = output_path(&config.output_dir, &config.labels(), DEFAULT_EXTENSION);
    render_comparison(&grid, &summaries, &config.figure, &out)
        .with_context(|| format!("rendering {}", out.display()))?;
    info!(
        "Rendered {} populations on {} time points",
        summaries.len(),
        grid.len()
    );

    Ok(out)
}
