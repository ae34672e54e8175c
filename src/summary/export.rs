use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::stats::PopulationSummary;
use super::time_grid::TimeGrid;

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    population: &'a str,
    time: f64,
    median: f64,
    low: f64,
    high: f64,
}

/// Write the summary curves as long-format CSV:
/// `population,time,median,low,high`, one row per population per grid point.
pub fn write_summary_csv(
    path: &Path,
    grid: &TimeGrid,
    summaries: &[PopulationSummary],
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating summary CSV {}", path.display()))?;

    for summary in summaries {
        for (j, &time) in grid.times.iter().enumerate() {
            writer
                .serialize(SummaryRow {
                    population: &summary.label,
                    time,
                    median: summary.median[j],
                    low: summary.low[j],
                    high: summary.high[j],
                })
                .context("writing summary row")?;
        }
    }
    writer.flush().context("flushing summary CSV")?;
    Ok(())
}
