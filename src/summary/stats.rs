use log::debug;

use super::time_grid::TimeGrid;
use super::{Result, SummaryError};
use crate::data::model::{DemographicModel, PopulationResults};

// ---------------------------------------------------------------------------
// PopulationSummary – median and credible band on the shared grid
// ---------------------------------------------------------------------------

/// Posterior summary of one population, aligned to a [`TimeGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSummary {
    pub label: String,
    pub median: Vec<f64>,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl PopulationSummary {
    /// Smallest and largest value of the band (low..high).
    pub fn range(&self) -> (f64, f64) {
        let min = self.low.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.high.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }
}

/// Evaluate every posterior sample on the grid and reduce along the samples
/// axis to the median and the `ci_low` / `ci_high` percentiles.
pub fn summarize(
    population: &PopulationResults,
    grid: &TimeGrid,
    ci_low: f64,
    ci_high: f64,
) -> Result<PopulationSummary> {
    check_percentiles(ci_low, ci_high)?;
    if population.is_empty() {
        return Err(SummaryError::EmptyPopulation(population.label.clone()));
    }

    // samples × grid points
    let table: Vec<Vec<f64>> = population
        .samples
        .iter()
        .map(|sample| sample.ne_at(&grid.times))
        .collect();

    let n_times = grid.len();
    let mut median = Vec::with_capacity(n_times);
    let mut low = Vec::with_capacity(n_times);
    let mut high = Vec::with_capacity(n_times);

    let mut column = Vec::with_capacity(table.len());
    for j in 0..n_times {
        column.clear();
        column.extend(table.iter().map(|row| row[j]));
        column.sort_unstable_by(f64::total_cmp);

        median.push(percentile_sorted(&column, 50.0));
        low.push(percentile_sorted(&column, ci_low));
        high.push(percentile_sorted(&column, ci_high));
    }

    let summary = PopulationSummary {
        label: population.label.clone(),
        median,
        low,
        high,
    };
    let (min, max) = summary.range();
    debug!(
        "Summarized '{}' over {} samples: band {min:.4e}..{max:.4e}",
        summary.label,
        population.len()
    );
    Ok(summary)
}

/// Summarize every population in order.
pub fn summarize_all(
    populations: &[PopulationResults],
    grid: &TimeGrid,
    ci_low: f64,
    ci_high: f64,
) -> Result<Vec<PopulationSummary>> {
    populations
        .iter()
        .map(|pop| summarize(pop, grid, ci_low, ci_high))
        .collect()
}

/// Percentile `p` (0..=100) of an ascending slice, interpolating linearly
/// between the two closest ranks.  Returns NaN for an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = rank - lo as f64;
            if frac == 0.0 {
                sorted[lo]
            } else {
                sorted[lo] + (sorted[hi] - sorted[lo]) * frac
            }
        }
    }
}

fn check_percentiles(low: f64, high: f64) -> Result<()> {
    let valid = (0.0..=100.0).contains(&low) && (0.0..=100.0).contains(&high) && low <= high;
    if valid {
        Ok(())
    } else {
        Err(SummaryError::InvalidPercentiles { low, high })
    }
}
