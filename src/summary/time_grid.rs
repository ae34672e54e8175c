use log::{info, warn};

use super::{Result, SummaryError};
use crate::data::model::{DemographicModel, PopulationResults};

// ---------------------------------------------------------------------------
// TimeGrid – shared log-spaced time axis
// ---------------------------------------------------------------------------

/// Time points (generations) at which every population is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    pub times: Vec<f64>,
}

impl TimeGrid {
    /// Pool the time supports of every sample of every population (skipping
    /// each sample's leading origin) and log-space `n_points` between the
    /// pooled minimum and maximum.
    pub fn from_populations(populations: &[PopulationResults], n_points: usize) -> Result<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut pooled = 0usize;

        for pop in populations {
            let mut nonzero_origin = false;
            for sample in &pop.samples {
                let support = sample.time_support();
                nonzero_origin |= support.first().is_some_and(|&t0| t0 != 0.0);
                for &t in support.iter().skip(1) {
                    min = min.min(t);
                    max = max.max(t);
                    pooled += 1;
                }
            }
            if nonzero_origin {
                warn!(
                    "Population '{}' has samples whose time support does not start at 0; \
                     the first time point is dropped anyway",
                    pop.label
                );
            }
        }

        if pooled == 0 {
            return Err(SummaryError::EmptyTimeSupport);
        }
        if min <= 0.0 {
            return Err(SummaryError::NonPositiveTime(min));
        }
        if !max.is_finite() {
            return Err(SummaryError::NonFiniteTime(max));
        }

        let times = geomspace(min, max, n_points)?;
        info!("Time grid: {n_points} points from {min:.4e} to {max:.4e} generations");
        Ok(TimeGrid { times })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// `n` points in geometric progression from `start` to `stop`, endpoints exact.
pub fn geomspace(start: f64, stop: f64, n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(SummaryError::EmptyGrid);
    }
    if start <= 0.0 {
        return Err(SummaryError::NonPositiveTime(start));
    }
    if let Some(bad) = [start, stop].into_iter().find(|v| !v.is_finite()) {
        return Err(SummaryError::NonFiniteTime(bad));
    }
    if n == 1 || start == stop {
        return Ok(vec![start; n]);
    }

    let log_start = start.ln();
    let step = (stop.ln() - log_start) / (n - 1) as f64;
    let mut times: Vec<f64> = (0..n)
        .map(|i| (log_start + step * i as f64).exp())
        .collect();
    times[0] = start;
    times[n - 1] = stop;
    Ok(times)
}
