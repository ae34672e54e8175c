//! Summary statistics over posterior samples: the shared time grid and the
//! per-population median / credible interval curves.

pub mod export;
pub mod stats;
pub mod time_grid;

use thiserror::Error;

/// Errors raised while building the grid or summarizing a population.
#[derive(Error, Debug, PartialEq)]
pub enum SummaryError {
    #[error("no time points left after dropping the leading origin of every sample")]
    EmptyTimeSupport,

    #[error("smallest pooled time {0} is not positive; log spacing is undefined")]
    NonPositiveTime(f64),

    #[error("pooled time {0} is not finite")]
    NonFiniteTime(f64),

    #[error("time grid must have at least one point")]
    EmptyGrid,

    #[error("population '{0}' has no posterior samples")]
    EmptyPopulation(String),

    #[error("percentiles must satisfy 0 <= low <= high <= 100, got {low}..{high}")]
    InvalidPercentiles { low: f64, high: f64 },
}

pub type Result<T> = core::result::Result<T, SummaryError>;
