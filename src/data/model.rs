use anyhow::{bail, Result};

// ---------------------------------------------------------------------------
// DemographicModel – the time → Ne capability of one posterior sample
// ---------------------------------------------------------------------------

/// A demographic history that can be queried for effective population size.
pub trait DemographicModel {
    /// Breakpoints of the history, starting at the origin.
    fn time_support(&self) -> &[f64];

    /// Effective population size at each of the given times.
    fn ne_at(&self, times: &[f64]) -> Vec<f64>;
}

// ---------------------------------------------------------------------------
// SizeHistory – one posterior sample
// ---------------------------------------------------------------------------

/// Piecewise-constant Ne trajectory.
///
/// `ne[i]` holds on `[t[i], t[i + 1])`; the last value extends to infinity.
/// Queries before `t[0]` take the first value.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeHistory {
    t: Vec<f64>,
    ne: Vec<f64>,
}

impl SizeHistory {
    /// Build a history from breakpoints and per-epoch effective sizes.
    pub fn new(t: Vec<f64>, ne: Vec<f64>) -> Result<Self> {
        if t.is_empty() {
            bail!("size history has no time points");
        }
        if t.len() != ne.len() {
            bail!("t has {} values but ne has {}", t.len(), ne.len());
        }
        if let Some((i, v)) = t.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            bail!("t[{i}] = {v} is not a finite time");
        }
        if let Some(i) = t.windows(2).position(|w| !(w[0] <= w[1])) {
            bail!("t is not sorted at index {}: {} > {}", i + 1, t[i], t[i + 1]);
        }
        if let Some((i, v)) = ne
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            bail!("ne[{i}] = {v} is not a positive finite size");
        }
        Ok(SizeHistory { t, ne })
    }

    /// Build a history from coalescent rates, `Ne = 1 / (2c)`.
    pub fn from_coalescent_rates(t: Vec<f64>, c: Vec<f64>) -> Result<Self> {
        if let Some((i, v)) = c.iter().enumerate().find(|(_, v)| !(**v > 0.0)) {
            bail!("c[{i}] = {v} is not a positive coalescent rate");
        }
        let ne = c.iter().map(|&ci| 1.0 / (2.0 * ci)).collect();
        Self::new(t, ne)
    }

    fn ne_at_time(&self, time: f64) -> f64 {
        // Index of the last breakpoint <= time.
        let idx = self.t.partition_point(|&ti| ti <= time).saturating_sub(1);
        self.ne[idx]
    }
}

impl DemographicModel for SizeHistory {
    fn time_support(&self) -> &[f64] {
        &self.t
    }

    fn ne_at(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&time| self.ne_at_time(time)).collect()
    }
}

// ---------------------------------------------------------------------------
// PopulationResults – all posterior samples for one population
// ---------------------------------------------------------------------------

/// Posterior samples loaded for one named population.
#[derive(Debug, Clone)]
pub struct PopulationResults {
    pub label: String,
    pub samples: Vec<SizeHistory>,
}

impl PopulationResults {
    pub fn new(label: impl Into<String>, samples: Vec<SizeHistory>) -> Self {
        PopulationResults {
            label: label.into(),
            samples,
        }
    }

    /// Number of posterior samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> SizeHistory {
        SizeHistory::new(vec![0.0, 10.0, 100.0], vec![1000.0, 200.0, 5000.0]).unwrap()
    }

    #[test]
    fn evaluates_piecewise_constant_epochs() {
        let h = history();
        let ne = h.ne_at(&[0.0, 5.0, 10.0, 99.9, 100.0, 1e9]);
        assert_eq!(ne, vec![1000.0, 1000.0, 200.0, 200.0, 5000.0, 5000.0]);
    }

    #[test]
    fn queries_before_origin_use_first_epoch() {
        let h = SizeHistory::new(vec![1.0, 2.0], vec![7.0, 9.0]).unwrap();
        assert_eq!(h.ne_at(&[0.5]), vec![7.0]);
    }

    #[test]
    fn coalescent_rates_convert_to_ne() {
        let h = SizeHistory::from_coalescent_rates(vec![0.0, 1.0], vec![0.5, 0.25]).unwrap();
        assert_eq!(h.ne_at(&[0.0, 1.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn rejects_malformed_histories() {
        assert!(SizeHistory::new(vec![], vec![]).is_err());
        assert!(SizeHistory::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(SizeHistory::new(vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 1.0]).is_err());
        assert!(SizeHistory::new(vec![0.0, 1.0], vec![1.0, 0.0]).is_err());
        assert!(SizeHistory::new(vec![0.0, 1.0], vec![1.0, f64::NAN]).is_err());
        assert!(SizeHistory::from_coalescent_rates(vec![0.0], vec![0.0]).is_err());
    }

    #[test]
    fn rejects_non_finite_times_and_overflowing_rates() {
        let err = SizeHistory::new(vec![0.0, 1.0, f64::INFINITY], vec![5.0, 6.0, 7.0]).unwrap_err();
        assert!(err.to_string().contains("t[2]"), "{err}");
        assert!(SizeHistory::new(vec![f64::NEG_INFINITY, 1.0], vec![5.0, 6.0]).is_err());
        // 1 / (2c) overflows to infinity for subnormal rates
        assert!(SizeHistory::from_coalescent_rates(vec![0.0], vec![1e-320]).is_err());
    }

    #[test]
    fn exposes_time_support() {
        assert_eq!(history().time_support(), &[0.0, 10.0, 100.0]);
    }
}
