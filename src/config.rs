use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_N_TIMES: usize = 1000;
pub const DEFAULT_CI_LOW: f64 = 5.0;
pub const DEFAULT_CI_HIGH: f64 = 95.0;
pub const DEFAULT_OUTPUT_DIR: &str = "plots";
pub const DEFAULT_LABELS: [&str; 4] = ["A", "B", "C", "D"];

// ---------------------------------------------------------------------------
// PopulationSource – one label → result file entry
// ---------------------------------------------------------------------------

/// A population label and the file holding its posterior samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSource {
    pub label: String,
    pub path: PathBuf,
}

impl PopulationSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PopulationSource {
            label: label.into(),
            path: path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FigureStyle – physical size of the rendered chart
// ---------------------------------------------------------------------------

/// Figure size in inches and raster resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureStyle {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        FigureStyle {
            width_in: 10.0,
            height_in: 7.0,
            dpi: 300,
        }
    }
}

impl FigureStyle {
    /// Raster size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    /// Convert a length in points (1/72 inch) to pixels.
    pub fn points(&self, pt: f64) -> f64 {
        pt * self.dpi as f64 / 72.0
    }
}

// ---------------------------------------------------------------------------
// PlotConfig
// ---------------------------------------------------------------------------

/// Everything the comparison run needs.  Population order drives colours,
/// legend order and the output file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub populations: Vec<PopulationSource>,
    pub n_times: usize,
    pub ci_low: f64,
    pub ci_high: f64,
    pub output_dir: PathBuf,
    pub figure: FigureStyle,
    /// Optional CSV export of the per-population summary curves.
    pub summary_csv: Option<PathBuf>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            populations: DEFAULT_LABELS
                .iter()
                .map(|label| {
                    PopulationSource::new(
                        *label,
                        Path::new("results")
                            .join(label)
                            .join("models")
                            .join("phlash_results.parquet"),
                    )
                })
                .collect(),
            n_times: DEFAULT_N_TIMES,
            ci_low: DEFAULT_CI_LOW,
            ci_high: DEFAULT_CI_HIGH,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            figure: FigureStyle::default(),
            summary_csv: None,
        }
    }
}

impl PlotConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PlotConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Population labels in configured order.
    pub fn labels(&self) -> Vec<&str> {
        self.populations.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.populations.is_empty() {
            bail!("no populations configured");
        }
        let mut seen = BTreeSet::new();
        for pop in &self.populations {
            if pop.label.trim().is_empty() {
                bail!("population with path {} has an empty label", pop.path.display());
            }
            if !seen.insert(pop.label.as_str()) {
                bail!("duplicate population label '{}'", pop.label);
            }
        }
        if self.n_times < 2 {
            bail!("n_times must be at least 2, got {}", self.n_times);
        }
        if !(0.0..=100.0).contains(&self.ci_low)
            || !(0.0..=100.0).contains(&self.ci_high)
            || self.ci_low > self.ci_high
        {
            bail!(
                "credible interval bounds must satisfy 0 <= low <= high <= 100, got {}..{}",
                self.ci_low,
                self.ci_high
            );
        }
        let fig = &self.figure;
        if !(fig.width_in > 0.0 && fig.height_in > 0.0) || fig.dpi == 0 {
            bail!(
                "invalid figure size {}x{} in at {} dpi",
                fig.width_in,
                fig.height_in,
                fig.dpi
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlotConfig::default();
        config.validate().unwrap();
        assert_eq!(config.labels(), ["A", "B", "C", "D"]);
        assert_eq!(config.n_times, 1000);
        assert_eq!(config.figure.pixel_size(), (3000, 2100));
    }

    #[test]
    fn partial_json_keeps_defaults_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "populations": [
                    {"label": "North", "path": "n.json"},
                    {"label": "East", "path": "e.json"}
                ],
                "ci_low": 2.5,
                "ci_high": 97.5
            }"#,
        )
        .unwrap();

        let config = PlotConfig::from_file(&path).unwrap();
        assert_eq!(config.labels(), ["North", "East"]);
        assert_eq!(config.ci_low, 2.5);
        assert_eq!(config.n_times, DEFAULT_N_TIMES);
        assert_eq!(config.output_dir, PathBuf::from("plots"));
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut config = PlotConfig::default();
        config.ci_low = 96.0;
        assert!(config.validate().is_err());

        let mut config = PlotConfig::default();
        config.n_times = 1;
        assert!(config.validate().is_err());

        let mut config = PlotConfig::default();
        config.populations.push(PopulationSource::new("A", "dup.json"));
        assert!(config.validate().is_err());

        let mut config = PlotConfig::default();
        config.populations.clear();
        assert!(config.validate().is_err());

        let mut config = PlotConfig::default();
        config.figure.dpi = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn points_scale_with_dpi() {
        let style = FigureStyle::default();
        assert_eq!(style.points(72.0), 300.0);
    }
}
