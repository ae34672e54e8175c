use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// SplitMix64: small, seedable, good enough for synthetic posteriors.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in (0, 1].
    fn unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1u64 << 53) as f64
    }

    /// Multiplicative log-normal noise with log-scale `sigma`.
    fn lognormal(&mut self, sigma: f64) -> f64 {
        let (u1, u2) = (self.unit(), self.unit());
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        (sigma * z).exp()
    }
}

/// Shape of a population's true history: ancient size, bottleneck depth and
/// timing, recent size.
struct Scenario {
    label: &'static str,
    ancient_ne: f64,
    bottleneck_ne: f64,
    bottleneck_t: f64,
    recent_ne: f64,
}

const SCENARIOS: [Scenario; 4] = [
    Scenario {
        label: "A",
        ancient_ne: 20_000.0,
        bottleneck_ne: 3_000.0,
        bottleneck_t: 2_000.0,
        recent_ne: 15_000.0,
    },
    Scenario {
        label: "B",
        ancient_ne: 20_000.0,
        bottleneck_ne: 8_000.0,
        bottleneck_t: 8_000.0,
        recent_ne: 40_000.0,
    },
    Scenario {
        label: "C",
        ancient_ne: 12_000.0,
        bottleneck_ne: 1_500.0,
        bottleneck_t: 500.0,
        recent_ne: 4_000.0,
    },
    Scenario {
        label: "D",
        ancient_ne: 30_000.0,
        bottleneck_ne: 10_000.0,
        bottleneck_t: 20_000.0,
        recent_ne: 25_000.0,
    },
];

const N_SAMPLES: usize = 200;
const N_EPOCHS: usize = 32;
const T_MAX: f64 = 1e6;

/// Log-normal Ne around a smooth bottleneck curve, one value per epoch.
fn sample_history(scenario: &Scenario, rng: &mut SplitMix64) -> (Vec<f64>, Vec<f64>) {
    // Breakpoints: 0, then log-spaced from 10 to T_MAX with per-sample jitter.
    let mut t = vec![0.0];
    for i in 0..N_EPOCHS - 1 {
        let frac = i as f64 / (N_EPOCHS - 2) as f64;
        let base = 10f64.powf(1.0 + frac * (T_MAX.log10() - 1.0));
        t.push(base * rng.lognormal(0.05));
    }
    t[1..].sort_by(f64::total_cmp);

    let shift = rng.lognormal(0.15);
    let ne = t
        .iter()
        .map(|&ti| {
            let x = (ti.max(1.0) / (scenario.bottleneck_t * shift)).log10();
            let dip = (-x * x * 2.0).exp();
            let trend = if x < 0.0 { scenario.recent_ne } else { scenario.ancient_ne };
            let mean = trend * (1.0 - dip) + scenario.bottleneck_ne * dip;
            mean * rng.lognormal(0.2)
        })
        .collect();
    (t, ne)
}

fn write_population(path: &Path, scenario: &Scenario, rng: &mut SplitMix64) -> Result<()> {
    let mut t_builder = ListBuilder::new(Float64Builder::new());
    let mut ne_builder = ListBuilder::new(Float64Builder::new());
    for _ in 0..N_SAMPLES {
        let (t, ne) = sample_history(scenario, rng);
        t_builder.values().append_slice(&t);
        t_builder.append(true);
        ne_builder.values().append_slice(&ne);
        ne_builder.append(true);
    }
    let sample_ids = Int64Array::from_iter_values(0..N_SAMPLES as i64);

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("t", DataType::List(item.clone()), false),
        Field::new("ne", DataType::List(item), false),
        Field::new("sample", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(t_builder.finish()),
            Arc::new(ne_builder.finish()),
            Arc::new(sample_ids),
        ],
    )
    .context("building record batch")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SplitMix64(42);
    let mut populations = Vec::new();

    for scenario in &SCENARIOS {
        let path = Path::new("results")
            .join(scenario.label)
            .join("models")
            .join("phlash_results.parquet");
        write_population(&path, scenario, &mut rng)?;
        log::info!("Wrote population '{}' to {}", scenario.label, path.display());
        populations.push(serde_json::json!({
            "label": scenario.label,
            "path": path,
        }));
    }

    let config = serde_json::json!({
        "populations": populations,
        "n_times": 1000,
        "ci_low": 5.0,
        "ci_high": 95.0,
        "output_dir": "plots",
        "summary_csv": "plots/summary.csv",
    });
    let config_path = "ne_compare.json";
    std::fs::write(config_path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("writing {config_path}"))?;

    println!(
        "Wrote {} populations ({N_SAMPLES} posterior samples, {N_EPOCHS} epochs each) and {config_path}",
        SCENARIOS.len()
    );
    Ok(())
}
