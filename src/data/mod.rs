/// Data layer: posterior sample types and loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv   (one file per population)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<SizeHistory>
///   └──────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ PopulationResults │  label + posterior samples
///   └───────────────────┘
/// ```

pub mod loader;
pub mod model;
