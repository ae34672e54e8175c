use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{PopulationResults, SizeHistory};
use crate::config::PopulationSource;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the posterior samples of every population, preserving input order.
pub fn load_populations(sources: &[PopulationSource]) -> Result<Vec<PopulationResults>> {
    sources
        .iter()
        .map(|src| {
            let samples = load_file(&src.path)
                .with_context(|| format!("loading population '{}'", src.label))?;
            info!(
                "Loaded {} posterior samples for '{}' from {}",
                samples.len(),
                src.label,
                src.path.display()
            );
            Ok(PopulationResults::new(src.label.clone(), samples))
        })
        .collect()
}

/// Load posterior size histories from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – list columns `t` and `ne` (or `c`)
/// * `.json`    – `[{ "t": [...], "ne": [...] }, ...]`
/// * `.csv`     – columns `t` and `ne` (or `c`) containing semicolon-separated floats
///
/// A `c` column holds coalescent rates and is converted with `Ne = 1 / (2c)`.
pub fn load_file(path: &Path) -> Result<Vec<SizeHistory>> {
    if !path.is_file() {
        bail!("cannot access result file {}", path.display());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let samples = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("reading {}", path.display()))?;

    if samples.is_empty() {
        bail!("{} contains no posterior samples", path.display());
    }
    Ok(samples)
}

// ---------------------------------------------------------------------------
// Size column: either Ne directly or coalescent rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeColumn {
    Ne,
    CoalescentRate,
}

impl SizeColumn {
    fn name(self) -> &'static str {
        match self {
            SizeColumn::Ne => "ne",
            SizeColumn::CoalescentRate => "c",
        }
    }

    /// Pick the size column from the available names, preferring `ne`.
    fn detect<'a>(names: impl Iterator<Item = &'a str>) -> Option<Self> {
        let mut found = None;
        for name in names {
            match name {
                "ne" => return Some(SizeColumn::Ne),
                "c" => found = Some(SizeColumn::CoalescentRate),
                _ => {}
            }
        }
        found
    }

    fn build(self, t: Vec<f64>, values: Vec<f64>) -> Result<SizeHistory> {
        match self {
            SizeColumn::Ne => SizeHistory::new(t, values),
            SizeColumn::CoalescentRate => SizeHistory::from_coalescent_rates(t, values),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (one record per posterior sample):
///
/// ```json
/// [
///   { "t": [0.0, 120.5, ...], "ne": [10234.0, 9876.1, ...] },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<SizeHistory>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;

            let size_col = SizeColumn::detect(obj.keys().map(String::as_str))
                .with_context(|| format!("Row {i}: missing 'ne' or 'c' array"))?;

            let t = json_array_to_f64(obj.get("t"), i, "t")?;
            let values = json_array_to_f64(obj.get(size_col.name()), i, size_col.name())?;

            size_col
                .build(t, values)
                .with_context(|| format!("Row {i}: invalid size history"))
        })
        .collect()
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one row per posterior sample.
/// `t` and `ne` (or `c`) columns contain semicolon-separated floats:
///   `"0;120.5;410.2"`, `"10234;9876.1;15000"`
/// All other columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<SizeHistory>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let t_idx = headers
        .iter()
        .position(|h| h == "t")
        .context("CSV missing 't' column")?;
    let size_col = SizeColumn::detect(headers.iter().map(String::as_str))
        .context("CSV missing 'ne' or 'c' column")?;
    let size_idx = headers
        .iter()
        .position(|h| h == size_col.name())
        .context("CSV missing size column")?;

    let mut samples = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let t = parse_semicolon_floats(record.get(t_idx).unwrap_or(""), row_no, "t")?;
        let values = parse_semicolon_floats(
            record.get(size_idx).unwrap_or(""),
            row_no,
            size_col.name(),
        )?;

        let history = size_col
            .build(t, values)
            .with_context(|| format!("CSV row {row_no}: invalid size history"))?;
        samples.push(history);
    }

    Ok(samples)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of posterior samples.
///
/// Expected schema:
/// - `t`: List<Float64> or LargeList<Float64> – breakpoints
/// - `ne` or `c`: List<Float64> or LargeList<Float64> – per-epoch sizes or rates
/// - Any other columns are ignored
fn load_parquet(path: &Path) -> Result<Vec<SizeHistory>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut samples = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let t_idx = schema
            .index_of("t")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 't' column"))?;
        let size_col = SizeColumn::detect(schema.fields().iter().map(|f| f.name().as_str()))
            .context("Parquet file missing 'ne' or 'c' column")?;
        let size_idx = schema
            .index_of(size_col.name())
            .map_err(|_| anyhow::anyhow!("Parquet file missing size column"))?;

        let t_col = batch.column(t_idx);
        let size_values = batch.column(size_idx);

        for row in 0..batch.num_rows() {
            let t = extract_f64_list(t_col, row)
                .with_context(|| format!("Row {row}: failed to read 't'"))?;
            let values = extract_f64_list(size_values, row)
                .with_context(|| format!("Row {row}: failed to read '{}'", size_col.name()))?;

            let history = size_col
                .build(t, values)
                .with_context(|| format!("Row {row}: invalid size history"))?;
            samples.push(history);
        }
    }

    Ok(samples)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Nulls inside a list become NaN and are rejected by SizeHistory.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use arrow::array::{Float64Builder, ListBuilder};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::DemographicModel;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "a.json",
            r#"[{"t": [0, 1, 10], "ne": [5, 6, 7], "seed": 3},
                {"t": [0, 2], "c": [0.5, 0.25]}]"#,
        );
        let samples = load_file(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time_support(), &[0.0, 1.0, 10.0]);
        assert_eq!(samples[0].ne_at(&[0.0, 1.0, 10.0]), vec![5.0, 6.0, 7.0]);
        assert_eq!(samples[1].ne_at(&[0.0, 2.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn loads_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csv", "id,t,ne\n0,0;1;10,5;6;7\n1,0;3,8;9\n");
        let samples = load_file(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].time_support(), &[0.0, 3.0]);
        assert_eq!(samples[1].ne_at(&[0.0, 3.0]), vec![8.0, 9.0]);
    }

    #[test]
    fn loads_parquet_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.parquet");

        let mut t_builder = ListBuilder::new(Float64Builder::new());
        let mut ne_builder = ListBuilder::new(Float64Builder::new());
        for (t, ne) in [(vec![0.0, 1.0], vec![3.0, 4.0]), (vec![0.0, 5.0], vec![6.0, 7.0])] {
            t_builder.values().append_slice(&t);
            t_builder.append(true);
            ne_builder.values().append_slice(&ne);
            ne_builder.append(true);
        }
        let item = Arc::new(Field::new("item", DataType::Float64, true));
        let schema = Arc::new(Schema::new(vec![
            Field::new("t", DataType::List(item.clone()), false),
            Field::new("ne", DataType::List(item), false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(t_builder.finish()), Arc::new(ne_builder.finish())],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let samples = load_file(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].ne_at(&[10.0]), vec![7.0]);
    }

    #[test]
    fn loads_float32_lists_from_pq_extension() {
        use arrow::array::Float32Builder;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pq");

        let mut t_builder = ListBuilder::new(Float32Builder::new());
        let mut c_builder = ListBuilder::new(Float32Builder::new());
        t_builder.values().append_slice(&[0.0, 4.0]);
        t_builder.append(true);
        c_builder.values().append_slice(&[0.5, 0.25]);
        c_builder.append(true);

        let item = Arc::new(Field::new("item", DataType::Float32, true));
        let schema = Arc::new(Schema::new(vec![
            Field::new("t", DataType::List(item.clone()), false),
            Field::new("c", DataType::List(item), false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(t_builder.finish()), Arc::new(c_builder.finish())],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let samples = load_file(&path).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].time_support(), &[0.0, 4.0]);
        assert_eq!(samples[0].ne_at(&[1.0, 5.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn infinite_times_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write(&dir, "inf.csv", "t,ne\n0;1;inf,5;6;7\n");
        let err = load_file(&csv).unwrap_err();
        assert!(format!("{err:#}").contains("not a finite time"), "{err:#}");

        let json = write(&dir, "huge.json", r#"[{"t": [0, 1, 1e999], "ne": [5, 6, 7]}]"#);
        assert!(load_file(&json).is_err());
    }

    #[test]
    fn missing_file_is_an_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot access"));
    }

    #[test]
    fn malformed_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let not_json = write(&dir, "bad.json", "{ not json");
        assert!(load_file(&not_json).is_err());

        let mismatched = write(&dir, "len.json", r#"[{"t": [0, 1], "ne": [5]}]"#);
        let err = load_file(&mismatched).unwrap_err();
        assert!(format!("{err:#}").contains("Row 0"));

        let no_size = write(&dir, "nosize.csv", "t\n0;1\n");
        assert!(load_file(&no_size).is_err());
    }

    #[test]
    fn empty_collection_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "empty.json", "[]");
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "results.pkl", "");
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn populations_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = write(&dir, "b.json", r#"[{"t": [0, 1], "ne": [1, 2]}]"#);
        let a = write(&dir, "a.json", r#"[{"t": [0, 1], "ne": [3, 4]}]"#);
        let sources = vec![
            PopulationSource::new("B", b),
            PopulationSource::new("A", a),
        ];
        let pops = load_populations(&sources).unwrap();
        let labels: Vec<&str> = pops.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["B", "A"]);
    }
}
