use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::description::parse_entries;
use super::model::SignatureTable;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a signature library from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` / `.txt` / `.sig` – a signature description, `{"Veg": [...], ...}`
/// * `.csv`     – columns `name` and `values`, values semicolon-separated
/// * `.parquet` – `name` string column and `values` list column
///
/// Endmembers keep the order in which they appear in the file.
pub fn load_signature_library(path: &Path) -> Result<SignatureTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let entries = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "csv" => load_csv(path)?,
        "json" | "txt" | "sig" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading signature description {}", path.display()))?;
            parse_entries(&text)
                .with_context(|| format!("parsing signature description {}", path.display()))?
        }
        other => bail!("Unsupported file extension: .{other}"),
    };

    let table = SignatureTable::from_entries(entries)
        .with_context(|| format!("building signature table from {}", path.display()))?;
    info!("loaded {table} from {}", path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `name` holds the endmember name, `values` the band values separated by
/// semicolons: `"Veg","16.9;19.8;14.5"`.  Other columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let name_idx = headers
        .iter()
        .position(|h| h == "name")
        .context("CSV missing 'name' column")?;
    let values_idx = headers
        .iter()
        .position(|h| h == "values")
        .context("CSV missing 'values' column")?;

    let mut entries = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        let values = parse_semicolon_floats(record.get(values_idx).unwrap_or(""), row_no)?;
        entries.push((name, values));
    }

    Ok(entries)
}

fn parse_semicolon_floats(s: &str, row: usize) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, values[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet signature library.
///
/// Expected schema:
/// - `name`: Utf8 or LargeUtf8 – endmember names
/// - `values`: List<Float64|Float32> or LargeList<..> – band values
fn load_parquet(path: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut entries = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let name_idx = schema
            .index_of("name")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'name' column"))?;
        let values_idx = schema
            .index_of("values")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'values' column"))?;

        let name_col = batch.column(name_idx);
        let values_col = batch.column(values_idx);

        for row in 0..batch.num_rows() {
            let name = extract_string(name_col, row)
                .with_context(|| format!("Row {row}: failed to read 'name'"))?;
            let values = extract_f64_list(values_col, row)
                .with_context(|| format!("Row {row}: failed to read 'values'"))?;
            entries.push((name, values));
        }
    }

    Ok(entries)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null endmember name");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 name column, got {other:?}"),
    }
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

    // A signature with a missing band is unusable.
    if values_array.null_count() > 0 {
        bail!("signature contains null band values");
    }
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.values().to_vec())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.values().iter().map(|&v| v as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}
