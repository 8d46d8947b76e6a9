use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{RawSample, SampleFrame};
use crate::error::LoadError;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const VALUE_COLUMN: &str = "value";
pub const LABELS_COLUMN: &str = "labels";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one time-series file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with `timestamp`, `value` and optionally `labels`
/// * `.json`    – `[{ "timestamp": 1700000000, "value": 1.5, "labels": "..." }, ...]`
/// * `.parquet` – flat columns with the same names
///
/// Rows whose `value` is not numeric are dropped and counted in
/// [`SampleFrame::dropped`]; a bad timestamp rejects the whole file.
pub fn load_file(path: &Path) -> Result<SampleFrame, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let frame = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    if frame.dropped > 0 {
        log::warn!(
            "{}: dropped {} row(s) with a non-numeric value",
            path.display(),
            frame.dropped
        );
    }
    log::debug!("{}: {} sample(s)", path.display(), frame.len());
    Ok(frame)
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Parse epoch seconds; fractional seconds are floored.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.floor() as i64)
}

/// Numeric coercion for the `value` column.  `None` means "drop this row".
pub fn coerce_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn non_empty_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Accumulates rows for one file, counting the ones that fail coercion.
struct FrameBuilder {
    samples: Vec<RawSample>,
    dropped: usize,
}

impl FrameBuilder {
    fn new() -> Self {
        Self {
            samples: Vec::new(),
            dropped: 0,
        }
    }

    fn push(&mut self, timestamp: i64, value: Option<f64>, label: Option<String>) {
        match value {
            Some(value) => self.samples.push(RawSample {
                timestamp,
                value,
                label,
            }),
            None => self.dropped += 1,
        }
    }

    fn finish(self, path: &Path, has_labels: bool) -> SampleFrame {
        let mut frame = SampleFrame::new(path, self.samples, has_labels);
        frame.dropped = self.dropped;
        frame
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<SampleFrame, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let ts_idx = column(TIMESTAMP_COLUMN).ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: TIMESTAMP_COLUMN,
    })?;
    let value_idx = column(VALUE_COLUMN).ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: VALUE_COLUMN,
    })?;
    let labels_idx = column(LABELS_COLUMN);

    let mut builder = FrameBuilder::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;

        let raw_ts = record.get(ts_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            path: path.to_path_buf(),
            row: row_no,
            raw: raw_ts.to_string(),
        })?;
        let value = record.get(value_idx).and_then(coerce_value);
        let label = labels_idx
            .and_then(|i| record.get(i))
            .and_then(non_empty_label);

        builder.push(timestamp, value, label);
    }

    Ok(builder.finish(path, labels_idx.is_some()))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the shape `df.to_json(orient='records')` produces.
fn load_json(path: &Path) -> Result<SampleFrame, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = root.as_array().map(|a| a.as_slice()).unwrap_or(&[]);
    let has_labels = records
        .iter()
        .any(|r| r.get(LABELS_COLUMN).is_some());

    let mut builder = FrameBuilder::new();
    for (i, rec) in records.iter().enumerate() {
        let raw_ts = rec.get(TIMESTAMP_COLUMN).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: TIMESTAMP_COLUMN,
        })?;
        let timestamp = json_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            path: path.to_path_buf(),
            row: i,
            raw: raw_ts.to_string(),
        })?;
        let raw_value = rec.get(VALUE_COLUMN).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: VALUE_COLUMN,
        })?;
        let label = rec
            .get(LABELS_COLUMN)
            .and_then(|l| l.as_str())
            .and_then(non_empty_label);

        builder.push(timestamp, json_value(raw_value), label);
    }

    Ok(builder.finish(path, has_labels))
}

fn json_timestamp(val: &JsonValue) -> Option<i64> {
    match val {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        JsonValue::String(s) => parse_timestamp(s),
        _ => None,
    }
}

fn json_value(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => coerce_value(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - `timestamp`: Int32 / Int64 / Float32 / Float64 epoch seconds
/// - `value`: any numeric column, or Utf8 holding numeric strings
/// - `labels` (optional): Utf8
fn load_parquet(path: &Path) -> Result<SampleFrame, LoadError> {
    let parquet_err = |e: &dyn std::fmt::Display| LoadError::Parquet {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| parquet_err(&e))?;
    let has_labels = builder.schema().index_of(LABELS_COLUMN).is_ok();
    let reader = builder.build().map_err(|e| parquet_err(&e))?;

    let mut frame = FrameBuilder::new();
    let mut row_base = 0;

    for batch_result in reader {
        let batch = batch_result.map_err(|e| parquet_err(&e))?;
        let schema = batch.schema();

        let ts_idx = schema
            .index_of(TIMESTAMP_COLUMN)
            .map_err(|_| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: TIMESTAMP_COLUMN,
            })?;
        let value_idx = schema
            .index_of(VALUE_COLUMN)
            .map_err(|_| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: VALUE_COLUMN,
            })?;
        let labels_col = schema
            .index_of(LABELS_COLUMN)
            .ok()
            .map(|i| batch.column(i));

        let ts_col = batch.column(ts_idx);
        let value_col = batch.column(value_idx);

        for row in 0..batch.num_rows() {
            let timestamp =
                arrow_timestamp(ts_col, row).ok_or_else(|| LoadError::BadTimestamp {
                    path: path.to_path_buf(),
                    row: row_base + row,
                    raw: format!("{:?}", ts_col.data_type()),
                })?;
            let value = arrow_value(value_col, row);
            let label = labels_col.and_then(|c| arrow_label(c, row));
            frame.push(timestamp, value, label);
        }
        row_base += batch.num_rows();
    }

    Ok(frame.finish(path, has_labels))
}

// -- Arrow helpers --

fn arrow_timestamp(col: &Arc<dyn Array>, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Int64 => Some(col.as_primitive::<Int64Type>().value(row)),
        DataType::Int32 => Some(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Float64 => {
            let f = col.as_primitive::<Float64Type>().value(row);
            f.is_finite().then(|| f.floor() as i64)
        }
        DataType::Float32 => {
            let f = col.as_primitive::<Float32Type>().value(row) as f64;
            f.is_finite().then(|| f.floor() as i64)
        }
        DataType::Utf8 => parse_timestamp(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => parse_timestamp(col.as_string::<i64>().value(row)),
        _ => None,
    }
}

fn arrow_value(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let v = match col.data_type() {
        DataType::Float64 => col.as_primitive::<Float64Type>().value(row),
        DataType::Float32 => col.as_primitive::<Float32Type>().value(row) as f64,
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row) as f64,
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row) as f64,
        DataType::Utf8 => return coerce_value(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => return coerce_value(col.as_string::<i64>().value(row)),
        _ => return None,
    };
    (!v.is_nan()).then_some(v)
}

fn arrow_label(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => non_empty_label(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => non_empty_label(col.as_string::<i64>().value(row)),
        _ => None,
    }
}
