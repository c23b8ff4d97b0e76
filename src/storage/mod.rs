//! Tabular ingest/export (Arrow/Parquet)
//!
//! Precomputed scores arrive as columnar tables; this module maps them onto
//! the typed [`ScoreTable`](crate::score::ScoreTable) and back.
//!
//! ## Long-format table schema
//!
//! | Column        | Type              | Required | Notes                          |
//! |---------------|-------------------|----------|--------------------------------|
//! | `sample_id`   | `Utf8` or `Int64` | yes      | integers are stringified       |
//! | `class`       | `Utf8`            | yes      |                                |
//! | `coding`      | `Utf8`            | yes      | `encoding` / `decoding`        |
//! | `alpha`       | `Float64`         | yes      |                                |
//! | `performance` | `Float64`         | yes      | nullable; nulls stay missing   |
//! | `capacity`    | `Float64`         | yes      | nullable; nulls stay missing   |
//! | `n_nodes`     | `Float64`/`Int64` | yes      |                                |
//! | `analysis`    | `Utf8`            | yes      |                                |
//!
//! An absent column is a [`MissingColumn`](crate::Error::MissingColumn)
//! error — this ingest path is the one place where that error is real and
//! never absorbed.

use crate::score::{
    Channel, Coding, MergedTable, Metric, ScoreRecord, ScoreTable, MERGED_COLUMN_ORDER,
};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Arrow schema of the long-format score table (export shape).
#[must_use]
pub fn score_schema() -> Schema {
    Schema::new(vec![
        Field::new("sample_id", DataType::Utf8, false),
        Field::new("class", DataType::Utf8, false),
        Field::new("coding", DataType::Utf8, false),
        Field::new("alpha", DataType::Float64, false),
        Field::new("performance", DataType::Float64, true),
        Field::new("capacity", DataType::Float64, true),
        Field::new("n_nodes", DataType::Float64, false),
        Field::new("analysis", DataType::Utf8, false),
    ])
}

/// Arrow schema of the wide-format merged table (export shape).
#[must_use]
pub fn merged_schema() -> Schema {
    let fields: Vec<Field> = MERGED_COLUMN_ORDER
        .iter()
        .map(|&name| match name {
            "sample_id" | "class" | "analysis" => Field::new(name, DataType::Utf8, false),
            _ => Field::new(name, DataType::Float64, false),
        })
        .collect();
    Schema::new(fields)
}

/// Load a long-format score table from a Parquet file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed, or the table lacks a
/// required column.
pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<ScoreTable> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;

    let file = File::open(path.as_ref())
        .map_err(|e| Error::Storage(format!("Failed to open Parquet file: {e}")))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::Storage(format!("Failed to parse Parquet file: {e}")))?;

    let reader = builder
        .build()
        .map_err(|e| Error::Storage(format!("Failed to create Parquet reader: {e}")))?;

    let mut table = ScoreTable::new();
    for batch in reader {
        let batch =
            batch.map_err(|e| Error::Storage(format!("Failed to read record batch: {e}")))?;
        table.extend(records_from_batch(&batch)?);
    }

    debug!(rows = table.len(), "loaded score table from parquet");
    Ok(table)
}

/// Write a long-format score table to a Parquet file.
///
/// # Errors
///
/// Returns error if the file cannot be created or written.
pub fn write_parquet<P: AsRef<Path>>(table: &ScoreTable, path: P) -> Result<()> {
    use parquet::arrow::ArrowWriter;
    use std::fs::File;

    let file = File::create(path.as_ref())
        .map_err(|e| Error::Storage(format!("Failed to create Parquet file: {e}")))?;

    let batch = to_record_batch(table)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| Error::Storage(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::Storage(format!("Failed to write record batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::Storage(format!("Failed to finalize Parquet file: {e}")))?;
    Ok(())
}

/// Decode one Arrow batch into score records.
///
/// # Errors
///
/// Returns [`Error::MissingColumn`] for absent columns and
/// [`Error::Storage`] for unsupported column types.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<ScoreRecord>> {
    let sample_ids = string_or_int_column(batch, "sample_id")?;
    let classes = string_column(batch, "class")?;
    let codings = string_column(batch, "coding")?;
    let alphas = float_column(batch, "alpha")?;
    let performances = nullable_float_column(batch, "performance")?;
    let capacities = nullable_float_column(batch, "capacity")?;
    let n_nodes = float_or_int_column(batch, "n_nodes")?;
    let analyses = string_column(batch, "analysis")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let coding: Coding = codings[row].parse()?;
        let mut builder =
            ScoreRecord::builder(sample_ids[row].clone(), classes[row].clone(), coding, alphas[row])
                .n_nodes(n_nodes[row])
                .analysis(analyses[row].clone());
        if let Some(performance) = performances[row] {
            builder = builder.performance(performance);
        }
        if let Some(capacity) = capacities[row] {
            builder = builder.capacity(capacity);
        }
        records.push(builder.build());
    }
    Ok(records)
}

/// Encode a score table as one Arrow batch with the [`score_schema`] layout.
///
/// # Errors
///
/// Returns error if Arrow rejects the assembled columns (schema drift).
pub fn to_record_batch(table: &ScoreTable) -> Result<RecordBatch> {
    let records = table.records();
    let sample_ids = StringArray::from_iter_values(records.iter().map(ScoreRecord::sample_id));
    let classes = StringArray::from_iter_values(records.iter().map(ScoreRecord::class));
    let codings =
        StringArray::from_iter_values(records.iter().map(|r| r.coding().to_string()));
    let alphas = Float64Array::from_iter_values(records.iter().map(ScoreRecord::alpha));
    let performances: Float64Array = records.iter().map(ScoreRecord::performance).collect();
    let capacities: Float64Array = records.iter().map(ScoreRecord::capacity).collect();
    let n_nodes = Float64Array::from_iter_values(records.iter().map(ScoreRecord::n_nodes));
    let analyses = StringArray::from_iter_values(records.iter().map(ScoreRecord::analysis));

    let batch = RecordBatch::try_new(
        Arc::new(score_schema()),
        vec![
            Arc::new(sample_ids),
            Arc::new(classes),
            Arc::new(codings),
            Arc::new(alphas),
            Arc::new(performances),
            Arc::new(capacities),
            Arc::new(n_nodes),
            Arc::new(analyses),
        ],
    )?;
    Ok(batch)
}

/// Encode a merged table as one Arrow batch in the fixed wide column order.
///
/// # Errors
///
/// Returns error if Arrow rejects the assembled columns (schema drift).
pub fn merged_to_record_batch(table: &MergedTable) -> Result<RecordBatch> {
    let records = table.records();
    let score_column = |channel, metric| {
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(move |r| r.value(channel, metric)),
        )) as ArrayRef
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.sample_id()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.class()),
        )),
        score_column(Channel::Encoding, Metric::Performance),
        score_column(Channel::Decoding, Metric::Performance),
        score_column(Channel::Coding, Metric::Performance),
        score_column(Channel::Encoding, Metric::Capacity),
        score_column(Channel::Decoding, Metric::Capacity),
        score_column(Channel::Coding, Metric::Capacity),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.n_nodes()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.analysis()),
        )),
    ];

    let batch = RecordBatch::try_new(Arc::new(merged_schema()), columns)?;
    Ok(batch)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let array = column(batch, name)?;
    let strings = array
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| type_error(name, "Utf8", array.data_type()))?;
    Ok((0..strings.len()).map(|i| strings.value(i).to_string()).collect())
}

/// Sample identifiers may be strings or integers; integers are stringified.
fn string_or_int_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let array = column(batch, name)?;
    match array.data_type() {
        DataType::Utf8 => string_column(batch, name),
        DataType::Int64 => {
            let ints = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| type_error(name, "Int64", array.data_type()))?;
            Ok((0..ints.len()).map(|i| ints.value(i).to_string()).collect())
        }
        other => Err(type_error(name, "Utf8 or Int64", other)),
    }
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = column(batch, name)?;
    let floats = array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| type_error(name, "Float64", array.data_type()))?;
    Ok((0..floats.len()).map(|i| floats.value(i)).collect())
}

#[allow(clippy::cast_precision_loss)]
fn float_or_int_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = column(batch, name)?;
    match array.data_type() {
        DataType::Float64 => float_column(batch, name),
        DataType::Int64 => {
            let ints = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| type_error(name, "Int64", array.data_type()))?;
            Ok((0..ints.len()).map(|i| ints.value(i) as f64).collect())
        }
        other => Err(type_error(name, "Float64 or Int64", other)),
    }
}

fn nullable_float_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column(batch, name)?;
    let floats = array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| type_error(name, "Float64", array.data_type()))?;
    Ok((0..floats.len())
        .map(|i| (!floats.is_null(i)).then(|| floats.value(i)))
        .collect())
}

fn type_error(name: &str, expected: &str, actual: &DataType) -> Error {
    Error::Storage(format!(
        "Column '{name}' has type {actual}, expected {expected}"
    ))
}
