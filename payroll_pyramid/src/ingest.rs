//! Loading payroll rows from local files.
//!
//! CSV goes through polars; JSON accepts either a bare array of records or
//! the API envelope `{ "data": [...] }`.

use crate::record::PayrollRecord;
use crate::PyramidError;
use polars::prelude::*;
use serde_json::{Map, Number, Value};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Reads a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<Vec<PayrollRecord>, PyramidError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;
    records_from_dataframe(&df)
}

pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<Vec<PayrollRecord>, PyramidError> {
    let df = CsvReader::new(Cursor::new(bytes)).finish()?;
    records_from_dataframe(&df)
}

/// One record per row. Null cells become JSON `null`; numeric columns stay numeric.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<PayrollRecord>, PyramidError> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        columns.push((column.name().to_string(), column_values(column)?));
    }

    let records = (0..df.height())
        .map(|row| {
            let mut map = Map::new();
            for (name, values) in &columns {
                map.insert(name.clone(), values[row].clone());
            }
            PayrollRecord::from(map)
        })
        .collect::<Vec<_>>();

    debug!(rows = records.len(), columns = columns.len(), "read payroll rows from frame");
    Ok(records)
}

fn column_values(column: &Column) -> Result<Vec<Value>, PyramidError> {
    let series = column.as_materialized_series();
    let dtype = series.dtype();
    if dtype.is_integer() || dtype.is_float() {
        let floats = series.cast(&DataType::Float64)?;
        Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map_or(Value::Null, Value::Number))
            .collect())
    } else {
        let strings = series.cast(&DataType::String)?;
        Ok(strings
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect())
    }
}

/// Parses a JSON document into records.
pub fn parse_json(text: &str) -> Result<Vec<PayrollRecord>, PyramidError> {
    let value: Value = serde_json::from_str(text)?;
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(PyramidError::InvalidInput(
                    "expected a JSON array or an object with a \"data\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(PyramidError::InvalidInput(
                "expected a JSON array or an object with a \"data\" array".to_string(),
            ))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(map) => Ok(PayrollRecord::from(map)),
            other => Err(PyramidError::InvalidInput(format!(
                "record {i} is not an object: {other}"
            ))),
        })
        .collect()
}

/// Dispatches on extension: `.json` is parsed as JSON, everything else as CSV.
pub fn read_records(path: &Path) -> Result<Vec<PayrollRecord>, PyramidError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let text = std::fs::read_to_string(path)?;
        parse_json(&text)
    } else {
        read_csv(path)
    }
}
