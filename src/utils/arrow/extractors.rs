//! Column extraction utilities for Arrow record batches
//!
//! Each extractor reads one whole column as canonical Rust values. Absent
//! optional columns come back as `None` so callers can apply their defaults.

use arrow::array::{Array, BooleanArray, Date32Array, Float64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::Result;
use crate::utils::arrow::array_utils::{downcast_array, get_column};

/// Column of optional values, `None` when the column itself is absent
pub type Column<T> = Option<Vec<Option<T>>>;

/// Extract a column as trimmed strings; empty strings read as NULL
pub fn extract_strings(batch: &RecordBatch, column_name: &str, required: bool) -> Result<Column<String>> {
    let Some(array) = get_column(batch, column_name, &DataType::Utf8, required)? else {
        return Ok(None);
    };
    let strings = downcast_array::<StringArray>(&array, column_name, "String")?;
    Ok(Some(
        strings
            .iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
            .collect(),
    ))
}

/// Extract a column as 64-bit floats
pub fn extract_float64s(batch: &RecordBatch, column_name: &str, required: bool) -> Result<Column<f64>> {
    let Some(array) = get_column(batch, column_name, &DataType::Float64, required)? else {
        return Ok(None);
    };
    let floats = downcast_array::<Float64Array>(&array, column_name, "Float64")?;
    Ok(Some(floats.iter().collect()))
}

/// Extract a column as booleans
pub fn extract_booleans(batch: &RecordBatch, column_name: &str, required: bool) -> Result<Column<bool>> {
    let Some(array) = get_column(batch, column_name, &DataType::Boolean, required)? else {
        return Ok(None);
    };
    let bools = downcast_array::<BooleanArray>(&array, column_name, "Boolean")?;
    Ok(Some(bools.iter().collect()))
}

/// Extract a column as calendar dates (Date32)
pub fn extract_dates(batch: &RecordBatch, column_name: &str, required: bool) -> Result<Column<NaiveDate>> {
    let Some(array) = get_column(batch, column_name, &DataType::Date32, required)? else {
        return Ok(None);
    };
    let dates = downcast_array::<Date32Array>(&array, column_name, "Date32")?;
    Ok(Some(
        (0..dates.len())
            .map(|i| {
                if dates.is_null(i) {
                    None
                } else {
                    dates.value_as_date(i)
                }
            })
            .collect(),
    ))
}
