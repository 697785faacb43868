//! Utilities for working with Arrow arrays.
//!
//! Columns are looked up by name and cast to the canonical type the caller
//! expects. Casts are strict: a value that cannot be represented in the target
//! type is an error rather than a silent NULL.

use arrow::array::{Array, ArrayRef};
use arrow::compute::kernels::cast::{CastOptions, can_cast_types, cast_with_options};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{CridError, Result};

/// Get a column from a record batch, cast to `expected_type`
///
/// # Arguments
///
/// * `batch` - The record batch containing the column
/// * `column_name` - The name of the column to extract
/// * `expected_type` - The canonical data type for the column
/// * `required` - Whether a missing column is an error
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column, converted if necessary
/// * `Ok(None)` - The column is absent and not required
pub fn get_column(
    batch: &RecordBatch,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let Ok(idx) = batch.schema().index_of(column_name) else {
        if required {
            return Err(CridError::schema(format!(
                "required column '{column_name}' not found"
            )));
        }
        return Ok(None);
    };

    let column = batch.column(idx);
    let actual_type = column.data_type();
    if actual_type == expected_type {
        return Ok(Some(column.clone()));
    }

    if !can_cast_types(actual_type, expected_type) {
        return Err(CridError::schema(format!(
            "column '{column_name}' has type {actual_type} which cannot be read as {expected_type}"
        )));
    }

    debug!("Casting column '{column_name}' from {actual_type} to {expected_type}");
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    cast_with_options(column, expected_type, &options)
        .map(Some)
        .map_err(|e| {
            CridError::schema(format!(
                "column '{column_name}' could not be cast from {actual_type} to {expected_type}: {e}"
            ))
        })
}

/// Downcast a column to a specific array type with clear error messages
///
/// # Arguments
///
/// * `array` - The array reference to downcast
/// * `column_name` - The name of the column (for error messages)
/// * `expected_type_name` - A human-readable name of the expected type
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        CridError::schema(format!(
            "column '{column_name}' is not a {expected_type_name} array"
        ))
    })
}
