//! Weight table adapter
//!
//! Weight definitions are read from a JSON array of objects or from Parquet,
//! selected by file extension, and validated into a [`WeightTable`].

use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::adapters::BatchAdapter;
use crate::error::util::safe_read_to_string;
use crate::error::{CridError, Result};
use crate::models::{WeightDefinition, WeightTable};
use crate::utils::arrow::{extract_booleans, extract_float64s, extract_strings};
use crate::utils::io::load_parquet_files_parallel;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Adapter for weight reference rows stored in Parquet
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightAdapter;

impl BatchAdapter<WeightDefinition> for WeightAdapter {
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<WeightDefinition>> {
        let codes = extract_strings(batch, "measure_code", true)?.unwrap_or_default();
        let weights = first_present(batch, &["weight", "crid_weight"], |name| {
            extract_float64s(batch, name, false)
        })?;
        let families = first_present(batch, &["component_family", "crid_component"], |name| {
            extract_strings(batch, name, false)
        })?;
        let used = ["used_in_composite", "used_in_crid"]
            .iter()
            .find_map(|name| extract_booleans(batch, name, false).transpose())
            .transpose()?;

        (0..batch.num_rows())
            .map(|row| {
                let measure_code = codes[row]
                    .clone()
                    .ok_or_else(|| CridError::config(format!("weight row {row} has no measure code")))?;
                let weight = weights[row].ok_or_else(|| {
                    CridError::config(format!("weight for measure {measure_code} is NULL"))
                })?;
                let component_family = families[row]
                    .as_deref()
                    .ok_or_else(|| {
                        CridError::config(format!("component family for measure {measure_code} is NULL"))
                    })?
                    .parse()
                    .map_err(|e: CridError| CridError::config(e.to_string()))?;
                let used_in_composite = used.as_ref().and_then(|u| u[row]).unwrap_or(true);

                Ok(WeightDefinition {
                    measure_code,
                    weight,
                    component_family,
                    used_in_composite,
                })
            })
            .collect()
    }
}

/// Extract the first of several alternative column names that is present
fn first_present<T>(
    batch: &RecordBatch,
    names: &[&str],
    extract: impl Fn(&str) -> Result<Option<Vec<Option<T>>>>,
) -> Result<Vec<Option<T>>> {
    for name in names {
        if let Some(column) = extract(name)? {
            return Ok(column);
        }
    }
    Err(CridError::schema(format!(
        "weight table needs one of the columns: {}",
        names.join(", ")
    )))
}

/// Read weight definitions without validating them
pub fn load_weight_definitions(path: &Path) -> Result<Vec<WeightDefinition>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => {
            let content = safe_read_to_string(path, "weight table")?;
            Ok(serde_json::from_str(&content)?)
        }
        Some("parquet") => {
            let batches = load_parquet_files_parallel(path)?;
            let mut definitions = Vec::new();
            for batch in &batches {
                definitions.extend(WeightAdapter::from_record_batch(batch)?);
            }
            Ok(definitions)
        }
        _ => Err(CridError::config(format!(
            "weight table {} must be a .json or .parquet file",
            path.display()
        ))),
    }
}

/// Load and validate the weight table
pub fn load_weights(path: &Path) -> Result<WeightTable> {
    log_operation_start("Loading composite weights from", path);
    let definitions = load_weight_definitions(path)?;
    let table = WeightTable::from_definitions(&definitions)?;
    log_operation_complete("loaded", path, definitions.len(), None);
    Ok(table)
}
