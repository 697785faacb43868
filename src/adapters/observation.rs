//! Measure source adapter
//!
//! Reads measure observations from Parquet. Required columns are
//! `facility_id`, `period_id`, `measure_code`, `value` and `is_suppressed`;
//! `as_of_date`, `region_code` and `component_family` are optional and fall
//! back to values derived from the period, facility and measure code.

use std::path::Path;
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use rayon::prelude::*;

use crate::adapters::BatchAdapter;
use crate::error::{CridError, Result};
use crate::models::{
    ComponentFamily, MeasureCode, MeasureObservation, ReportingPeriod, region_from_facility_id,
};
use crate::utils::arrow::{extract_booleans, extract_dates, extract_float64s, extract_strings};
use crate::utils::io::load_parquet_files_parallel;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Adapter for the measure observation source
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationAdapter;

impl BatchAdapter<MeasureObservation> for ObservationAdapter {
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<MeasureObservation>> {
        let facility_ids = required(extract_strings(batch, "facility_id", true)?, "facility_id")?;
        let period_ids = required(extract_strings(batch, "period_id", true)?, "period_id")?;
        let codes = required(extract_strings(batch, "measure_code", true)?, "measure_code")?;
        let values = required(extract_float64s(batch, "value", true)?, "value")?;
        let suppressed = required(extract_booleans(batch, "is_suppressed", true)?, "is_suppressed")?;

        let dates = extract_dates(batch, "as_of_date", false)?;
        let regions = extract_strings(batch, "region_code", false)?;
        let families = extract_strings(batch, "component_family", false)?;

        let mut observations = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let facility_id = facility_ids[row]
                .clone()
                .ok_or_else(|| null_key("facility_id", row))?;
            let period_id: ReportingPeriod = period_ids[row]
                .as_deref()
                .ok_or_else(|| null_key("period_id", row))?
                .parse()?;
            let Some(measure_code) = codes[row].clone() else {
                return Err(null_key("measure_code", row));
            };

            let region_code = match regions.as_ref().and_then(|r| r[row].clone()) {
                Some(region) => region,
                None => region_from_facility_id(&facility_id).ok_or_else(|| {
                    CridError::schema(format!(
                        "row {row}: cannot derive a region from facility '{facility_id}'"
                    ))
                })?,
            };

            let component_family = match families.as_ref().and_then(|f| f[row].as_deref()) {
                Some(family) => family.parse()?,
                None => default_family(&measure_code),
            };

            observations.push(MeasureObservation {
                as_of_date: dates
                    .as_ref()
                    .and_then(|d| d[row])
                    .unwrap_or_else(|| period_id.start_date()),
                facility_id,
                period_id,
                region_code,
                measure_code,
                value: values[row],
                is_suppressed: suppressed[row].unwrap_or(false),
                component_family,
            });
        }

        Ok(observations)
    }
}

/// Family of a code as the source would have declared it
///
/// Unrecognized codes are dropped by the composite builder, so the family
/// assigned here only matters for recognized ones.
fn default_family(code: &str) -> ComponentFamily {
    MeasureCode::parse(code).map_or(ComponentFamily::Quality, MeasureCode::family)
}

fn required<T>(column: Option<T>, name: &str) -> Result<T> {
    column.ok_or_else(|| CridError::schema(format!("required column '{name}' not found")))
}

fn null_key(column: &str, row: usize) -> CridError {
    CridError::schema(format!("row {row}: '{column}' must not be NULL"))
}

/// Load all observations from a Parquet file or directory
///
/// Batches are converted in parallel; the observations keep file and row order.
pub fn load_observations(path: &Path) -> Result<Vec<MeasureObservation>> {
    let start = Instant::now();
    log_operation_start("Loading measure observations from", path);

    let batches = load_parquet_files_parallel(path)?;
    let converted: Vec<Vec<MeasureObservation>> = batches
        .par_iter()
        .map(ObservationAdapter::from_record_batch)
        .collect::<Result<_>>()?;
    let observations: Vec<MeasureObservation> = converted.into_iter().flatten().collect();

    log_operation_complete("loaded", path, observations.len(), Some(start.elapsed()));
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, BooleanArray, Float32Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};

    use super::*;

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let arrays = columns.into_iter().map(|(_, a)| a).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn minimal() -> Vec<(&'static str, ArrayRef)> {
        vec![
            ("facility_id", Arc::new(StringArray::from(vec!["015001", "155002"])) as ArrayRef),
            ("period_id", Arc::new(Int64Array::from(vec![202_401, 202_402]))),
            ("measure_code", Arc::new(Int64Array::from(vec![410, 551]))),
            ("value", Arc::new(Float32Array::from(vec![Some(0.5), None]))),
            ("is_suppressed", Arc::new(BooleanArray::from(vec![None, Some(true)]))),
        ]
    }

    #[test]
    fn test_defaults_for_optional_columns() {
        let rows = ObservationAdapter::from_record_batch(&batch(minimal())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].region_code, "01");
        assert_eq!(rows[0].period_id.key(), "202401");
        assert_eq!(rows[0].measure_code, "410");
        assert_eq!(rows[0].value, Some(0.5));
        assert!(!rows[0].is_suppressed);
        assert_eq!(rows[0].as_of_date, rows[0].period_id.start_date());
        assert_eq!(rows[1].component_family, ComponentFamily::Utilization);
        assert!(rows[1].is_suppressed);
        assert_eq!(rows[1].value, None);
    }

    #[test]
    fn test_explicit_optional_columns() {
        let mut columns = minimal();
        columns.push(("region_code", Arc::new(StringArray::from(vec!["AK", "TX"]))));
        columns.push(("component_family", Arc::new(StringArray::from(vec!["MDS", "CLAIMS"]))));
        columns.push(("as_of_date", Arc::new(StringArray::from(vec!["2024-01-15", "2024-02-15"]))));
        let rows = ObservationAdapter::from_record_batch(&batch(columns)).unwrap();
        assert_eq!(rows[0].region_code, "AK");
        assert_eq!(rows[1].as_of_date.to_string(), "2024-02-15");
    }

    #[test]
    fn test_missing_required_column() {
        let mut columns = minimal();
        columns.retain(|(name, _)| *name != "is_suppressed");
        let err = ObservationAdapter::from_record_batch(&batch(columns)).unwrap_err();
        assert!(err.to_string().contains("is_suppressed"));
    }

    #[test]
    fn test_null_facility_is_schema_error() {
        let mut columns = minimal();
        columns[0] = ("facility_id", Arc::new(StringArray::from(vec![Some("015001"), None])) as ArrayRef);
        let err = ObservationAdapter::from_record_batch(&batch(columns)).unwrap_err();
        assert!(matches!(err, CridError::Schema(_)));
    }

    #[test]
    fn test_uncastable_value_column() {
        let mut columns = minimal();
        columns[3] = ("value", Arc::new(StringArray::from(vec!["high", "low"])) as ArrayRef);
        assert!(ObservationAdapter::from_record_batch(&batch(columns)).is_err());
    }
}
