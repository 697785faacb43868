//! Output sink for CRID records
//!
//! Records map to and from Arrow through serde_arrow with a fixed schema, so
//! the written file has the same column set and types no matter which
//! values happen to be NULL.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::adapters::BatchAdapter;
use crate::error::Result;
use crate::models::CridRecord;
use crate::utils::io::{DEFAULT_BATCH_SIZE, load_parquet_files_parallel, write_parquet_atomic};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Arrow schema of a materialized CRID file
#[must_use]
pub fn crid_record_schema() -> Schema {
    let score = |name: &str| Field::new(name, DataType::Float64, true);
    Schema::new(vec![
        Field::new("facility_id", DataType::Utf8, false),
        Field::new("period_id", DataType::Utf8, false),
        Field::new("as_of_date", DataType::Date32, false),
        Field::new("region_code", DataType::Utf8, false),
        score("quality_composite"),
        score("utilization_composite"),
        score("quality_z"),
        score("utilization_z"),
        score("crid_value"),
        score("crid_volatility"),
        Field::new("completeness_pct", DataType::Float64, false),
        Field::new("measures_present", DataType::UInt32, false),
        Field::new("measures_suppressed", DataType::UInt32, false),
        Field::new(
            "flags",
            DataType::List(Arc::new(Field::new("element", DataType::Utf8, false))),
            false,
        ),
        score("measure_410_score"),
        score("measure_453_score"),
        score("measure_407_score"),
        score("measure_409_score"),
        score("measure_551_score"),
        score("measure_552_score"),
        Field::new("cohort_size", DataType::UInt32, false),
        score("cohort_quality_mean"),
        score("cohort_quality_stddev"),
        score("cohort_utilization_mean"),
        score("cohort_utilization_stddev"),
    ])
}

/// Adapter between CRID records and record batches
#[derive(Debug, Clone, Copy, Default)]
pub struct CridRecordAdapter;

impl BatchAdapter<CridRecord> for CridRecordAdapter {
    fn from_record_batch(batch: &RecordBatch) -> Result<Vec<CridRecord>> {
        Ok(serde_arrow::from_record_batch::<Vec<CridRecord>>(batch)?)
    }
}

impl CridRecordAdapter {
    /// Convert records into one record batch
    pub fn to_record_batch(records: &[&CridRecord]) -> Result<RecordBatch> {
        let fields: Vec<FieldRef> = crid_record_schema().fields().iter().cloned().collect();
        Ok(serde_arrow::to_record_batch(&fields, &records)?)
    }
}

/// Write records to a single Parquet file, atomically replacing `path`
///
/// Records are written in (`facility_id`, `period_id`) order.
pub fn write_crid_records(path: &Path, records: &[CridRecord]) -> Result<()> {
    let start = Instant::now();
    let sorted = records
        .iter()
        .sorted_by(|a, b| a.key().cmp(&b.key()))
        .collect_vec();

    let batches = sorted
        .chunks(DEFAULT_BATCH_SIZE)
        .map(CridRecordAdapter::to_record_batch)
        .collect::<Result<Vec<_>>>()?;

    write_parquet_atomic(path, Arc::new(crid_record_schema()), &batches)?;
    log::info!(
        "Materialized {} CRID records in {:?}",
        records.len(),
        start.elapsed()
    );
    Ok(())
}

/// Read records back from a materialized file or directory
pub fn read_crid_records(path: &Path) -> Result<Vec<CridRecord>> {
    let start = Instant::now();
    log_operation_start("Reading CRID records from", path);

    let mut records = Vec::new();
    for batch in &load_parquet_files_parallel(path)? {
        records.extend(CridRecordAdapter::from_record_batch(batch)?);
    }

    log_operation_complete("read", path, records.len(), Some(start.elapsed()));
    Ok(records)
}
