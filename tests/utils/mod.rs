use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use crid_engine::utils::io::write_parquet_atomic;
use crid_engine::utils::test::uniform_weights;
use crid_engine::{
    CridEngine, EngineConfig, MeasureCode, MeasureObservation, ReportingPeriod, Result,
    WeightTable,
};

/// Engine with uniform weights and default thresholds
#[must_use]
pub fn test_engine(parallel: bool) -> CridEngine {
    let config = EngineConfig::builder()
        .use_parallel(parallel)
        .build()
        .expect("default config is valid");
    CridEngine::new(config, test_weights())
}

#[must_use]
pub fn test_weights() -> WeightTable {
    WeightTable::from_definitions(&uniform_weights()).expect("uniform weights are valid")
}

#[must_use]
pub fn period(key: &str) -> ReportingPeriod {
    key.parse().expect("valid period key")
}

/// All six measures of one facility-period, quality at `quality` and
/// utilization at `utilization`
#[must_use]
pub fn facility_period(
    facility_id: &str,
    period: ReportingPeriod,
    quality: f64,
    utilization: f64,
) -> Vec<MeasureObservation> {
    MeasureCode::ALL
        .iter()
        .map(|code| {
            let value = match code.family() {
                crid_engine::ComponentFamily::Quality => quality,
                crid_engine::ComponentFamily::Utilization => utilization,
            };
            MeasureObservation::new(facility_id, period, *code, Some(value), false)
        })
        .collect()
}

/// A region of `count` complete facilities with spread-out composites
#[must_use]
pub fn region_cohort(region: &str, count: usize, period: ReportingPeriod) -> Vec<MeasureObservation> {
    (0..count)
        .flat_map(|i| {
            let id = format!("{region}{:04}", i + 1);
            let quality = 10.0 + i as f64;
            let utilization = 2.0 + ((i * 7) % count) as f64 * 0.1;
            facility_period(&id, period, quality, utilization)
        })
        .collect()
}

/// Write observations to a Parquet file in the source layout
pub fn write_observations(path: &Path, observations: &[MeasureObservation]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("facility_id", DataType::Utf8, false),
        Field::new("period_id", DataType::Utf8, false),
        Field::new("measure_code", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
        Field::new("is_suppressed", DataType::Boolean, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            observations.iter().map(|o| o.facility_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            observations.iter().map(|o| o.period_id.key()),
        )),
        Arc::new(StringArray::from_iter_values(
            observations.iter().map(|o| o.measure_code.as_str()),
        )),
        Arc::new(Float64Array::from_iter(observations.iter().map(|o| o.value))),
        Arc::new(BooleanArray::from_iter(
            observations.iter().map(|o| Some(o.is_suppressed)),
        )),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    write_parquet_atomic(path, schema, &[batch])
}

/// Weight definitions as the JSON reference file
pub fn write_weights_json(path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&uniform_weights())?;
    std::fs::write(path, json).map_err(|e| crid_engine::CridError::io(path, e))
}
