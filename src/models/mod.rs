//! Data model for CRID materialization
//!
//! Inputs (measure observations and weight definitions), the reporting period
//! key, and the materialized output record.

pub mod measure;
pub mod period;
pub mod record;
pub mod weight;

pub use measure::{
    ComponentFamily, MEASURE_COUNT, MeasureCode, MeasureObservation, region_from_facility_id,
};
pub use period::ReportingPeriod;
pub use record::CridRecord;
pub use weight::{WeightDefinition, WeightTable};
