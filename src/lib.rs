//! Composite risk-divergence (CRID) scoring for nursing facility quality
//! measures.
//!
//! Measure observations are pivoted per facility and period, combined into
//! weighted quality and utilization composites, normalized against regional
//! peers, and turned into a divergence score with rolling volatility and
//! categorical flags. Results are materialized to Parquet and can be checked
//! with a read-only validation report.

pub mod adapters;
pub mod algorithm;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;
pub mod validation;

// Core types
pub use algorithm::crid::{CridEngine, CridFlag, CridRun};
pub use config::{EngineConfig, FlagThresholds, RunMode, RunOptions, VolatilityWindow};
pub use error::{CridError, Result};
pub use models::{
    ComponentFamily, CridRecord, MeasureCode, MeasureObservation, ReportingPeriod,
    WeightDefinition, WeightTable,
};
pub use validation::ValidationReport;

// Input and output
pub use adapters::{load_observations, load_weights, read_crid_records, write_crid_records};

// Arrow types
pub use arrow::record_batch::RecordBatch;
