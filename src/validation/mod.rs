//! Validation of a materialized CRID file
//!
//! Validation is read-only: it summarizes an existing set of records and
//! reports anomalies as warnings, never as errors.

pub mod report;

pub use report::{
    CompletenessBucket, CridDistribution, FlagFrequency, NullReasons, PeriodCoverage, RunSummary,
    TopCrid, ValidationReport,
};
