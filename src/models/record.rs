//! Output rows of a CRID materialization

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::measure::MeasureCode;

/// One materialized CRID row, unique on (`facility_id`, `period_id`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CridRecord {
    pub facility_id: String,
    /// Period key in `YYYYMM` form
    pub period_id: String,
    pub as_of_date: NaiveDate,
    pub region_code: String,

    // Raw composites (before peer normalization)
    pub quality_composite: Option<f64>,
    pub utilization_composite: Option<f64>,

    // Peer-normalized scores, NULL when gated
    pub quality_z: Option<f64>,
    pub utilization_z: Option<f64>,
    pub crid_value: Option<f64>,
    pub crid_volatility: Option<f64>,

    pub completeness_pct: f64,
    pub measures_present: u32,
    pub measures_suppressed: u32,

    pub flags: Vec<String>,

    // Component scores for drill-down, NULL if missing or suppressed
    pub measure_410_score: Option<f64>,
    pub measure_453_score: Option<f64>,
    pub measure_407_score: Option<f64>,
    pub measure_409_score: Option<f64>,
    pub measure_551_score: Option<f64>,
    pub measure_552_score: Option<f64>,

    // Peer context
    pub cohort_size: u32,
    pub cohort_quality_mean: Option<f64>,
    pub cohort_quality_stddev: Option<f64>,
    pub cohort_utilization_mean: Option<f64>,
    pub cohort_utilization_stddev: Option<f64>,
}

impl CridRecord {
    /// Component score column for a measure
    #[must_use]
    pub const fn measure_score(&self, code: MeasureCode) -> Option<f64> {
        match code {
            MeasureCode::M410 => self.measure_410_score,
            MeasureCode::M453 => self.measure_453_score,
            MeasureCode::M407 => self.measure_407_score,
            MeasureCode::M409 => self.measure_409_score,
            MeasureCode::M551 => self.measure_551_score,
            MeasureCode::M552 => self.measure_552_score,
        }
    }

    /// Whether the record carries a flag tag
    #[must_use]
    pub fn has_flag(&self, tag: &str) -> bool {
        self.flags.iter().any(|f| f == tag)
    }

    /// Whether the record is complete (all six measures present)
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.measures_present as usize == crate::models::measure::MEASURE_COUNT
    }

    /// Unique key of the record
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.facility_id, &self.period_id)
    }
}
