//! Composite builder
//!
//! Pivots measure observations into one row per facility-period with the six
//! measure slots, completeness, and the two weighted composites. Composites
//! are only produced for complete facility-periods.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{info, warn};

use crate::algorithm::crid::completeness::{self, Completeness, MeasureSlot};
use crate::models::{
    ComponentFamily, MEASURE_COUNT, MeasureCode, MeasureObservation, ReportingPeriod, WeightTable,
};

/// One facility in one reporting period, before peer normalization
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityPeriodComposite {
    pub facility_id: String,
    pub period_id: ReportingPeriod,
    pub as_of_date: NaiveDate,
    pub region_code: String,
    pub measures: [MeasureSlot; MEASURE_COUNT],
    pub completeness: Completeness,
    pub quality_composite: Option<f64>,
    pub utilization_composite: Option<f64>,
}

impl FacilityPeriodComposite {
    /// Whether all six measures are present and unsuppressed
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completeness.is_complete
    }

    /// Drill-down score of a measure, `None` if missing or suppressed
    #[must_use]
    pub const fn measure_score(&self, code: MeasureCode) -> Option<f64> {
        self.measures[code.index()].usable_value()
    }
}

/// Data anomalies seen while pivoting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PivotDiagnostics {
    pub observations: usize,
    pub unrecognized_codes: usize,
    pub duplicate_measures: usize,
    pub family_mismatches: usize,
    pub conflicting_regions: usize,
    pub conflicting_dates: usize,
}

#[derive(Debug)]
struct Accumulator {
    as_of_date: NaiveDate,
    region_code: String,
    measures: [MeasureSlot; MEASURE_COUNT],
    seen: [bool; MEASURE_COUNT],
}

impl Accumulator {
    fn new(observation: &MeasureObservation) -> Self {
        Self {
            as_of_date: observation.as_of_date,
            region_code: observation.region_code.clone(),
            measures: [MeasureSlot::default(); MEASURE_COUNT],
            seen: [false; MEASURE_COUNT],
        }
    }

    fn absorb(&mut self, observation: &MeasureObservation, diagnostics: &mut PivotDiagnostics) {
        if observation.region_code != self.region_code {
            diagnostics.conflicting_regions += 1;
            if observation.region_code < self.region_code {
                self.region_code.clone_from(&observation.region_code);
            }
        }
        if observation.as_of_date != self.as_of_date {
            diagnostics.conflicting_dates += 1;
            self.as_of_date = self.as_of_date.max(observation.as_of_date);
        }

        let Some(code) = observation.code() else {
            diagnostics.unrecognized_codes += 1;
            return;
        };
        if observation.component_family != code.family() {
            diagnostics.family_mismatches += 1;
        }

        let idx = code.index();
        let slot = &mut self.measures[idx];
        let value = observation.finite_value();
        if self.seen[idx] {
            // Duplicates resolve to the largest value and sticky suppression
            diagnostics.duplicate_measures += 1;
            slot.value = match (slot.value, value) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            slot.suppressed |= observation.is_suppressed;
        } else {
            self.seen[idx] = true;
            *slot = MeasureSlot {
                value,
                suppressed: observation.is_suppressed,
            };
        }
    }
}

/// Pivot observations into facility-period composites
///
/// Output is ordered by (`facility_id`, `period_id`) regardless of input order.
#[must_use]
pub fn build_composites(
    observations: &[MeasureObservation],
    weights: &WeightTable,
) -> (Vec<FacilityPeriodComposite>, PivotDiagnostics) {
    let mut diagnostics = PivotDiagnostics {
        observations: observations.len(),
        ..PivotDiagnostics::default()
    };

    let mut groups: BTreeMap<(&str, ReportingPeriod), Accumulator> = BTreeMap::new();
    for observation in observations {
        groups
            .entry((observation.facility_id.as_str(), observation.period_id))
            .or_insert_with(|| Accumulator::new(observation))
            .absorb(observation, &mut diagnostics);
    }

    let composites: Vec<FacilityPeriodComposite> = groups
        .into_iter()
        .map(|((facility_id, period_id), acc)| {
            finish_composite(facility_id, period_id, acc, weights)
        })
        .collect();

    log_diagnostics(&diagnostics, composites.len());
    (composites, diagnostics)
}

fn finish_composite(
    facility_id: &str,
    period_id: ReportingPeriod,
    acc: Accumulator,
    weights: &WeightTable,
) -> FacilityPeriodComposite {
    let completeness = completeness::assess(&acc.measures);

    let (quality_composite, utilization_composite) = if completeness.is_complete {
        let values = acc.measures.map(|slot| slot.usable_value());
        (
            weights.weighted_sum(ComponentFamily::Quality, &values),
            weights.weighted_sum(ComponentFamily::Utilization, &values),
        )
    } else {
        (None, None)
    };

    FacilityPeriodComposite {
        facility_id: facility_id.to_string(),
        period_id,
        as_of_date: acc.as_of_date,
        region_code: acc.region_code,
        measures: acc.measures,
        completeness,
        quality_composite,
        utilization_composite,
    }
}

fn log_diagnostics(diagnostics: &PivotDiagnostics, facility_periods: usize) {
    info!(
        "Pivoted {} observations into {} facility-periods",
        diagnostics.observations, facility_periods
    );
    if diagnostics.unrecognized_codes > 0 {
        info!(
            "Skipped {} observations with measure codes outside the composite",
            diagnostics.unrecognized_codes
        );
    }
    if diagnostics.duplicate_measures > 0 {
        warn!(
            "{} duplicate (facility, period, measure) observations resolved to the largest value",
            diagnostics.duplicate_measures
        );
    }
    if diagnostics.family_mismatches > 0 {
        warn!(
            "{} observations declared a component family different from their measure code",
            diagnostics.family_mismatches
        );
    }
    if diagnostics.conflicting_regions > 0 || diagnostics.conflicting_dates > 0 {
        warn!(
            "Facility-periods with conflicting metadata: {} region, {} as-of date",
            diagnostics.conflicting_regions, diagnostics.conflicting_dates
        );
    }
}
