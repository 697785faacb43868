//! Peer normalizer
//!
//! A cohort is every complete facility of one region in one period. Each
//! cohort's moments are computed independently, so cohorts can be processed
//! in parallel without affecting the result.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::algorithm::crid::composite::FacilityPeriodComposite;
use crate::algorithm::crid::stats::PopulationMoments;
use crate::models::ReportingPeriod;

/// Key of a peer cohort
pub type CohortKey = (String, ReportingPeriod);

/// Moments of one (region, period) cohort of complete facilities
#[derive(Debug, Clone, PartialEq)]
pub struct PeerCohortStats {
    pub region_code: String,
    pub period_id: ReportingPeriod,
    pub facility_count: usize,
    pub quality_mean: f64,
    pub quality_stddev: f64,
    pub utilization_mean: f64,
    pub utilization_stddev: f64,
}

impl PeerCohortStats {
    /// Whether the cohort is large enough to normalize against
    #[must_use]
    pub const fn is_large_enough(&self, min_cohort: usize) -> bool {
        self.facility_count >= min_cohort
    }
}

/// Peer-normalized scores of one facility-period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZScores {
    pub quality_z: Option<f64>,
    pub utilization_z: Option<f64>,
}

/// Compute cohort statistics for every (region, period) with a complete facility
///
/// Within a cohort, composites are consumed in (facility, period) order, so
/// the sums are reproducible whether or not cohorts run in parallel.
#[must_use]
pub fn cohort_stats(
    composites: &[FacilityPeriodComposite],
    use_parallel: bool,
) -> BTreeMap<CohortKey, PeerCohortStats> {
    let mut members: BTreeMap<CohortKey, Vec<(f64, f64)>> = BTreeMap::new();
    for composite in composites.iter().filter(|c| c.is_complete()) {
        if let (Some(q), Some(u)) = (composite.quality_composite, composite.utilization_composite) {
            members
                .entry((composite.region_code.clone(), composite.period_id))
                .or_default()
                .push((q, u));
        }
    }

    let compute = |(key, values): (CohortKey, Vec<(f64, f64)>)| {
        let stats = cohort_moments(&key, &values);
        (key, stats)
    };

    let computed: Vec<(CohortKey, Option<PeerCohortStats>)> = if use_parallel {
        members.into_par_iter().map(compute).collect()
    } else {
        members.into_iter().map(compute).collect()
    };

    computed
        .into_iter()
        .filter_map(|(key, stats)| stats.map(|s| (key, s)))
        .collect()
}

fn cohort_moments(key: &CohortKey, values: &[(f64, f64)]) -> Option<PeerCohortStats> {
    let quality = PopulationMoments::from_values(values.iter().map(|(q, _)| *q))?;
    let utilization = PopulationMoments::from_values(values.iter().map(|(_, u)| *u))?;

    debug!(
        "Cohort {}/{}: n={}, quality {:.4}±{:.4}, utilization {:.4}±{:.4}",
        key.0,
        key.1,
        quality.count,
        quality.mean,
        quality.stddev,
        utilization.mean,
        utilization.stddev
    );

    Some(PeerCohortStats {
        region_code: key.0.clone(),
        period_id: key.1,
        facility_count: quality.count,
        quality_mean: quality.mean,
        quality_stddev: quality.stddev,
        utilization_mean: utilization.mean,
        utilization_stddev: utilization.stddev,
    })
}

/// Z-score one facility-period against its cohort
///
/// Each score is produced only when the facility is complete, the cohort has
/// at least `min_cohort` facilities, and the cohort's standard deviation for
/// that composite is positive.
#[must_use]
pub fn z_scores(
    composite: &FacilityPeriodComposite,
    cohort: Option<&PeerCohortStats>,
    min_cohort: usize,
) -> ZScores {
    let Some(cohort) = cohort.filter(|c| c.is_large_enough(min_cohort)) else {
        return ZScores::default();
    };
    if !composite.is_complete() {
        return ZScores::default();
    }

    ZScores {
        quality_z: standardize(composite.quality_composite, cohort.quality_mean, cohort.quality_stddev),
        utilization_z: standardize(
            composite.utilization_composite,
            cohort.utilization_mean,
            cohort.utilization_stddev,
        ),
    }
}

fn standardize(value: Option<f64>, mean: f64, stddev: f64) -> Option<f64> {
    if stddev > 0.0 {
        value.map(|v| (v - mean) / stddev)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::crid::completeness::{self, MeasureSlot};
    use crate::models::MEASURE_COUNT;

    fn composite(id: &str, region: &str, q: f64, u: f64, complete: bool) -> FacilityPeriodComposite {
        let slot = MeasureSlot {
            value: Some(1.0),
            suppressed: !complete,
        };
        let measures = [slot; MEASURE_COUNT];
        FacilityPeriodComposite {
            facility_id: id.to_string(),
            period_id: "202401".parse().unwrap(),
            as_of_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            region_code: region.to_string(),
            measures,
            completeness: completeness::assess(&measures),
            quality_composite: complete.then_some(q),
            utilization_composite: complete.then_some(u),
        }
    }

    fn cohort(n: usize) -> Vec<FacilityPeriodComposite> {
        (0..n)
            .map(|i| composite(&format!("01{i:04}"), "01", i as f64, (n - i) as f64 * 2.0, true))
            .collect()
    }

    #[test]
    fn test_stats_only_use_complete_facilities() {
        let mut rows = cohort(4);
        rows.push(composite("019999", "01", 1000.0, 1000.0, false));
        let stats = cohort_stats(&rows, false);
        let s = &stats[&("01".to_string(), "202401".parse().unwrap())];
        assert_eq!(s.facility_count, 4);
        assert!((s.quality_mean - 1.5).abs() < 1e-12);
        // population stddev of 0,1,2,3
        assert!((s.quality_stddev - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut rows = cohort(12);
        rows.extend((0..11).map(|i| composite(&format!("02{i:04}"), "02", i as f64 * 0.3, 1.0 + i as f64, true)));
        assert_eq!(cohort_stats(&rows, true), cohort_stats(&rows, false));
    }

    #[test]
    fn test_z_scores_gated_by_cohort_size() {
        let rows = cohort(9);
        let stats = cohort_stats(&rows, false);
        let key = ("01".to_string(), "202401".parse().unwrap());
        let z = z_scores(&rows[0], stats.get(&key), 10);
        assert_eq!(z, ZScores::default());

        let rows = cohort(10);
        let stats = cohort_stats(&rows, false);
        let z = z_scores(&rows[0], stats.get(&key), 10);
        assert!(z.quality_z.is_some());
        assert!(z.utilization_z.is_some());
    }

    #[test]
    fn test_zero_stddev_gives_null_not_fault() {
        let rows: Vec<_> = (0..10)
            .map(|i| composite(&format!("01{i:04}"), "01", 3.0, i as f64, true))
            .collect();
        let stats = cohort_stats(&rows, false);
        let key = ("01".to_string(), "202401".parse().unwrap());
        let z = z_scores(&rows[3], stats.get(&key), 10);
        assert_eq!(z.quality_z, None);
        assert!(z.utilization_z.is_some());
    }

    #[test]
    fn test_incomplete_facility_is_not_scored() {
        let mut rows = cohort(10);
        rows.push(composite("019999", "01", 0.0, 0.0, false));
        let stats = cohort_stats(&rows, false);
        let key = ("01".to_string(), "202401".parse().unwrap());
        assert_eq!(z_scores(&rows[10], stats.get(&key), 10), ZScores::default());
    }
}
