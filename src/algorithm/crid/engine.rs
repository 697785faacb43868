//! CRID engine
//!
//! Runs the stages in order over one snapshot of observations:
//! pivot into composites, compute peer cohorts, then fold each facility's
//! history into z-scores, CRID, volatility and flags.

use std::collections::BTreeMap;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::algorithm::crid::composite::{self, FacilityPeriodComposite, PivotDiagnostics};
use crate::algorithm::crid::divergence;
use crate::algorithm::crid::flags::{self, FlagInputs};
use crate::algorithm::crid::peer::{self, CohortKey, PeerCohortStats, ZScores};
use crate::config::EngineConfig;
use crate::models::{CridRecord, MeasureCode, MeasureObservation, WeightTable};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Result of one engine run
#[derive(Debug, Clone)]
pub struct CridRun {
    /// One record per facility-period, ordered by (`facility_id`, `period_id`)
    pub records: Vec<CridRecord>,
    /// Anomalies seen while pivoting the observations
    pub diagnostics: PivotDiagnostics,
    /// Number of (region, period) cohorts with at least one complete facility
    pub cohorts: usize,
}

/// Computes CRID records from measure observations
#[derive(Debug, Clone)]
pub struct CridEngine {
    config: EngineConfig,
    weights: WeightTable,
}

impl CridEngine {
    /// Create an engine for one run configuration and weight table
    #[must_use]
    pub const fn new(config: EngineConfig, weights: WeightTable) -> Self {
        Self { config, weights }
    }

    /// The configuration used by this engine
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The weight table used by this engine
    #[must_use]
    pub const fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Compute CRID records for a snapshot of observations
    ///
    /// The output is identical whether or not the run is parallel.
    #[must_use]
    pub fn run(&self, observations: &[MeasureObservation]) -> CridRun {
        let start = Instant::now();
        info!("Computing CRID for {} observations", observations.len());

        let (composites, diagnostics) = composite::build_composites(observations, &self.weights);
        let complete = composites.iter().filter(|c| c.is_complete()).count();
        info!(
            "Built {} facility-period composites ({} complete) in {:?}",
            composites.len(),
            complete,
            start.elapsed()
        );

        let stage = Instant::now();
        let cohorts = peer::cohort_stats(&composites, self.config.use_parallel);
        let small = cohorts
            .values()
            .filter(|c| !c.is_large_enough(self.config.min_cohort))
            .count();
        info!(
            "Computed {} peer cohorts ({} below minimum size {}) in {:?}",
            cohorts.len(),
            small,
            self.config.min_cohort,
            stage.elapsed()
        );

        let stage = Instant::now();
        let records = self.fold_facilities(&composites, &cohorts);
        info!(
            "Scored {} facility-periods in {:?} (total {:?})",
            records.len(),
            stage.elapsed(),
            start.elapsed()
        );

        CridRun {
            records,
            diagnostics,
            cohorts: cohorts.len(),
        }
    }

    fn fold_facilities(
        &self,
        composites: &[FacilityPeriodComposite],
        cohorts: &BTreeMap<CohortKey, PeerCohortStats>,
    ) -> Vec<CridRecord> {
        // Composites arrive sorted by facility, so each history is contiguous
        let histories: Vec<&[FacilityPeriodComposite]> = composites
            .chunk_by(|a, b| a.facility_id == b.facility_id)
            .collect();

        let progress = self
            .config
            .show_progress
            .then(|| create_main_progress_bar(histories.len() as u64, Some("Scoring facilities")));
        let fold = |history: &&[FacilityPeriodComposite]| {
            let records = self.fold_history(history, cohorts);
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            records
        };

        let per_facility: Vec<Vec<CridRecord>> = if self.config.use_parallel {
            histories.par_iter().map(fold).collect()
        } else {
            histories.iter().map(fold).collect()
        };

        if let Some(pb) = &progress {
            finish_progress_bar(pb, Some("Facilities scored"));
        }

        per_facility.into_iter().flatten().collect()
    }

    /// Score one facility's period-ordered history
    fn fold_history(
        &self,
        history: &[FacilityPeriodComposite],
        cohorts: &BTreeMap<CohortKey, PeerCohortStats>,
    ) -> Vec<CridRecord> {
        let scored: Vec<(Option<&PeerCohortStats>, ZScores, Option<f64>)> = history
            .iter()
            .map(|c| {
                let cohort = cohorts.get(&(c.region_code.clone(), c.period_id));
                let z = peer::z_scores(c, cohort, self.config.min_cohort);
                let crid = divergence::crid_value(z.quality_z, z.utilization_z);
                (cohort, z, crid)
            })
            .collect();

        let crids: Vec<Option<f64>> = scored.iter().map(|(_, _, crid)| *crid).collect();
        let volatility = divergence::rolling_volatility(&crids, self.config.volatility_window);

        history
            .iter()
            .zip(scored)
            .zip(volatility)
            .map(|((composite, (cohort, z, crid)), crid_volatility)| {
                self.to_record(composite, cohort, z, crid, crid_volatility)
            })
            .collect()
    }

    fn to_record(
        &self,
        composite: &FacilityPeriodComposite,
        cohort: Option<&PeerCohortStats>,
        z: ZScores,
        crid_value: Option<f64>,
        crid_volatility: Option<f64>,
    ) -> CridRecord {
        let cohort_size = cohort.map_or(0, |c| c.facility_count);
        let flag_set = flags::derive_flags(
            &FlagInputs {
                is_complete: composite.is_complete(),
                cohort_size,
                crid_value,
                crid_volatility,
                quality_z: z.quality_z,
                utilization_z: z.utilization_z,
            },
            &self.config.thresholds,
            self.config.min_cohort,
        );

        CridRecord {
            facility_id: composite.facility_id.clone(),
            period_id: composite.period_id.key(),
            as_of_date: composite.as_of_date,
            region_code: composite.region_code.clone(),
            quality_composite: composite.quality_composite,
            utilization_composite: composite.utilization_composite,
            quality_z: z.quality_z,
            utilization_z: z.utilization_z,
            crid_value,
            crid_volatility,
            completeness_pct: composite.completeness.completeness_pct,
            measures_present: composite.completeness.measures_present,
            measures_suppressed: composite.completeness.measures_suppressed,
            flags: flag_set.to_tags(),
            measure_410_score: composite.measure_score(MeasureCode::M410),
            measure_453_score: composite.measure_score(MeasureCode::M453),
            measure_407_score: composite.measure_score(MeasureCode::M407),
            measure_409_score: composite.measure_score(MeasureCode::M409),
            measure_551_score: composite.measure_score(MeasureCode::M551),
            measure_552_score: composite.measure_score(MeasureCode::M552),
            cohort_size: u32::try_from(cohort_size).unwrap_or(u32::MAX),
            cohort_quality_mean: cohort.map(|c| c.quality_mean),
            cohort_quality_stddev: cohort.map(|c| c.quality_stddev),
            cohort_utilization_mean: cohort.map(|c| c.utilization_mean),
            cohort_utilization_stddev: cohort.map(|c| c.utilization_stddev),
        }
    }
}
