//! Property tests over generated snapshots and volatility inputs

use crid_engine::VolatilityWindow;
use crid_engine::algorithm::crid::completeness::completeness_pct;
use crid_engine::algorithm::crid::divergence::rolling_volatility;
use crid_engine::utils::test::SyntheticSnapshot;
use proptest::prelude::*;

use crate::utils::test_engine;

fn snapshots() -> impl Strategy<Value = SyntheticSnapshot> {
    (
        prop::collection::vec(0usize..16, 1..4),
        1usize..5,
        0.0f64..0.2,
        0.0f64..0.1,
        any::<u64>(),
    )
        .prop_map(|(facilities, periods, missing, suppressed, seed)| {
            SyntheticSnapshot::new(facilities, periods)
                .with_missing_rate(missing)
                .with_suppression_rate(suppressed)
                .with_seed(seed)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn crid_only_for_complete_facilities_in_large_cohorts(snapshot in snapshots()) {
        let run = test_engine(true).run(&snapshot.generate());
        for r in &run.records {
            if let Some(crid) = r.crid_value {
                prop_assert_eq!(r.measures_present, 6);
                prop_assert!(r.cohort_size >= 10);
                let expected = r.quality_z.unwrap() - r.utilization_z.unwrap();
                prop_assert!((crid - expected).abs() < 1e-9);
            }
            if r.crid_volatility.is_some() {
                prop_assert!(r.crid_value.is_some());
            }
        }
    }

    #[test]
    fn completeness_is_derived_from_present_measures(snapshot in snapshots()) {
        let run = test_engine(false).run(&snapshot.generate());
        for r in &run.records {
            prop_assert!(r.measures_present <= 6);
            prop_assert_eq!(r.completeness_pct, completeness_pct(r.measures_present));
            prop_assert_eq!(r.has_flag("INCOMPLETE_MEASURES"), r.measures_present < 6);
        }
    }

    #[test]
    fn runs_are_deterministic(snapshot in snapshots()) {
        let observations = snapshot.generate();
        let parallel = test_engine(true).run(&observations);
        let sequential = test_engine(false).run(&observations);
        prop_assert_eq!(parallel.records, sequential.records);
    }

    #[test]
    fn volatility_is_null_exactly_when_value_is(
        values in prop::collection::vec(prop::option::of(-5.0f64..5.0), 0..12),
        four in any::<bool>(),
    ) {
        let window = if four { VolatilityWindow::Four } else { VolatilityWindow::Three };
        let volatility = rolling_volatility(&values, window);
        prop_assert_eq!(volatility.len(), values.len());
        for (value, vol) in values.iter().zip(&volatility) {
            prop_assert_eq!(value.is_some(), vol.is_some());
            if let Some(v) = vol {
                prop_assert!(*v >= 0.0);
                // bounded by the spread of the inputs
                prop_assert!(*v <= 5.0 + 1e-9);
            }
        }
    }
}
