//! CRID divergence and rolling volatility

use crate::algorithm::crid::stats::population_stddev;
use crate::config::VolatilityWindow;

/// Divergence between peer-normalized quality and utilization
#[must_use]
pub fn crid_value(quality_z: Option<f64>, utilization_z: Option<f64>) -> Option<f64> {
    Some(quality_z? - utilization_z?)
}

/// Rolling volatility over one facility's CRID sequence
///
/// `values` must be ordered by period. The window is counted in record
/// positions: the current record plus the preceding records of the same
/// facility, regardless of calendar gaps. NULLs inside the window are skipped.
/// The result is NULL wherever the current value is NULL.
#[must_use]
pub fn rolling_volatility(values: &[Option<f64>], window: VolatilityWindow) -> Vec<Option<f64>> {
    let preceding = window.preceding();
    values
        .iter()
        .enumerate()
        .map(|(pos, current)| {
            (*current)?;
            let start = pos.saturating_sub(preceding);
            population_stddev(values[start..=pos].iter().flatten().copied())
        })
        .collect()
}
