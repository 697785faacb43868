//! Population moments shared by the peer normalizer and the volatility fold

/// Mean and population standard deviation of a set of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationMoments {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
}

impl PopulationMoments {
    /// Compute moments over `values` in iteration order
    ///
    /// Divides by N. A set whose values are all identical has a standard
    /// deviation of exactly zero, so the zero-variance gate is not defeated by
    /// summation residue. Returns `None` for an empty set.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();

        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.clone() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }

        let n = count as f64;
        if min == max {
            return Some(Self {
                count,
                mean: min,
                stddev: 0.0,
            });
        }

        let mean = sum / n;
        let squared: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
        Some(Self {
            count,
            mean,
            stddev: (squared / n).sqrt(),
        })
    }
}

/// Population standard deviation, `None` for an empty set
pub fn population_stddev<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    PopulationMoments::from_values(values).map(|m| m.stddev)
}

/// Continuous percentile with linear interpolation over sorted values
#[must_use]
pub fn percentile_cont(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
