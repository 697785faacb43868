//! Flag engine
//!
//! Flags are categorical annotations derived from completeness, cohort size,
//! CRID magnitude, volatility, and one-sided outliers. A record carries every
//! flag that applies, in declaration order.

use std::fmt;

use smallvec::SmallVec;

use crate::config::FlagThresholds;

/// A categorical annotation on a CRID record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CridFlag {
    IncompleteMeasures,
    SmallState,
    HighPositiveCrid,
    HighNegativeCrid,
    ExtremePositiveCrid,
    ExtremeNegativeCrid,
    HighVolatility,
    QualityOutlier,
    UtilizationOutlier,
}

impl CridFlag {
    /// Every flag in emission order
    pub const ALL: [Self; 9] = [
        Self::IncompleteMeasures,
        Self::SmallState,
        Self::HighPositiveCrid,
        Self::HighNegativeCrid,
        Self::ExtremePositiveCrid,
        Self::ExtremeNegativeCrid,
        Self::HighVolatility,
        Self::QualityOutlier,
        Self::UtilizationOutlier,
    ];

    /// Tag written to the `flags` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncompleteMeasures => "INCOMPLETE_MEASURES",
            Self::SmallState => "SMALL_STATE",
            Self::HighPositiveCrid => "HIGH_POSITIVE_CRID",
            Self::HighNegativeCrid => "HIGH_NEGATIVE_CRID",
            Self::ExtremePositiveCrid => "EXTREME_POSITIVE_CRID",
            Self::ExtremeNegativeCrid => "EXTREME_NEGATIVE_CRID",
            Self::HighVolatility => "HIGH_VOLATILITY",
            Self::QualityOutlier => "QUALITY_OUTLIER",
            Self::UtilizationOutlier => "UTILIZATION_OUTLIER",
        }
    }

    /// Parse a tag from the `flags` column
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == tag)
    }
}

impl fmt::Display for CridFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free set of flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet(SmallVec<[CridFlag; 4]>);

impl FlagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flag, keeping declaration order
    pub fn insert(&mut self, flag: CridFlag) {
        if let Err(pos) = self.0.binary_search(&flag) {
            self.0.insert(pos, flag);
        }
    }

    #[must_use]
    pub fn contains(&self, flag: CridFlag) -> bool {
        self.0.binary_search(&flag).is_ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CridFlag> + '_ {
        self.0.iter().copied()
    }

    /// Tags for the output column
    #[must_use]
    pub fn to_tags(&self) -> Vec<String> {
        self.iter().map(|f| f.as_str().to_string()).collect()
    }
}

/// Everything the flag engine looks at for one facility-period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlagInputs {
    pub is_complete: bool,
    pub cohort_size: usize,
    pub crid_value: Option<f64>,
    pub crid_volatility: Option<f64>,
    pub quality_z: Option<f64>,
    pub utilization_z: Option<f64>,
}

/// Derive the flags of one facility-period
///
/// All comparisons are strict and a missing value never matches.
#[must_use]
pub fn derive_flags(inputs: &FlagInputs, thresholds: &FlagThresholds, min_cohort: usize) -> FlagSet {
    let mut flags = FlagSet::new();
    let above = |value: Option<f64>, limit: f64| value.is_some_and(|v| v > limit);
    let below = |value: Option<f64>, limit: f64| value.is_some_and(|v| v < limit);
    let abs = |value: Option<f64>| value.map(f64::abs);

    if !inputs.is_complete {
        flags.insert(CridFlag::IncompleteMeasures);
    }
    if inputs.cohort_size < min_cohort {
        flags.insert(CridFlag::SmallState);
    }

    if above(inputs.crid_value, thresholds.high_crid) {
        flags.insert(CridFlag::HighPositiveCrid);
    }
    if below(inputs.crid_value, -thresholds.high_crid) {
        flags.insert(CridFlag::HighNegativeCrid);
    }
    if above(inputs.crid_value, thresholds.extreme_crid) {
        flags.insert(CridFlag::ExtremePositiveCrid);
    }
    if below(inputs.crid_value, -thresholds.extreme_crid) {
        flags.insert(CridFlag::ExtremeNegativeCrid);
    }
    if above(inputs.crid_volatility, thresholds.high_volatility) {
        flags.insert(CridFlag::HighVolatility);
    }

    let (q, u) = (abs(inputs.quality_z), abs(inputs.utilization_z));
    if above(q, thresholds.outlier_z) && below(u, thresholds.outlier_counterpart_z) {
        flags.insert(CridFlag::QualityOutlier);
    }
    if above(u, thresholds.outlier_z) && below(q, thresholds.outlier_counterpart_z) {
        flags.insert(CridFlag::UtilizationOutlier);
    }

    flags
}
