//! Configuration for a CRID materialization run.
//!
//! A run is parameterized by one immutable [`EngineConfig`] that every stage
//! receives by reference. Nothing in the engine re-reads configuration while
//! a run is in progress.

pub mod run;

use std::fmt;

use crate::error::{CridError, Result};

pub use run::{RunMode, RunOptions};

/// Minimum number of complete facilities a cohort needs before z-scores are produced
pub const MIN_COHORT: usize = 10;

/// Number of consecutive facility periods in the volatility window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolatilityWindow {
    /// Current period plus two preceding periods
    #[default]
    Three,
    /// Current period plus three preceding periods
    Four,
}

impl VolatilityWindow {
    /// Number of periods covered by the window
    #[must_use]
    pub const fn periods(self) -> usize {
        match self {
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    /// Number of records preceding the current one that fall inside the window
    #[must_use]
    pub const fn preceding(self) -> usize {
        self.periods() - 1
    }
}

impl TryFrom<usize> for VolatilityWindow {
    type Error = CridError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            other => Err(CridError::config(format!(
                "volatility window must be 3 or 4, got {other}"
            ))),
        }
    }
}

impl std::str::FromStr for VolatilityWindow {
    type Err = CridError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<usize>().map_err(|_| {
            CridError::config(format!("volatility window must be 3 or 4, got '{s}'"))
        })?;
        Self::try_from(value)
    }
}

/// Thresholds used by the flag engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagThresholds {
    /// |CRID| above this raises a HIGH_* flag
    pub high_crid: f64,
    /// |CRID| above this raises an EXTREME_* flag
    pub extreme_crid: f64,
    /// Volatility above this raises HIGH_VOLATILITY
    pub high_volatility: f64,
    /// |z| of the outlying component must exceed this
    pub outlier_z: f64,
    /// |z| of the other component must stay below this
    pub outlier_counterpart_z: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            high_crid: 2.0,
            extreme_crid: 3.0,
            high_volatility: 1.5,
            outlier_z: 2.0,
            outlier_counterpart_z: 1.0,
        }
    }
}

/// Configuration for the CRID engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rolling window for CRID volatility
    pub volatility_window: VolatilityWindow,
    /// Minimum complete facilities per (region, period) cohort
    pub min_cohort: usize,
    /// Flag thresholds
    pub thresholds: FlagThresholds,
    /// Whether to partition cohort and volatility work across threads
    pub use_parallel: bool,
    /// Whether to draw progress bars for the per-facility fold
    pub show_progress: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volatility_window: VolatilityWindow::default(),
            min_cohort: MIN_COHORT,
            thresholds: FlagThresholds::default(),
            use_parallel: true,
            show_progress: false,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an engine configuration
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CRID Engine Configuration:")?;
        writeln!(f, "  Volatility Window: {} periods", self.volatility_window.periods())?;
        writeln!(f, "  Minimum Cohort: {}", self.min_cohort)?;
        writeln!(
            f,
            "  CRID Thresholds: high > {}, extreme > {}",
            self.thresholds.high_crid, self.thresholds.extreme_crid
        )?;
        writeln!(f, "  Volatility Threshold: {}", self.thresholds.high_volatility)?;
        writeln!(f, "  Parallel: {}", self.use_parallel)
    }
}

/// Builder for constructing an engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set the volatility window
    #[must_use]
    pub const fn volatility_window(mut self, window: VolatilityWindow) -> Self {
        self.config.volatility_window = window;
        self
    }

    /// Set the minimum cohort size
    #[must_use]
    pub const fn min_cohort(mut self, min_cohort: usize) -> Self {
        self.config.min_cohort = min_cohort;
        self
    }

    /// Set the flag thresholds
    #[must_use]
    pub const fn thresholds(mut self, thresholds: FlagThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Set whether to use parallel processing
    #[must_use]
    pub const fn use_parallel(mut self, parallel: bool) -> Self {
        self.config.use_parallel = parallel;
        self
    }

    /// Set whether to show progress bars
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the configuration, rejecting values no run can use
    pub fn build(self) -> Result<EngineConfig> {
        if self.config.min_cohort == 0 {
            return Err(CridError::config("minimum cohort size must be at least 1"));
        }
        let t = &self.config.thresholds;
        if [t.high_crid, t.extreme_crid, t.high_volatility, t.outlier_z, t.outlier_counterpart_z]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(CridError::config("flag thresholds must be finite"));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_accepts_three_and_four_only() {
        assert_eq!(VolatilityWindow::try_from(3).unwrap(), VolatilityWindow::Three);
        assert_eq!(VolatilityWindow::try_from(4).unwrap(), VolatilityWindow::Four);
        for bad in [0, 1, 2, 5, 12] {
            let err = VolatilityWindow::try_from(bad).unwrap_err();
            assert!(err.is_config());
        }
        assert!("x".parse::<VolatilityWindow>().is_err());
        assert_eq!(" 4".parse::<VolatilityWindow>().unwrap().preceding(), 3);
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.min_cohort, 10);
        assert_eq!(config.volatility_window.periods(), 3);
        assert!((config.thresholds.high_volatility - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builder_rejects_zero_cohort() {
        assert!(EngineConfig::builder().min_cohort(0).build().is_err());
        let config = EngineConfig::builder()
            .volatility_window(VolatilityWindow::Four)
            .use_parallel(false)
            .build()
            .unwrap();
        assert_eq!(config.volatility_window, VolatilityWindow::Four);
        assert!(!config.use_parallel);
    }
}
