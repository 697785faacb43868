//! Measure completeness of a facility-period

use crate::models::MEASURE_COUNT;

/// Value and suppression bit of one measure for a facility-period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasureSlot {
    pub value: Option<f64>,
    pub suppressed: bool,
}

impl MeasureSlot {
    /// A measure counts as present only if it has a value and is not suppressed
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.value.is_some() && !self.suppressed
    }

    /// The value usable in a composite
    #[must_use]
    pub const fn usable_value(&self) -> Option<f64> {
        if self.suppressed { None } else { self.value }
    }
}

/// Presence and suppression counts for the six measures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completeness {
    pub measures_present: u32,
    pub measures_suppressed: u32,
    pub completeness_pct: f64,
    pub is_complete: bool,
}

/// Derive completeness from the six measure slots
#[must_use]
pub fn assess(slots: &[MeasureSlot; MEASURE_COUNT]) -> Completeness {
    let measures_present = slots.iter().filter(|s| s.is_present()).count() as u32;
    let measures_suppressed = slots.iter().filter(|s| s.suppressed).count() as u32;

    Completeness {
        measures_present,
        measures_suppressed,
        completeness_pct: completeness_pct(measures_present),
        is_complete: measures_present as usize == MEASURE_COUNT,
    }
}

/// Share of present measures as a percentage rounded to two decimals
#[must_use]
pub fn completeness_pct(measures_present: u32) -> f64 {
    let pct = f64::from(measures_present) * 100.0 / MEASURE_COUNT as f64;
    (pct * 100.0).round() / 100.0
}
