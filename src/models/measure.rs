//! Measure codes, component families and raw observations

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CridError;
use crate::models::period::ReportingPeriod;

/// Which composite a measure feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentFamily {
    /// Resident-assessment quality measures
    #[serde(alias = "quality", alias = "MDS", alias = "mds")]
    Quality,
    /// Claims-based utilization measures
    #[serde(alias = "utilization", alias = "CLAIMS", alias = "claims")]
    Utilization,
}

impl ComponentFamily {
    /// Canonical upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "QUALITY",
            Self::Utilization => "UTILIZATION",
        }
    }
}

impl fmt::Display for ComponentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentFamily {
    type Err = CridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUALITY" | "MDS" => Ok(Self::Quality),
            "UTILIZATION" | "CLAIMS" => Ok(Self::Utilization),
            other => Err(CridError::schema(format!("Unknown component family: '{other}'"))),
        }
    }
}

/// The six measures that participate in the composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeasureCode {
    M410,
    M453,
    M407,
    M409,
    M551,
    M552,
}

/// Number of recognized measure codes
pub const MEASURE_COUNT: usize = 6;

impl MeasureCode {
    /// All recognized codes in output column order
    pub const ALL: [Self; MEASURE_COUNT] = [
        Self::M410,
        Self::M453,
        Self::M407,
        Self::M409,
        Self::M551,
        Self::M552,
    ];

    /// Source identifier of the measure
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M410 => "410",
            Self::M453 => "453",
            Self::M407 => "407",
            Self::M409 => "409",
            Self::M551 => "551",
            Self::M552 => "552",
        }
    }

    /// Fixed family of the measure
    #[must_use]
    pub const fn family(self) -> ComponentFamily {
        match self {
            Self::M410 | Self::M453 | Self::M407 | Self::M409 => ComponentFamily::Quality,
            Self::M551 | Self::M552 => ComponentFamily::Utilization,
        }
    }

    /// Position in [`MeasureCode::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a recognized code; `None` for anything outside the universe
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for MeasureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region code of a facility: the first two characters of its identifier
#[must_use]
pub fn region_from_facility_id(facility_id: &str) -> Option<String> {
    let region: String = facility_id.trim().chars().take(2).collect();
    (region.chars().count() == 2).then_some(region)
}

/// One measure value reported for a facility in a period
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureObservation {
    pub facility_id: String,
    pub period_id: ReportingPeriod,
    pub as_of_date: NaiveDate,
    pub region_code: String,
    /// Raw measure identifier as delivered by the source
    pub measure_code: String,
    pub value: Option<f64>,
    pub is_suppressed: bool,
    pub component_family: ComponentFamily,
}

impl MeasureObservation {
    /// Build an observation for a recognized code, deriving region and family
    ///
    /// Mostly useful for fixtures; sources with explicit columns construct the
    /// struct directly.
    #[must_use]
    pub fn new(
        facility_id: &str,
        period_id: ReportingPeriod,
        code: MeasureCode,
        value: Option<f64>,
        is_suppressed: bool,
    ) -> Self {
        Self {
            facility_id: facility_id.to_string(),
            period_id,
            as_of_date: period_id.start_date(),
            region_code: region_from_facility_id(facility_id).unwrap_or_default(),
            measure_code: code.as_str().to_string(),
            value,
            is_suppressed,
            component_family: code.family(),
        }
    }

    /// The recognized code of this observation, if any
    #[must_use]
    pub fn code(&self) -> Option<MeasureCode> {
        MeasureCode::parse(&self.measure_code)
    }

    /// The value if it is a usable number
    #[must_use]
    pub fn finite_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}
