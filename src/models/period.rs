//! Reporting period keys
//!
//! Quality-measure extracts are published monthly. A period is identified by
//! its year and month and orders chronologically, which is the order the
//! volatility fold walks a facility's history in.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::CridError;

/// A monthly reporting period (e.g. extract `202401`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportingPeriod {
    year: i32,
    month: u32,
}

impl ReportingPeriod {
    /// Create a period, validating the month
    pub fn new(year: i32, month: u32) -> Result<Self, CridError> {
        if !(1..=12).contains(&month) {
            return Err(CridError::schema(format!("Invalid month: {month}")));
        }
        if !(1000..=9999).contains(&year) {
            return Err(CridError::schema(format!("Invalid year: {year}")));
        }
        Ok(Self { year, month })
    }

    /// Year of the period
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month of the period (1-12)
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the period, used when a source has no as-of date
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// The sortable `YYYYMM` key
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for ReportingPeriod {
    type Err = CridError;

    /// Parse a string into a `ReportingPeriod`
    ///
    /// Supported formats:
    /// - "202401" - extract id (YYYYMM)
    /// - "2024-01" - year and month (YYYY-MM)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = match s.len() {
            6 if s.bytes().all(|b| b.is_ascii_digit()) => (&s[0..4], &s[4..6]),
            7 if s.as_bytes()[4] == b'-' => (&s[0..4], &s[5..7]),
            _ => return Err(CridError::schema(format!("Invalid period format: '{s}'"))),
        };

        let year = year
            .parse::<i32>()
            .map_err(|e| CridError::schema(format!("Invalid period year in '{s}': {e}")))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| CridError::schema(format!("Invalid period month in '{s}': {e}")))?;

        Self::new(year, month)
    }
}
