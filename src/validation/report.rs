//! Validation report
//!
//! Built from CRID records alone (plus the weight table when one is at hand),
//! rendered as text for the log and serializable to JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use itertools::Itertools;
use log::warn;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::algorithm::crid::flags::CridFlag;
use crate::algorithm::crid::stats::percentile_cont;
use crate::error::{CridError, Result};
use crate::models::{CridRecord, WeightDefinition, WeightTable};

/// Mean CRID further from zero than this suggests a normalization problem
const MEAN_CRID_WARNING: f64 = 0.5;

/// Number of records listed in the top-CRID section
const TOP_CRID_LIMIT: usize = 10;

/// Row, facility and period counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub unique_facilities: usize,
    pub periods: usize,
    pub earliest_as_of: Option<NaiveDate>,
    pub latest_as_of: Option<NaiveDate>,
    pub rows_with_crid: usize,
    pub rows_without_crid: usize,
}

/// Distribution of non-NULL CRID values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CridDistribution {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for fewer than two values
    pub stddev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

/// How often a flag occurs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagFrequency {
    pub flag: String,
    pub occurrences: usize,
    pub pct: f64,
}

/// Rows per completeness bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessBucket {
    pub bucket: &'static str,
    pub count: usize,
    pub pct: f64,
}

/// Why rows without a CRID have none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NullReasons {
    pub incomplete: usize,
    pub small_cohort: usize,
    pub both: usize,
    pub other: usize,
}

/// Coverage of one reporting period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCoverage {
    pub period_id: String,
    pub facilities: usize,
    pub with_crid: usize,
    pub average_crid: Option<f64>,
}

/// One of the highest CRID records of the latest period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCrid {
    pub facility_id: String,
    pub region_code: String,
    pub crid_value: f64,
    pub quality_z: Option<f64>,
    pub utilization_z: Option<f64>,
    pub completeness_pct: f64,
}

/// Read-only summary of a CRID materialization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub summary: RunSummary,
    pub distribution: Option<CridDistribution>,
    pub flags: Vec<FlagFrequency>,
    pub completeness: Vec<CompletenessBucket>,
    pub null_reasons: NullReasons,
    pub coverage: Vec<PeriodCoverage>,
    pub weights: Vec<WeightDefinition>,
    pub top_crid: Vec<TopCrid>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Build a report over `records`
    ///
    /// # Arguments
    /// * `records` - Materialized records, in any order
    /// * `weights` - Weight table of the run, if known
    /// * `min_cohort` - Cohort size the gating invariant is checked against
    #[must_use]
    pub fn from_records(records: &[CridRecord], weights: Option<&WeightTable>, min_cohort: usize) -> Self {
        let mut warnings = Vec::new();
        if records.is_empty() {
            warnings.push("No CRID records to validate".to_string());
        }

        let distribution = crid_distribution(records);
        if let Some(d) = &distribution {
            if d.mean.abs() > MEAN_CRID_WARNING {
                warnings.push(format!(
                    "Mean CRID is {:.4}, far from 0; check peer normalization",
                    d.mean
                ));
            }
        }

        let duplicates = records.len() - records.iter().map(CridRecord::key).unique().count();
        if duplicates > 0 {
            warnings.push(format!("{duplicates} duplicate (facility_id, period_id) keys"));
        }

        let violations = records
            .iter()
            .filter(|r| r.crid_value.is_some() != is_scorable(r, min_cohort))
            .count();
        if violations > 0 {
            warnings.push(format!(
                "{violations} rows break the gating rule: a CRID requires a complete facility \
                 in a cohort of at least {min_cohort} with non-zero spread in both composites"
            ));
        }

        Self {
            summary: summarize(records),
            distribution,
            flags: flag_frequencies(records),
            completeness: completeness_buckets(records),
            null_reasons: null_reasons(records),
            coverage: coverage(records),
            weights: weights.map(WeightTable::definitions).unwrap_or_default(),
            top_crid: top_crid(records),
            warnings,
        }
    }

    /// Whether the report raised any warning
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Emit each warning through the logger
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| CridError::io(path, e))
    }
}

/// Whether a row must carry a CRID; a NULL spread never qualifies
fn is_scorable(record: &CridRecord, min_cohort: usize) -> bool {
    let spread = |stddev: Option<f64>| stddev.is_some_and(|s| s > 0.0);
    record.is_complete()
        && record.cohort_size as usize >= min_cohort
        && spread(record.cohort_quality_stddev)
        && spread(record.cohort_utilization_stddev)
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 100.0 / total as f64 * 100.0).round() / 100.0
}

fn summarize(records: &[CridRecord]) -> RunSummary {
    let facilities: FxHashSet<&str> = records.iter().map(|r| r.facility_id.as_str()).collect();
    let periods: FxHashSet<&str> = records.iter().map(|r| r.period_id.as_str()).collect();
    let rows_with_crid = records.iter().filter(|r| r.crid_value.is_some()).count();

    RunSummary {
        total_rows: records.len(),
        unique_facilities: facilities.len(),
        periods: periods.len(),
        earliest_as_of: records.iter().map(|r| r.as_of_date).min(),
        latest_as_of: records.iter().map(|r| r.as_of_date).max(),
        rows_with_crid,
        rows_without_crid: records.len() - rows_with_crid,
    }
}

fn crid_distribution(records: &[CridRecord]) -> Option<CridDistribution> {
    let values = records
        .iter()
        .filter_map(|r| r.crid_value)
        .sorted_by(f64::total_cmp)
        .collect_vec();
    let (&min, &max) = (values.first()?, values.last()?);

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let stddev = (values.len() > 1).then(|| {
        let squared: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (squared / (n - 1.0)).sqrt()
    });

    Some(CridDistribution {
        count: values.len(),
        mean,
        stddev,
        min,
        max,
        p25: percentile_cont(&values, 0.25)?,
        median: percentile_cont(&values, 0.5)?,
        p75: percentile_cont(&values, 0.75)?,
    })
}

fn flag_frequencies(records: &[CridRecord]) -> Vec<FlagFrequency> {
    records
        .iter()
        .flat_map(|r| r.flags.iter().map(String::as_str))
        .counts()
        .into_iter()
        // Most frequent first, ties in flag declaration order
        .sorted_by_key(|(flag, count)| {
            (
                std::cmp::Reverse(*count),
                CridFlag::from_tag(flag),
                flag.to_string(),
            )
        })
        .map(|(flag, occurrences)| FlagFrequency {
            flag: flag.to_string(),
            occurrences,
            pct: pct(occurrences, records.len()),
        })
        .collect()
}

fn completeness_bucket(completeness_pct: f64) -> &'static str {
    if completeness_pct >= 100.0 {
        "100% (complete)"
    } else if completeness_pct >= 83.0 {
        "83-99% (5 measures)"
    } else if completeness_pct >= 67.0 {
        "67-82% (4 measures)"
    } else {
        "<67% (3 or fewer)"
    }
}

fn completeness_buckets(records: &[CridRecord]) -> Vec<CompletenessBucket> {
    let counts = records
        .iter()
        .map(|r| completeness_bucket(r.completeness_pct))
        .counts();
    ["100% (complete)", "83-99% (5 measures)", "67-82% (4 measures)", "<67% (3 or fewer)"]
        .into_iter()
        .map(|bucket| {
            let count = counts.get(bucket).copied().unwrap_or(0);
            CompletenessBucket {
                bucket,
                count,
                pct: pct(count, records.len()),
            }
        })
        .collect()
}

fn null_reasons(records: &[CridRecord]) -> NullReasons {
    let incomplete_tag = CridFlag::IncompleteMeasures.as_str();
    let small_tag = CridFlag::SmallState.as_str();

    records
        .iter()
        .filter(|r| r.crid_value.is_none())
        .fold(NullReasons::default(), |mut reasons, r| {
            match (r.has_flag(incomplete_tag), r.has_flag(small_tag)) {
                (true, true) => reasons.both += 1,
                (true, false) => reasons.incomplete += 1,
                (false, true) => reasons.small_cohort += 1,
                (false, false) => reasons.other += 1,
            }
            reasons
        })
}

fn coverage(records: &[CridRecord]) -> Vec<PeriodCoverage> {
    let mut by_period: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for r in records {
        let entry = by_period.entry(r.period_id.as_str()).or_default();
        entry.0 += 1;
        if let Some(crid) = r.crid_value {
            entry.1 += 1;
            entry.2 += crid;
        }
    }

    by_period
        .into_iter()
        .map(|(period_id, (facilities, with_crid, sum))| PeriodCoverage {
            period_id: period_id.to_string(),
            facilities,
            with_crid,
            average_crid: (with_crid > 0).then(|| sum / with_crid as f64),
        })
        .collect()
}

fn top_crid(records: &[CridRecord]) -> Vec<TopCrid> {
    let Some(latest) = records.iter().map(|r| r.period_id.as_str()).max() else {
        return Vec::new();
    };

    records
        .iter()
        .filter(|r| r.period_id == latest)
        .filter_map(|r| r.crid_value.map(|crid| (crid, r)))
        .sorted_by(|(a, ra), (b, rb)| b.total_cmp(a).then_with(|| ra.facility_id.cmp(&rb.facility_id)))
        .take(TOP_CRID_LIMIT)
        .map(|(crid_value, r)| TopCrid {
            facility_id: r.facility_id.clone(),
            region_code: r.region_code.clone(),
            crid_value,
            quality_z: r.quality_z,
            utilization_z: r.utilization_z,
            completeness_pct: r.completeness_pct,
        })
        .collect()
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| format!("{v:.decimals$}"))
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{rule}")?;
        writeln!(f, "CRID MATERIALIZATION VALIDATION")?;
        writeln!(f, "{rule}")?;

        let s = &self.summary;
        writeln!(f, "\n[1] SUMMARY")?;
        writeln!(f, "    Total rows:          {}", s.total_rows)?;
        writeln!(f, "    With valid CRID:     {}", s.rows_with_crid)?;
        writeln!(f, "    Without CRID (NULL): {}", s.rows_without_crid)?;
        writeln!(f, "    Unique facilities:   {}", s.unique_facilities)?;
        writeln!(f, "    Periods:             {}", s.periods)?;
        if let (Some(earliest), Some(latest)) = (s.earliest_as_of, s.latest_as_of) {
            writeln!(f, "    Date range:          {earliest} to {latest}")?;
        }

        writeln!(f, "\n[2] CRID DISTRIBUTION (non-NULL only)")?;
        match &self.distribution {
            Some(d) => {
                writeln!(f, "    Mean:   {:.4}", d.mean)?;
                writeln!(f, "    StdDev: {}", fmt_opt(d.stddev, 4))?;
                writeln!(f, "    Min:    {:.4}", d.min)?;
                writeln!(f, "    Max:    {:.4}", d.max)?;
                writeln!(f, "    P25:    {:.4}", d.p25)?;
                writeln!(f, "    Median: {:.4}", d.median)?;
                writeln!(f, "    P75:    {:.4}", d.p75)?;
            }
            None => writeln!(f, "    No CRID values")?,
        }

        writeln!(f, "\n[3] FLAG DISTRIBUTION")?;
        if self.flags.is_empty() {
            writeln!(f, "    No flags assigned")?;
        }
        for flag in &self.flags {
            writeln!(f, "    {}: {} ({}%)", flag.flag, flag.occurrences, flag.pct)?;
        }

        writeln!(f, "\n[4] COMPLETENESS DISTRIBUTION")?;
        for bucket in &self.completeness {
            writeln!(f, "    {}: {} ({}%)", bucket.bucket, bucket.count, bucket.pct)?;
        }

        let n = &self.null_reasons;
        writeln!(f, "\n[5] NULL CRID REASONS")?;
        writeln!(f, "    Both: incomplete + small cohort: {}", n.both)?;
        writeln!(f, "    Incomplete measures:             {}", n.incomplete)?;
        writeln!(f, "    Small cohort:                    {}", n.small_cohort)?;
        writeln!(f, "    Other:                           {}", n.other)?;

        writeln!(f, "\n[6] COVERAGE BY PERIOD")?;
        let shown = self.coverage.len() > 10;
        for (i, period) in self.coverage.iter().enumerate() {
            if shown && i == 5 {
                writeln!(f, "    ...")?;
            }
            if shown && i >= 5 && i < self.coverage.len() - 5 {
                continue;
            }
            writeln!(
                f,
                "    {}: {}/{} with CRID, avg={}",
                period.period_id,
                period.with_crid,
                period.facilities,
                fmt_opt(period.average_crid, 4)
            )?;
        }

        writeln!(f, "\n[7] WEIGHTS")?;
        if self.weights.is_empty() {
            writeln!(f, "    Not available")?;
        }
        for w in &self.weights {
            writeln!(f, "    {} ({}): {}", w.measure_code, w.component_family, w.weight)?;
        }

        writeln!(f, "\n[8] TOP {TOP_CRID_LIMIT} HIGHEST CRID (latest period)")?;
        for t in &self.top_crid {
            writeln!(
                f,
                "    {} ({}): CRID={:.3}, quality_z={}, utilization_z={}",
                t.facility_id,
                t.region_code,
                t.crid_value,
                fmt_opt(t.quality_z, 3),
                fmt_opt(t.utilization_z, 3)
            )?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "\nWARNINGS")?;
            for warning in &self.warnings {
                writeln!(f, "    {warning}")?;
            }
        }

        writeln!(f, "\n{rule}")
    }
}
