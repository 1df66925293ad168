//! Core types and pure aggregation logic for hospital resource reporting.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

mod aggregate;
mod coverage;
mod model;
mod quality;
mod range;
mod resources;
mod symptoms;

pub use aggregate::{
    aggregate_by_date, availability, count_from_f64, series_totals, sort_chronologically,
    AggregateSpec, AggregatedDay, Availability, FieldPair,
};
pub use coverage::{
    department_ids, filter_hospitals_by_city, missing_submissions, OverviewStats,
};
pub use model::{Demographics, Hospital, ResourceKind, ResourceSubmission, Row};
pub use quality::{
    data_quality_flags, submission_violations, validate_submission, DataQualityFlag,
    QualityReport,
};
pub use range::{DateRange, RangeOption};
pub use resources::{
    aggregate_demographics, aggregate_resources, utilization_percent, utilization_series,
    AvailabilityLevel, DemographicDay, ResourceDay, UtilizationPoint,
};
pub use symptoms::{symptom_frequencies, symptom_reports, SymptomCount};

/// Thresholds and defaults shared by every view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SetuConfig {
    /// Utilization percentage at or above which a resource is critical.
    pub critical_utilization_pct: f64,
    /// Utilization percentage at or above which a resource is limited.
    pub limited_utilization_pct: f64,
    /// Range used by trend views when the caller does not pick one.
    pub default_range: RangeOption,
    /// Offset from UTC used to decide what "today" is for submissions.
    pub utc_offset_minutes: i32,
    /// Number of days a forecast must cover.
    pub forecast_horizon_days: usize,
}

impl Default for SetuConfig {
    fn default() -> Self {
        Self {
            critical_utilization_pct: 90.0,
            limited_utilization_pct: 70.0,
            default_range: RangeOption::Week,
            // Asia/Kolkata
            utc_offset_minutes: 330,
            forecast_horizon_days: 3,
        }
    }
}

impl SetuConfig {
    /// Calendar day of `now` in the configured offset.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SetuError {
    #[error("input is missing required data")]
    MissingData,
    #[error("could not parse input: {0}")]
    Parse(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("unknown range option: {0}")]
    UnknownRange(String),
    #[error("{kind} used ({used}) exceeds total ({total})")]
    UsedExceedsTotal {
        kind: ResourceKind,
        used: u64,
        total: u64,
    },
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, SetuError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| SetuError::InvalidDate(value.to_string()))
}
