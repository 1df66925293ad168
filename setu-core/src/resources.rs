//! Typed series built on top of the generic aggregator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_by_date, AggregateSpec, Availability};
use crate::model::{Demographics, ResourceKind, ResourceSubmission, Row};
use crate::SetuConfig;

/// City-wide availability of every resource category for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDay {
    pub date: NaiveDate,
    pub resources: BTreeMap<ResourceKind, Availability>,
}

impl ResourceDay {
    pub fn get(&self, kind: ResourceKind) -> Availability {
        self.resources.get(&kind).copied().unwrap_or_default()
    }
}

/// Patient mix for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemographicDay {
    pub date: NaiveDate,
    pub below_16: u64,
    pub age_16_to_30: u64,
    pub age_30_to_50: u64,
    pub age_50_to_70: u64,
    pub above_70: u64,
    pub male: u64,
    pub female: u64,
    /// Sum of the age brackets.
    pub total: u64,
}

/// Percent of each category in use for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UtilizationPoint {
    pub hospital_id: String,
    pub date: NaiveDate,
    pub percent: BTreeMap<ResourceKind, f64>,
}

/// Traffic-light classification shown on availability cards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityLevel {
    Good,
    Limited,
    Critical,
    /// No capacity was reported.
    Unknown,
}

impl AvailabilityLevel {
    pub fn classify(used: u64, total: u64, config: &SetuConfig) -> Self {
        if total == 0 {
            return AvailabilityLevel::Unknown;
        }
        match utilization_percent(used, total) {
            pct if pct >= config.critical_utilization_pct => AvailabilityLevel::Critical,
            pct if pct >= config.limited_utilization_pct => AvailabilityLevel::Limited,
            _ => AvailabilityLevel::Good,
        }
    }
}

/// `used / total * 100`, or 0 when nothing is reported as total.
pub fn utilization_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

/// Sum every resource pair per date, first-occurrence order.
pub fn aggregate_resources(submissions: &[ResourceSubmission]) -> Vec<ResourceDay> {
    let rows: Vec<Row> = submissions.iter().map(ResourceSubmission::to_row).collect();
    aggregate_by_date(&rows, &AggregateSpec::resources())
        .into_iter()
        .map(|day| ResourceDay {
            date: day.date,
            resources: ResourceKind::ALL
                .into_iter()
                .map(|kind| {
                    let entry = day
                        .availability
                        .get(kind.label())
                        .copied()
                        .unwrap_or_default();
                    (kind, entry)
                })
                .collect(),
        })
        .collect()
}

/// Sum the demographic breakdown per date, first-occurrence order.
pub fn aggregate_demographics(submissions: &[ResourceSubmission]) -> Vec<DemographicDay> {
    let rows: Vec<Row> = submissions.iter().map(ResourceSubmission::to_row).collect();
    aggregate_by_date(&rows, &AggregateSpec::new(Demographics::FIELDS))
        .into_iter()
        .map(|day| {
            let summed = Demographics {
                patients_below_16: day.sum("patients_below_16"),
                patients_16_to_30: day.sum("patients_16_to_30"),
                patients_30_to_50: day.sum("patients_30_to_50"),
                patients_50_to_70: day.sum("patients_50_to_70"),
                patients_above_70: day.sum("patients_above_70"),
                male_patients: day.sum("male_patients"),
                female_patients: day.sum("female_patients"),
            };
            DemographicDay {
                date: day.date,
                below_16: summed.patients_below_16,
                age_16_to_30: summed.patients_16_to_30,
                age_30_to_50: summed.patients_30_to_50,
                age_50_to_70: summed.patients_50_to_70,
                above_70: summed.patients_above_70,
                male: summed.male_patients,
                female: summed.female_patients,
                total: summed.age_total(),
            }
        })
        .collect()
}

/// Per-submission utilization, in input order.
pub fn utilization_series(submissions: &[ResourceSubmission]) -> Vec<UtilizationPoint> {
    submissions
        .iter()
        .map(|submission| UtilizationPoint {
            hospital_id: submission.hospital_id.clone(),
            date: submission.date,
            percent: ResourceKind::ALL
                .into_iter()
                .map(|kind| {
                    (
                        kind,
                        utilization_percent(submission.used(kind), submission.total(kind)),
                    )
                })
                .collect(),
        })
        .collect()
}
