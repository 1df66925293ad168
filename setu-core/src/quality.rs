//! Submission-time validation and rule-based data quality checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{ResourceKind, ResourceSubmission};
use crate::SetuError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataQualityFlag {
    UsedExceedsTotal {
        kind: ResourceKind,
        used: u64,
        total: u64,
    },
    /// Male + female disagrees with the sum of the age brackets.
    GenderMismatch { male: u64, female: u64, age_total: u64 },
}

impl DataQualityFlag {
    pub fn describe(&self) -> String {
        match self {
            DataQualityFlag::UsedExceedsTotal { kind, used, total } => {
                format!("{kind} usage {used} exceeds reported capacity {total}")
            }
            DataQualityFlag::GenderMismatch {
                male,
                female,
                age_total,
            } => format!("Gender total mismatch ({male}M + {female}F != {age_total} total)"),
        }
    }
}

/// Flags raised for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityReport {
    pub hospital_id: String,
    pub date: NaiveDate,
    pub flags: Vec<DataQualityFlag>,
}

/// Every pair where used exceeds total.
pub fn submission_violations(submission: &ResourceSubmission) -> Vec<DataQualityFlag> {
    ResourceKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let (used, total) = (submission.used(kind), submission.total(kind));
            (used > total).then_some(DataQualityFlag::UsedExceedsTotal { kind, used, total })
        })
        .collect()
}

/// Rejects a submission whose used count exceeds its total for any pair.
pub fn validate_submission(submission: &ResourceSubmission) -> Result<(), SetuError> {
    for kind in ResourceKind::ALL {
        let (used, total) = (submission.used(kind), submission.total(kind));
        if used > total {
            return Err(SetuError::UsedExceedsTotal { kind, used, total });
        }
    }
    Ok(())
}

/// Reports for submissions with at least one flag, in input order.
pub fn data_quality_flags(submissions: &[ResourceSubmission]) -> Vec<QualityReport> {
    submissions
        .iter()
        .filter_map(|submission| {
            let mut flags = submission_violations(submission);

            let demographics = &submission.demographics;
            let age_total = demographics.age_total();
            let gender_total = demographics.gender_total();
            if age_total > 0 && gender_total > 0 && age_total != gender_total {
                flags.push(DataQualityFlag::GenderMismatch {
                    male: demographics.male_patients,
                    female: demographics.female_patients,
                    age_total,
                });
            }

            if flags.is_empty() {
                return None;
            }

            warn!(
                hospital_id = %submission.hospital_id,
                date = %submission.date,
                flags = flags.len(),
                "submission failed data quality checks"
            );
            Some(QualityReport {
                hospital_id: submission.hospital_id.clone(),
                date: submission.date,
                flags,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Demographics;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 19).unwrap()
    }

    #[test]
    fn validation_reports_first_violation() {
        let ok = ResourceSubmission::new("d1", day()).with_resource(ResourceKind::Icu, 10, 10);
        assert!(validate_submission(&ok).is_ok());

        let bad = ResourceSubmission::new("d1", day())
            .with_resource(ResourceKind::Oxygen, 5, 4)
            .with_resource(ResourceKind::Icu, 12, 10);
        match validate_submission(&bad) {
            Err(SetuError::UsedExceedsTotal { kind, used, total }) => {
                assert_eq!((kind, used, total), (ResourceKind::Icu, 12, 10));
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(submission_violations(&bad).len(), 2);
    }

    #[test]
    fn gender_mismatch_is_flagged() {
        let demographics = Demographics {
            patients_16_to_30: 30,
            male_patients: 22,
            female_patients: 12,
            ..Demographics::default()
        };
        let submissions = vec![
            ResourceSubmission::new("d1", day()).with_demographics(demographics),
            ResourceSubmission::new("d2", day()),
        ];
        let reports = data_quality_flags(&submissions);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].hospital_id, "d1");
        assert_eq!(
            reports[0].flags[0].describe(),
            "Gender total mismatch (22M + 12F != 30 total)"
        );
    }
}
