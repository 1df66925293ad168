//! Hospital scoping and submission coverage.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Hospital, ResourceSubmission};
use crate::range::{DateRange, RangeOption};

/// Hospitals whose `location` equals `city` exactly. Case matters and a
/// missing location never matches.
pub fn filter_hospitals_by_city<'a>(hospitals: &'a [Hospital], city: &str) -> Vec<&'a Hospital> {
    hospitals
        .iter()
        .filter(|hospital| hospital.location.as_deref() == Some(city))
        .collect()
}

/// Department ids of `hospitals` in first-seen order, skipping hospitals
/// that have none.
pub fn department_ids<'a, I>(hospitals: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Hospital>,
{
    let mut seen = HashSet::new();
    hospitals
        .into_iter()
        .filter_map(|hospital| hospital.department_id.as_deref())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Hospitals without a submission on `date`.
pub fn missing_submissions<'a>(
    hospitals: &'a [Hospital],
    submissions: &[ResourceSubmission],
    date: NaiveDate,
) -> Vec<&'a Hospital> {
    let submitted: HashSet<&str> = submissions
        .iter()
        .filter(|submission| submission.date == date)
        .map(|submission| submission.hospital_id.as_str())
        .collect();

    hospitals
        .iter()
        .filter(|hospital| match hospital.department_id.as_deref() {
            Some(id) => !submitted.contains(id),
            None => true,
        })
        .collect()
}

/// Submission counts shown at the top of the admin dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewStats {
    pub submitted_today: usize,
    pub last_7_days: usize,
    pub last_30_days: usize,
    pub hospitals: usize,
    pub missing_today: usize,
}

impl OverviewStats {
    pub fn compute(
        hospital_count: usize,
        submissions: &[ResourceSubmission],
        today: NaiveDate,
    ) -> Self {
        let count_in = |range: DateRange| {
            submissions
                .iter()
                .filter(|submission| range.contains(submission.date))
                .count()
        };

        let submitted_today = count_in(DateRange::single(today));
        Self {
            submitted_today,
            last_7_days: count_in(RangeOption::Week.ending(today)),
            last_30_days: count_in(RangeOption::Month.ending(today)),
            hospitals: hospital_count,
            missing_today: hospital_count.saturating_sub(submitted_today),
        }
    }
}
