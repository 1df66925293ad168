//! Row store abstraction and the in-memory implementation.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use setu_core::{validate_submission, DateRange, Hospital, ResourceSubmission, SetuError};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("submission rejected: {0}")]
    Rejected(#[from] SetuError),
    #[error("hospital {hospital_id} already submitted for {date}")]
    Duplicate {
        hospital_id: String,
        date: NaiveDate,
    },
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Equality and range filters applied to the submissions table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionFilter {
    /// `hospital_id IN (...)`; `None` means no restriction.
    pub hospital_ids: Option<Vec<String>>,
    pub range: Option<DateRange>,
}

impl SubmissionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_hospitals(ids: Vec<String>) -> Self {
        Self {
            hospital_ids: Some(ids),
            range: None,
        }
    }

    pub fn in_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn on(self, date: NaiveDate) -> Self {
        self.in_range(DateRange::single(date))
    }

    pub fn matches(&self, submission: &ResourceSubmission) -> bool {
        let hospital_ok = self
            .hospital_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| *id == submission.hospital_id));
        let range_ok = self
            .range
            .map_or(true, |range| range.contains(submission.date));
        hospital_ok && range_ok
    }
}

/// Upstream data store queried by the views.
pub trait ResourceStore {
    fn hospitals(&self) -> Result<Vec<Hospital>, StoreError>;

    /// Matching submissions ordered by date ascending.
    fn submissions(&self, filter: &SubmissionFilter)
        -> Result<Vec<ResourceSubmission>, StoreError>;
}

/// Serialized form of a whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
    #[serde(default)]
    pub resources: Vec<ResourceSubmission>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    dataset: Dataset,
}

impl InMemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn add_hospital(&mut self, hospital: Hospital) {
        self.dataset.hospitals.push(hospital);
    }

    /// Accepts a daily report after the used/total check, one per hospital
    /// per day.
    pub fn submit(&mut self, submission: ResourceSubmission) -> Result<(), StoreError> {
        validate_submission(&submission)?;

        let duplicate = self.dataset.resources.iter().any(|existing| {
            existing.hospital_id == submission.hospital_id && existing.date == submission.date
        });
        if duplicate {
            return Err(StoreError::Duplicate {
                hospital_id: submission.hospital_id,
                date: submission.date,
            });
        }

        debug!(hospital_id = %submission.hospital_id, date = %submission.date, "submission stored");
        self.dataset.resources.push(submission);
        Ok(())
    }

    /// Most recent submission date of one hospital.
    pub fn last_submission(&self, hospital_id: &str) -> Option<NaiveDate> {
        self.dataset
            .resources
            .iter()
            .filter(|submission| submission.hospital_id == hospital_id)
            .map(|submission| submission.date)
            .max()
    }
}

impl ResourceStore for InMemoryStore {
    fn hospitals(&self) -> Result<Vec<Hospital>, StoreError> {
        Ok(self.dataset.hospitals.clone())
    }

    fn submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<ResourceSubmission>, StoreError> {
        let mut matched: Vec<ResourceSubmission> = self
            .dataset
            .resources
            .iter()
            .filter(|submission| filter.matches(submission))
            .cloned()
            .collect();
        matched.sort_by_key(|submission| submission.date);
        Ok(matched)
    }
}
