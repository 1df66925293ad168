use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Resource categories reported as used/total pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Beds,
    Icu,
    Oxygen,
    Dialysis,
    Doctors,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Beds,
        ResourceKind::Icu,
        ResourceKind::Oxygen,
        ResourceKind::Dialysis,
        ResourceKind::Doctors,
    ];

    /// Short label used for `<label>_available` keys.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Beds => "beds",
            ResourceKind::Icu => "icu",
            ResourceKind::Oxygen => "oxygen",
            ResourceKind::Dialysis => "dialysis",
            ResourceKind::Doctors => "doctors",
        }
    }

    pub fn used_field(self) -> &'static str {
        match self {
            ResourceKind::Beds => "beds_used",
            ResourceKind::Icu => "icu_beds_used",
            ResourceKind::Oxygen => "oxygen_units_used",
            ResourceKind::Dialysis => "dialysis_machines_used",
            ResourceKind::Doctors => "doctors_available",
        }
    }

    pub fn total_field(self) -> &'static str {
        match self {
            ResourceKind::Beds => "total_beds",
            ResourceKind::Icu => "total_icu_beds",
            ResourceKind::Oxygen => "total_oxygen_units",
            ResourceKind::Dialysis => "total_dialysis_machines",
            ResourceKind::Doctors => "total_doctors_working",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ResourceKind::Beds => "General beds",
            ResourceKind::Icu => "ICU beds",
            ResourceKind::Oxygen => "Oxygen units",
            ResourceKind::Dialysis => "Dialysis machines",
            ResourceKind::Doctors => "Doctors",
        }
    }

    /// Lookup by availability label (`"icu"`, `"beds"`...).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Hospital registry entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hospital {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Identity that submits on behalf of the hospital; joins to
    /// `ResourceSubmission::hospital_id`.
    #[serde(default)]
    pub department_id: Option<String>,
}

/// Patient counts by age bracket and sex.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Demographics {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub patients_below_16: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub patients_16_to_30: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub patients_30_to_50: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub patients_50_to_70: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub patients_above_70: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub male_patients: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub female_patients: u64,
}

impl Demographics {
    pub const FIELDS: [&'static str; 7] = [
        "patients_below_16",
        "patients_16_to_30",
        "patients_30_to_50",
        "patients_50_to_70",
        "patients_above_70",
        "male_patients",
        "female_patients",
    ];

    /// Patients counted across the age brackets.
    pub fn age_total(&self) -> u64 {
        self.patients_below_16
            .saturating_add(self.patients_16_to_30)
            .saturating_add(self.patients_30_to_50)
            .saturating_add(self.patients_50_to_70)
            .saturating_add(self.patients_above_70)
    }

    pub fn gender_total(&self) -> u64 {
        self.male_patients.saturating_add(self.female_patients)
    }

    fn values(&self) -> [u64; 7] {
        [
            self.patients_below_16,
            self.patients_16_to_30,
            self.patients_30_to_50,
            self.patients_50_to_70,
            self.patients_above_70,
            self.male_patients,
            self.female_patients,
        ]
    }
}

/// One hospital's report for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSubmission {
    pub hospital_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub beds_used: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_beds: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub icu_beds_used: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_icu_beds: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub oxygen_units_used: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_oxygen_units: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub dialysis_machines_used: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_dialysis_machines: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub doctors_available: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_doctors_working: u64,
    #[serde(flatten)]
    pub demographics: Demographics,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub common_symptoms: Vec<String>,
    #[serde(default)]
    pub weekly_diagnosis_summary: Option<String>,
}

impl ResourceSubmission {
    /// Submission with every count at zero.
    pub fn new(hospital_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            hospital_id: hospital_id.into(),
            date,
            beds_used: 0,
            total_beds: 0,
            icu_beds_used: 0,
            total_icu_beds: 0,
            oxygen_units_used: 0,
            total_oxygen_units: 0,
            dialysis_machines_used: 0,
            total_dialysis_machines: 0,
            doctors_available: 0,
            total_doctors_working: 0,
            demographics: Demographics::default(),
            common_symptoms: Vec::new(),
            weekly_diagnosis_summary: None,
        }
    }

    /// Builder-style setter for one used/total pair.
    pub fn with_resource(mut self, kind: ResourceKind, used: u64, total: u64) -> Self {
        self.set_resource(kind, used, total);
        self
    }

    pub fn with_demographics(mut self, demographics: Demographics) -> Self {
        self.demographics = demographics;
        self
    }

    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_symptoms = symptoms.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_resource(&mut self, kind: ResourceKind, used: u64, total: u64) {
        let (used_slot, total_slot) = self.pair_mut(kind);
        *used_slot = used;
        *total_slot = total;
    }

    pub fn used(&self, kind: ResourceKind) -> u64 {
        self.pair(kind).0
    }

    pub fn total(&self, kind: ResourceKind) -> u64 {
        self.pair(kind).1
    }

    fn pair(&self, kind: ResourceKind) -> (u64, u64) {
        match kind {
            ResourceKind::Beds => (self.beds_used, self.total_beds),
            ResourceKind::Icu => (self.icu_beds_used, self.total_icu_beds),
            ResourceKind::Oxygen => (self.oxygen_units_used, self.total_oxygen_units),
            ResourceKind::Dialysis => (self.dialysis_machines_used, self.total_dialysis_machines),
            ResourceKind::Doctors => (self.doctors_available, self.total_doctors_working),
        }
    }

    fn pair_mut(&mut self, kind: ResourceKind) -> (&mut u64, &mut u64) {
        match kind {
            ResourceKind::Beds => (&mut self.beds_used, &mut self.total_beds),
            ResourceKind::Icu => (&mut self.icu_beds_used, &mut self.total_icu_beds),
            ResourceKind::Oxygen => (&mut self.oxygen_units_used, &mut self.total_oxygen_units),
            ResourceKind::Dialysis => (
                &mut self.dialysis_machines_used,
                &mut self.total_dialysis_machines,
            ),
            ResourceKind::Doctors => (
                &mut self.doctors_available,
                &mut self.total_doctors_working,
            ),
        }
    }

    /// Flatten into a generic row carrying every numeric field.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new(self.hospital_id.clone(), self.date);
        for kind in ResourceKind::ALL {
            row.set(kind.used_field(), Some(self.used(kind)));
            row.set(kind.total_field(), Some(self.total(kind)));
        }
        for (field, value) in Demographics::FIELDS.into_iter().zip(self.demographics.values()) {
            row.set(field, Some(value));
        }
        row
    }
}

/// Flat record keyed by field name, as returned by the row store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub hospital_id: String,
    pub date: NaiveDate,
    pub values: BTreeMap<String, Option<u64>>,
}

impl Row {
    pub fn new(hospital_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            hospital_id: hospital_id.into(),
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: u64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Records the field as present but null.
    pub fn with_null(mut self, field: impl Into<String>) -> Self {
        self.set(field, None);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<u64>) {
        self.values.insert(field.into(), value);
    }

    /// Field value with absent and null both read as zero.
    pub fn get(&self, field: &str) -> u64 {
        self.values.get(field).copied().flatten().unwrap_or(0)
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

fn empty_if_null<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_reads_nulls_as_zero() {
        let raw = r#"{
            "hospital_id": "dept-1",
            "date": "2025-01-01",
            "icu_beds_used": null,
            "total_icu_beds": 10,
            "male_patients": 4,
            "female_patients": null,
            "common_symptoms": null
        }"#;
        let submission: ResourceSubmission = serde_json::from_str(raw).unwrap();
        assert_eq!(submission.used(ResourceKind::Icu), 0);
        assert_eq!(submission.total(ResourceKind::Icu), 10);
        assert_eq!(submission.total(ResourceKind::Beds), 0);
        assert_eq!(submission.demographics.male_patients, 4);
        assert_eq!(submission.demographics.female_patients, 0);
        assert!(submission.common_symptoms.is_empty());
    }

    #[test]
    fn to_row_exposes_every_pair() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let row = ResourceSubmission::new("dept-1", date)
            .with_resource(ResourceKind::Oxygen, 7, 20)
            .to_row();
        assert_eq!(row.get("oxygen_units_used"), 7);
        assert_eq!(row.get("total_oxygen_units"), 20);
        assert_eq!(row.get("beds_used"), 0);
        assert_eq!(row.values.len(), 17);
    }

    #[test]
    fn labels_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(ResourceKind::from_label("ventilators"), None);
    }
}
