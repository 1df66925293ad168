//! Group rows by date, sum fields and derive availability.

use std::collections::{hash_map::Entry, BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ResourceKind, Row};

/// Hospital id carried by synthetic rows built from aggregated days.
const AGGREGATE_ROW_ID: &str = "*";

/// `max(total - used, 0)`.
pub fn availability(used: u64, total: u64) -> u64 {
    total.saturating_sub(used)
}

/// Count from a reported number: non-negative finite values are truncated,
/// anything else is not a count.
pub fn count_from_f64(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}

/// Availability of one resource category, keeping the signal that the
/// underlying data reported more used than total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Availability {
    pub used: u64,
    pub total: u64,
    pub available: u64,
    /// `used > total` in the source data.
    pub flagged: bool,
}

impl Availability {
    pub fn of(used: u64, total: u64) -> Self {
        Self {
            used,
            total,
            available: availability(used, total),
            flagged: used > total,
        }
    }
}

/// A used/total pair and the label its availability is reported under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldPair {
    pub label: String,
    pub used: String,
    pub total: String,
}

impl From<ResourceKind> for FieldPair {
    fn from(kind: ResourceKind) -> Self {
        Self {
            label: kind.label().to_string(),
            used: kind.used_field().to_string(),
            total: kind.total_field().to_string(),
        }
    }
}

/// Which fields to sum and which pairs to derive availability for.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AggregateSpec {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub pairs: Vec<FieldPair>,
}

impl AggregateSpec {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            pairs: Vec::new(),
        }
    }

    /// Adds a pair; both of its fields are summed.
    pub fn with_pair(
        mut self,
        label: impl Into<String>,
        used: impl Into<String>,
        total: impl Into<String>,
    ) -> Self {
        self.pairs.push(FieldPair {
            label: label.into(),
            used: used.into(),
            total: total.into(),
        });
        self
    }

    /// Every resource pair, used and total sides.
    pub fn resources() -> Self {
        Self {
            fields: Vec::new(),
            pairs: ResourceKind::ALL.into_iter().map(FieldPair::from).collect(),
        }
    }

    /// Summed fields in declaration order, pairs after plain fields, no
    /// duplicates.
    pub fn summed_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let declared = self.fields.iter().map(String::as_str);
        let paired = self
            .pairs
            .iter()
            .flat_map(|pair| [pair.used.as_str(), pair.total.as_str()]);
        for field in declared.chain(paired) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}

/// Per-date sums and derived availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedDay {
    pub date: NaiveDate,
    pub sums: BTreeMap<String, u64>,
    pub availability: BTreeMap<String, Availability>,
}

impl AggregatedDay {
    fn empty(date: NaiveDate, fields: &[&str]) -> Self {
        Self {
            date,
            sums: fields.iter().map(|field| (field.to_string(), 0)).collect(),
            availability: BTreeMap::new(),
        }
    }

    pub fn sum(&self, field: &str) -> u64 {
        self.sums.get(field).copied().unwrap_or(0)
    }

    pub fn available(&self, label: &str) -> Option<u64> {
        self.availability.get(label).map(|entry| entry.available)
    }

    /// Labels whose source data reported used above total.
    pub fn flagged_labels(&self) -> Vec<&str> {
        self.availability
            .iter()
            .filter(|(_, entry)| entry.flagged)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// One synthetic row carrying this day's sums under the source field
    /// names, so a series can be merged with further rows.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new(AGGREGATE_ROW_ID, self.date);
        for (field, sum) in &self.sums {
            row.set(field.clone(), Some(*sum));
        }
        row
    }
}

impl Serialize for AggregatedDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flagged = self.availability.values().filter(|a| a.flagged).count();
        let mut map =
            serializer.serialize_map(Some(1 + self.sums.len() + self.availability.len() + flagged))?;
        map.serialize_entry("date", &self.date)?;
        for (field, sum) in &self.sums {
            map.serialize_entry(&format!("{field}_sum"), sum)?;
        }
        for (label, entry) in &self.availability {
            map.serialize_entry(&format!("{label}_available"), &entry.available)?;
            if entry.flagged {
                map.serialize_entry(&format!("{label}_flagged"), &true)?;
            }
        }
        map.end()
    }
}

/// Group `rows` by date and sum every field `spec` names.
///
/// Output keeps the first-occurrence order of each date; use
/// [`sort_chronologically`] when a time axis is needed. Absent and null
/// fields contribute zero.
pub fn aggregate_by_date(rows: &[Row], spec: &AggregateSpec) -> Vec<AggregatedDay> {
    let fields = spec.summed_fields();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut days: Vec<AggregatedDay> = Vec::new();

    for row in rows {
        let slot = match index.entry(row.date) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                days.push(AggregatedDay::empty(row.date, &fields));
                *entry.insert(days.len() - 1)
            }
        };

        let day = &mut days[slot];
        for field in &fields {
            if let Some(sum) = day.sums.get_mut(*field) {
                *sum = sum.saturating_add(row.get(field));
            }
        }
    }

    for day in &mut days {
        for pair in &spec.pairs {
            let entry = Availability::of(day.sum(&pair.used), day.sum(&pair.total));
            if entry.flagged {
                debug!(
                    date = %day.date,
                    label = %pair.label,
                    used = entry.used,
                    total = entry.total,
                    "used exceeds total, availability clamped to zero"
                );
            }
            day.availability.insert(pair.label.clone(), entry);
        }
    }

    days
}

pub fn sort_chronologically(days: &mut [AggregatedDay]) {
    days.sort_by_key(|day| day.date);
}

/// Totals of each summed field across a whole series.
pub fn series_totals(days: &[AggregatedDay]) -> BTreeMap<String, u64> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for day in days {
        for (field, sum) in &day.sums {
            let slot = totals.entry(field.clone()).or_default();
            *slot = slot.saturating_add(*sum);
        }
    }
    totals
}
