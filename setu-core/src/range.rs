use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::SetuError;

/// Look-back windows offered by the dashboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeOption {
    Today,
    Week,
    Fortnight,
    Month,
}

impl RangeOption {
    pub fn days(self) -> i64 {
        match self {
            RangeOption::Today => 1,
            RangeOption::Week => 7,
            RangeOption::Fortnight => 14,
            RangeOption::Month => 30,
        }
    }

    pub fn ending(self, today: NaiveDate) -> DateRange {
        DateRange::last_days(today, self.days())
    }
}

impl FromStr for RangeOption {
    type Err = SetuError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "today" | "1 day" => Ok(RangeOption::Today),
            "week" | "7 days" => Ok(RangeOption::Week),
            "fortnight" | "14 days" => Ok(RangeOption::Fortnight),
            "month" | "30 days" => Ok(RangeOption::Month),
            _ => Err(SetuError::UnknownRange(value.to_string())),
        }
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// `today - days ..= today`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            from: today - Duration::days(days),
            to: today,
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_range_reaches_back_seven_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let range = RangeOption::Week.ending(today);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert!(range.contains(today));
        assert!(range.contains(range.from));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()));
    }

    #[test]
    fn parses_dashboard_labels() {
        assert_eq!("7 Days".parse::<RangeOption>().unwrap(), RangeOption::Week);
        assert_eq!("Month".parse::<RangeOption>().unwrap(), RangeOption::Month);
        assert_eq!("today".parse::<RangeOption>().unwrap(), RangeOption::Today);
        assert!(matches!(
            "quarter".parse::<RangeOption>(),
            Err(SetuError::UnknownRange(_))
        ));
    }
}
