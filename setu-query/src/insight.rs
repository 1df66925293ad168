//! Seams for the external forecast, anomaly and triage capabilities.
//!
//! Implementations take structured data and return JSON; this module owns
//! the declared response shapes and checks replies against them.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use setu_core::{count_from_f64, DataQualityFlag, ResourceDay, ResourceSubmission};

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// City-wide daily series handed to a [`Forecaster`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastInput {
    pub city: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub horizon_days: usize,
    pub days: Vec<ResourceDay>,
}

/// Demand forecast for the next few days.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Forecast {
    #[serde(default)]
    pub alerts: Vec<String>,
    pub icu_beds: Vec<u64>,
    pub oxygen_units: Vec<u64>,
}

impl Forecast {
    /// Reads `{ "alerts": [...], "forecast": { "icu_beds": [...], "oxygen_units": [...] } }`.
    /// Counts may arrive as numbers or numeric strings; fractions are truncated.
    pub fn from_response(value: &Value, horizon_days: usize) -> Result<Self, InsightError> {
        let alerts = value
            .get("alerts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let forecast = value
            .get("forecast")
            .ok_or_else(|| InsightError::Malformed("missing forecast".to_string()))?;

        let icu_beds = series(forecast, "icu_beds", horizon_days)?;
        let oxygen_units = series(forecast, "oxygen_units", horizon_days)?;

        Ok(Self {
            alerts,
            icu_beds,
            oxygen_units,
        })
    }
}

fn series(forecast: &Value, key: &str, horizon_days: usize) -> Result<Vec<u64>, InsightError> {
    let items = forecast
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| InsightError::Malformed(format!("missing {key} series")))?;

    if items.len() != horizon_days {
        return Err(InsightError::Malformed(format!(
            "{key} covers {} days, expected {horizon_days}",
            items.len()
        )));
    }

    items
        .iter()
        .map(|item| {
            count(item)
                .ok_or_else(|| InsightError::Malformed(format!("{key} entry {item} is not a count")))
        })
        .collect()
}

fn count(item: &Value) -> Option<u64> {
    match item {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(count_from_f64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(count_from_f64))
        }
        _ => None,
    }
}

/// One submission annotated with its hospital name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyRow {
    pub hospital_name: String,
    #[serde(flatten)]
    pub submission: ResourceSubmission,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyInput {
    pub city: String,
    pub rows: Vec<AnomalyRow>,
}

/// City-wide narrative plus one line per anomaly.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AnomalyReport {
    #[serde(default)]
    pub paragraph: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl AnomalyReport {
    pub fn from_response(value: &Value) -> Result<Self, InsightError> {
        if !value.is_object() {
            return Err(InsightError::Malformed(
                "anomaly response is not an object".to_string(),
            ));
        }
        serde_json::from_value(value.clone()).map_err(|err| InsightError::Malformed(err.to_string()))
    }

    /// Formats a rule-based flag the way detector lines read.
    pub fn line(hospital_name: &str, date: NaiveDate, flag: &DataQualityFlag) -> String {
        format!("{hospital_name} on {date}: {}", flag.describe())
    }
}

/// How soon a patient should be seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Moderate,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Moderate => "moderate",
            Urgency::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = InsightError;

    /// Case-insensitive: classifiers tend to answer `"High"`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "moderate" => Ok(Urgency::Moderate),
            "high" => Ok(Urgency::High),
            other => Err(InsightError::Malformed(format!("unknown urgency {other:?}"))),
        }
    }
}

/// Likely condition for a patient's described symptoms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnosis {
    pub condition: String,
    pub urgency: Urgency,
}

impl Diagnosis {
    /// Reads `{ "condition": "...", "urgency": "low" | "moderate" | "high" }`.
    pub fn from_response(value: &Value) -> Result<Self, InsightError> {
        let condition = value
            .get("condition")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|condition| !condition.is_empty())
            .ok_or_else(|| InsightError::Malformed("missing condition".to_string()))?;

        let urgency = value
            .get("urgency")
            .and_then(Value::as_str)
            .ok_or_else(|| InsightError::Malformed("missing urgency".to_string()))?
            .parse()?;

        Ok(Self {
            condition: condition.to_string(),
            urgency,
        })
    }
}

/// Demand forecasting capability.
pub trait Forecaster {
    fn forecast(&self, input: &ForecastInput) -> Result<Value, InsightError>;
}

/// Anomaly narrative capability.
pub trait AnomalyDetector {
    fn detect(&self, input: &AnomalyInput) -> Result<Value, InsightError>;
}

/// Symptom triage capability; receives the patient's free-text description.
pub trait SymptomClassifier {
    fn classify(&self, symptoms: &str) -> Result<Value, InsightError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forecast_accepts_string_counts() {
        let value = json!({
            "alerts": ["Low ICU capacity"],
            "forecast": {"icu_beds": ["12", 15, " 18 "], "oxygen_units": [85, 92, 100]}
        });
        let forecast = Forecast::from_response(&value, 3).unwrap();
        assert_eq!(forecast.icu_beds, vec![12, 15, 18]);
        assert_eq!(forecast.alerts, vec!["Low ICU capacity"]);
    }

    #[test]
    fn forecast_truncates_fractional_counts() {
        let value = json!({
            "forecast": {"icu_beds": [22.5, "23.9", 25], "oxygen_units": [40, 41.2, "42"]}
        });
        let forecast = Forecast::from_response(&value, 3).unwrap();
        assert_eq!(forecast.icu_beds, vec![22, 23, 25]);
        assert_eq!(forecast.oxygen_units, vec![40, 41, 42]);

        let negative = json!({"forecast": {"icu_beds": [-1, 2, 3], "oxygen_units": [1, 2, 3]}});
        assert!(matches!(
            Forecast::from_response(&negative, 3),
            Err(InsightError::Malformed(_))
        ));
    }

    #[test]
    fn diagnosis_reads_classifier_reply() {
        let value = json!({"condition": " Viral fever ", "urgency": "Moderate"});
        let diagnosis = Diagnosis::from_response(&value).unwrap();
        assert_eq!(diagnosis.condition, "Viral fever");
        assert_eq!(diagnosis.urgency, Urgency::Moderate);
        assert_eq!(
            serde_json::to_value(&diagnosis).unwrap(),
            json!({"condition": "Viral fever", "urgency": "moderate"})
        );
    }

    #[test]
    fn diagnosis_rejects_unknown_urgency() {
        let value = json!({"condition": "Migraine", "urgency": "Low | Moderate | High"});
        assert!(matches!(
            Diagnosis::from_response(&value),
            Err(InsightError::Malformed(_))
        ));
        assert!(Diagnosis::from_response(&json!({"urgency": "low"})).is_err());
    }

    #[test]
    fn forecast_rejects_wrong_horizon() {
        let value = json!({"forecast": {"icu_beds": [1, 2], "oxygen_units": [1, 2, 3]}});
        assert!(matches!(
            Forecast::from_response(&value, 3),
            Err(InsightError::Malformed(_))
        ));
        assert!(matches!(
            Forecast::from_response(&json!({"alerts": []}), 3),
            Err(InsightError::Malformed(_))
        ));
    }

    #[test]
    fn anomaly_report_defaults_missing_fields() {
        let report = AnomalyReport::from_response(&json!({"paragraph": "All normal"})).unwrap();
        assert_eq!(report.paragraph, "All normal");
        assert!(report.anomalies.is_empty());
        assert!(AnomalyReport::from_response(&json!("nope")).is_err());
    }
}
