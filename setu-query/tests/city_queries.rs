use std::cell::{Cell, RefCell};

use chrono::NaiveDate;
use serde_json::{json, Value};
use setu_core::{AvailabilityLevel, DateRange, RangeOption, ResourceKind, SetuConfig, SetuError};
use setu_query::{
    city_anomalies, city_demographics, city_forecast, city_missing_submissions,
    city_resource_trend, city_symptoms, hospital_availability, overview, resources_for_city,
    triage, AnomalyDetector, AnomalyInput, ForecastInput, Forecaster, InMemoryStore,
    InsightError, QueryError, SymptomClassifier, Urgency, ViewContext,
};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn store() -> InMemoryStore {
    InMemoryStore::from_path(fixture_path("pune_dataset.json")).expect("dataset fixture")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 19).unwrap()
}

fn pune() -> ViewContext {
    ViewContext::new("Pune", today())
}

struct StubForecaster {
    response: Value,
    seen: RefCell<Option<ForecastInput>>,
}

impl Forecaster for StubForecaster {
    fn forecast(&self, input: &ForecastInput) -> Result<Value, InsightError> {
        self.seen.replace(Some(input.clone()));
        Ok(self.response.clone())
    }
}

struct StubDetector {
    response: Result<Value, String>,
    calls: Cell<usize>,
}

impl AnomalyDetector for StubDetector {
    fn detect(&self, input: &AnomalyInput) -> Result<Value, InsightError> {
        self.calls.set(self.calls.get() + 1);
        assert!(input.rows.iter().all(|row| !row.hospital_name.is_empty()));
        self.response
            .clone()
            .map_err(InsightError::Unavailable)
    }
}

struct StubClassifier {
    response: Value,
    seen: RefCell<Vec<String>>,
}

impl StubClassifier {
    fn replying(response: Value) -> Self {
        Self {
            response,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl SymptomClassifier for StubClassifier {
    fn classify(&self, symptoms: &str) -> Result<Value, InsightError> {
        self.seen.borrow_mut().push(symptoms.to_string());
        Ok(self.response.clone())
    }
}

#[test]
fn city_join_uses_exact_location_and_range() {
    let store = store();
    let rows = resources_for_city(&store, "Pune", RangeOption::Week.ending(today())).unwrap();
    let keys: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.hospital_id.clone(), row.date.to_string()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("dept-sassoon".to_string(), "2025-09-18".to_string()),
            ("dept-sassoon".to_string(), "2025-09-19".to_string()),
            ("dept-ruby".to_string(), "2025-09-19".to_string()),
        ]
    );

    let lowercase = resources_for_city(&store, "pune", DateRange::single(today())).unwrap();
    assert_eq!(lowercase.len(), 1);
    assert_eq!(lowercase[0].hospital_id, "dept-deenanath");

    let nowhere = resources_for_city(&store, "Nagpur", RangeOption::Month.ending(today())).unwrap();
    assert!(nowhere.is_empty());
}

#[test]
fn resource_trend_sums_city_hospitals() {
    let trend = city_resource_trend(&store(), &pune(), RangeOption::Week).unwrap();
    assert_eq!(trend.len(), 2);

    let first = &trend[0];
    assert_eq!(first.date.to_string(), "2025-09-18");
    assert_eq!(first.get(ResourceKind::Icu).available, 4);

    let latest = &trend[1];
    let icu = latest.get(ResourceKind::Icu);
    assert_eq!((icu.used, icu.total, icu.available), (21, 20, 0));
    assert!(icu.flagged);
    assert_eq!(latest.get(ResourceKind::Beds).available, 30);
    assert_eq!(latest.get(ResourceKind::Oxygen).available, 100);
    assert_eq!(latest.get(ResourceKind::Doctors).available, 7);
}

#[test]
fn demographics_follow_the_same_join() {
    let days = city_demographics(&store(), &pune(), RangeOption::Week).unwrap();
    let latest = days.last().unwrap();
    assert_eq!(latest.total, 60);
    assert_eq!(latest.age_16_to_30, 40);
    assert_eq!((latest.male, latest.female), (38, 26));
    assert_eq!(days[0].total, 0);
}

#[test]
fn availability_cards_cover_every_city_hospital() {
    let cards = hospital_availability(&store(), &pune(), &SetuConfig::default()).unwrap();
    let ids: Vec<&str> = cards.iter().map(|card| card.hospital.id.as_str()).collect();
    assert_eq!(ids, vec!["h-1", "h-2", "h-3", "h-6"]);

    let sassoon = &cards[0];
    assert!(sassoon.submitted);
    assert_eq!(sassoon.resources[&ResourceKind::Icu].level, AvailabilityLevel::Critical);
    assert_eq!(sassoon.resources[&ResourceKind::Icu].availability.available, 1);
    assert_eq!(sassoon.resources[&ResourceKind::Beds].level, AvailabilityLevel::Limited);
    assert_eq!(sassoon.resources[&ResourceKind::Oxygen].level, AvailabilityLevel::Good);

    let ruby = &cards[1];
    assert!(ruby.resources[&ResourceKind::Icu].availability.flagged);

    let jehangir = &cards[2];
    assert!(!jehangir.submitted);
    assert_eq!(jehangir.resources[&ResourceKind::Beds].level, AvailabilityLevel::Unknown);
}

#[test]
fn missing_and_overview_counts() {
    let store = store();
    let missing = city_missing_submissions(&store, &pune()).unwrap();
    let names: Vec<&str> = missing.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["Jehangir Hospital", "Unlinked Nursing Home"]);

    let stats = overview(&store, today()).unwrap();
    assert_eq!(stats.hospitals, 7);
    assert_eq!(stats.submitted_today, 4);
    assert_eq!(stats.last_7_days, 5);
    assert_eq!(stats.last_30_days, 5);
    assert_eq!(stats.missing_today, 3);
}

#[test]
fn weekly_symptoms_are_ranked() {
    let symptoms = city_symptoms(&store(), &pune()).unwrap();
    let ranked: Vec<(&str, usize)> = symptoms
        .iter()
        .map(|entry| (entry.symptom.as_str(), entry.reports))
        .collect();
    assert_eq!(ranked, vec![("fever", 2), ("cough", 1)]);
}

#[test]
fn forecast_receives_fortnight_series() {
    let forecaster = StubForecaster {
        response: json!({
            "alerts": ["ICU capacity exceeded at Ruby Hall Clinic"],
            "forecast": {"icu_beds": ["22", "23", "25"], "oxygen_units": [45, 50, 52]}
        }),
        seen: RefCell::new(None),
    };

    let forecast = city_forecast(&store(), &forecaster, &pune(), &SetuConfig::default())
        .unwrap()
        .expect("city has data");
    assert_eq!(forecast.icu_beds, vec![22, 23, 25]);
    assert_eq!(forecast.alerts.len(), 1);

    let input = forecaster.seen.borrow().clone().unwrap();
    assert_eq!(input.city, "Pune");
    assert_eq!(input.from.to_string(), "2025-09-05");
    assert_eq!(input.horizon_days, 3);
    assert_eq!(input.days.len(), 2);
}

#[test]
fn forecast_with_wrong_horizon_is_an_error() {
    let forecaster = StubForecaster {
        response: json!({"forecast": {"icu_beds": [1], "oxygen_units": [1]}}),
        seen: RefCell::new(None),
    };
    let result = city_forecast(&store(), &forecaster, &pune(), &SetuConfig::default());
    assert!(matches!(result, Err(QueryError::Insight(InsightError::Malformed(_)))));
}

#[test]
fn forecast_skips_cities_without_data() {
    let forecaster = StubForecaster {
        response: json!({}),
        seen: RefCell::new(None),
    };
    let ctx = ViewContext::new("Nagpur", today());
    let forecast = city_forecast(&store(), &forecaster, &ctx, &SetuConfig::default()).unwrap();
    assert!(forecast.is_none());
    assert!(forecaster.seen.borrow().is_none());
}

#[test]
fn anomalies_merge_rules_with_detector() {
    let duplicate = "Ruby Hall Clinic on 2025-09-19: Gender total mismatch (22M + 12F != 30 total)";
    let detector = StubDetector {
        response: Ok(json!({
            "paragraph": "ICU pressure concentrated at one hospital.",
            "anomalies": [duplicate, "Sassoon General on 2025-09-19: ICU occupancy spike"]
        })),
        calls: Cell::new(0),
    };

    let report = city_anomalies(&store(), &detector, &pune()).unwrap();
    assert_eq!(detector.calls.get(), 1);
    assert_eq!(report.paragraph, "ICU pressure concentrated at one hospital.");
    assert_eq!(
        report.anomalies,
        vec![
            "Ruby Hall Clinic on 2025-09-19: ICU beds usage 12 exceeds reported capacity 10",
            duplicate,
            "Sassoon General on 2025-09-19: ICU occupancy spike",
        ]
    );
}

#[test]
fn detector_failure_keeps_rule_based_lines() {
    let detector = StubDetector {
        response: Err("rate limited".to_string()),
        calls: Cell::new(0),
    };
    let report = city_anomalies(&store(), &detector, &pune()).unwrap();
    assert!(report.paragraph.is_empty());
    assert_eq!(report.anomalies.len(), 2);
}

#[test]
fn unreadable_detector_reply_keeps_rule_based_lines() {
    let detector = StubDetector {
        response: Ok(json!("Sorry, I cannot help with that.")),
        calls: Cell::new(0),
    };
    let report = city_anomalies(&store(), &detector, &pune()).unwrap();
    assert_eq!(detector.calls.get(), 1);
    assert!(report.paragraph.is_empty());
    assert_eq!(
        report.anomalies,
        vec![
            "Ruby Hall Clinic on 2025-09-19: ICU beds usage 12 exceeds reported capacity 10",
            "Ruby Hall Clinic on 2025-09-19: Gender total mismatch (22M + 12F != 30 total)",
        ]
    );
}

#[test]
fn forecast_counts_with_fractions_are_truncated() {
    let forecaster = StubForecaster {
        response: json!({"forecast": {"icu_beds": [22.5, 23, 24.9], "oxygen_units": [45, 50.1, 52]}}),
        seen: RefCell::new(None),
    };
    let forecast = city_forecast(&store(), &forecaster, &pune(), &SetuConfig::default())
        .unwrap()
        .expect("city has data");
    assert_eq!(forecast.icu_beds, vec![22, 23, 24]);
    assert_eq!(forecast.oxygen_units, vec![45, 50, 52]);
}

#[test]
fn triage_reads_condition_and_urgency() {
    let classifier =
        StubClassifier::replying(json!({"condition": "Dengue fever", "urgency": "High"}));
    let diagnosis = triage(&classifier, "  high fever, joint pain, rash ").unwrap();
    assert_eq!(diagnosis.condition, "Dengue fever");
    assert_eq!(diagnosis.urgency, Urgency::High);
    assert_eq!(*classifier.seen.borrow(), vec!["high fever, joint pain, rash"]);
}

#[test]
fn triage_rejects_unknown_urgency() {
    let classifier =
        StubClassifier::replying(json!({"condition": "Common cold", "urgency": "Whenever"}));
    let result = triage(&classifier, "runny nose");
    assert!(matches!(result, Err(QueryError::Insight(InsightError::Malformed(_)))));
}

#[test]
fn triage_skips_classifier_for_blank_symptoms() {
    let classifier = StubClassifier::replying(json!({"condition": "n/a", "urgency": "low"}));
    let result = triage(&classifier, "   ");
    assert!(matches!(result, Err(QueryError::Core(SetuError::MissingData))));
    assert!(classifier.seen.borrow().is_empty());
}
