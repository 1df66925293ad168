//! City-scoped queries over a hospital resource store.
//!
//! Every view resolves a city to its hospitals, takes their department ids
//! and reads the matching submissions through [`resources_for_city`].

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use setu_core::{
    aggregate_demographics, aggregate_resources, data_quality_flags, department_ids,
    filter_hospitals_by_city, missing_submissions, symptom_frequencies, symptom_reports,
    Availability, AvailabilityLevel, DateRange, DemographicDay, Hospital, OverviewStats,
    RangeOption, ResourceDay, ResourceKind, ResourceSubmission, SetuConfig, SetuError,
    SymptomCount,
};
use tracing::{info, warn};

mod insight;
mod store;

pub use insight::{
    AnomalyDetector, AnomalyInput, AnomalyReport, AnomalyRow, Diagnosis, Forecast, ForecastInput,
    Forecaster, InsightError, SymptomClassifier, Urgency,
};
pub use store::{Dataset, InMemoryStore, ResourceStore, StoreError, SubmissionFilter};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Core(#[from] SetuError),
    #[error("insight capability failed: {0}")]
    Insight(#[from] InsightError),
}

/// Location and calendar day a view is rendered for, passed explicitly to
/// every query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewContext {
    pub city: String,
    pub today: NaiveDate,
}

impl ViewContext {
    pub fn new(city: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            city: city.into(),
            today,
        }
    }
}

/// Submissions from hospitals located in `city` within `range`, ordered by
/// date. A city without hospitals yields an empty list.
pub fn resources_for_city<S>(
    store: &S,
    city: &str,
    range: DateRange,
) -> Result<Vec<ResourceSubmission>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let (_, submissions) = city_hospitals_and_resources(store, city, range)?;
    Ok(submissions)
}

fn city_hospitals_and_resources<S>(
    store: &S,
    city: &str,
    range: DateRange,
) -> Result<(Vec<Hospital>, Vec<ResourceSubmission>), QueryError>
where
    S: ResourceStore + ?Sized,
{
    let hospitals = store.hospitals()?;
    let in_city: Vec<Hospital> = filter_hospitals_by_city(&hospitals, city)
        .into_iter()
        .cloned()
        .collect();
    let ids = department_ids(&in_city);

    if ids.is_empty() {
        info!(city, "no hospitals registered for city");
        return Ok((in_city, Vec::new()));
    }

    let mut submissions = store.submissions(&SubmissionFilter::for_hospitals(ids).in_range(range))?;
    submissions.sort_by_key(|submission| submission.date);
    info!(
        city,
        hospitals = in_city.len(),
        submissions = submissions.len(),
        from = %range.from,
        to = %range.to,
        "loaded city submissions"
    );
    Ok((in_city, submissions))
}

/// Chronological city-wide availability series.
pub fn city_resource_trend<S>(
    store: &S,
    ctx: &ViewContext,
    range: RangeOption,
) -> Result<Vec<ResourceDay>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let submissions = resources_for_city(store, &ctx.city, range.ending(ctx.today))?;
    Ok(aggregate_resources(&submissions))
}

/// Chronological city-wide patient mix.
pub fn city_demographics<S>(
    store: &S,
    ctx: &ViewContext,
    range: RangeOption,
) -> Result<Vec<DemographicDay>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let submissions = resources_for_city(store, &ctx.city, range.ending(ctx.today))?;
    Ok(aggregate_demographics(&submissions))
}

/// One resource tile on a hospital card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceCard {
    pub availability: Availability,
    pub level: AvailabilityLevel,
}

/// Today's availability at one hospital, as shown to patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HospitalAvailability {
    pub hospital: Hospital,
    pub submitted: bool,
    pub resources: BTreeMap<ResourceKind, ResourceCard>,
}

/// Cards for every hospital in the city; hospitals that have not submitted
/// today show zero capacity.
pub fn hospital_availability<S>(
    store: &S,
    ctx: &ViewContext,
    config: &SetuConfig,
) -> Result<Vec<HospitalAvailability>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let (hospitals, submissions) =
        city_hospitals_and_resources(store, &ctx.city, DateRange::single(ctx.today))?;

    let by_department: HashMap<&str, &ResourceSubmission> = submissions
        .iter()
        .map(|submission| (submission.hospital_id.as_str(), submission))
        .collect();

    Ok(hospitals
        .iter()
        .map(|hospital| {
            let submission = hospital
                .department_id
                .as_deref()
                .and_then(|id| by_department.get(id).copied());

            let resources = ResourceKind::ALL
                .into_iter()
                .map(|kind| {
                    let (used, total) = submission
                        .map(|s| (s.used(kind), s.total(kind)))
                        .unwrap_or((0, 0));
                    let card = ResourceCard {
                        availability: Availability::of(used, total),
                        level: AvailabilityLevel::classify(used, total, config),
                    };
                    (kind, card)
                })
                .collect();

            HospitalAvailability {
                hospital: hospital.clone(),
                submitted: submission.is_some(),
                resources,
            }
        })
        .collect())
}

/// Hospitals in the city with no submission on `ctx.today`.
pub fn city_missing_submissions<S>(
    store: &S,
    ctx: &ViewContext,
) -> Result<Vec<Hospital>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let (hospitals, submissions) =
        city_hospitals_and_resources(store, &ctx.city, DateRange::single(ctx.today))?;
    Ok(missing_submissions(&hospitals, &submissions, ctx.today)
        .into_iter()
        .cloned()
        .collect())
}

/// Registry-wide submission counts.
pub fn overview<S>(store: &S, today: NaiveDate) -> Result<OverviewStats, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let hospitals = store.hospitals()?;
    let recent = store
        .submissions(&SubmissionFilter::all().in_range(RangeOption::Month.ending(today)))?;
    Ok(OverviewStats::compute(hospitals.len(), &recent, today))
}

/// Symptom frequencies reported in the city over the past week.
pub fn city_symptoms<S>(store: &S, ctx: &ViewContext) -> Result<Vec<SymptomCount>, QueryError>
where
    S: ResourceStore + ?Sized,
{
    let submissions = resources_for_city(store, &ctx.city, RangeOption::Week.ending(ctx.today))?;
    let reports: Vec<ResourceSubmission> =
        symptom_reports(&submissions).into_iter().cloned().collect();
    Ok(symptom_frequencies(&reports))
}

/// Asks the forecaster for the next days of demand using the fortnight
/// series. Returns `None` when the city has no data to forecast from.
pub fn city_forecast<S, F>(
    store: &S,
    forecaster: &F,
    ctx: &ViewContext,
    config: &SetuConfig,
) -> Result<Option<Forecast>, QueryError>
where
    S: ResourceStore + ?Sized,
    F: Forecaster + ?Sized,
{
    let range = RangeOption::Fortnight.ending(ctx.today);
    let submissions = resources_for_city(store, &ctx.city, range)?;
    if submissions.is_empty() {
        return Ok(None);
    }

    let input = ForecastInput {
        city: ctx.city.clone(),
        from: range.from,
        to: range.to,
        horizon_days: config.forecast_horizon_days,
        days: aggregate_resources(&submissions),
    };

    let response = forecaster.forecast(&input)?;
    let forecast = Forecast::from_response(&response, config.forecast_horizon_days)?;
    Ok(Some(forecast))
}

/// Rule-based data quality lines followed by the detector's findings.
pub fn city_anomalies<S, D>(
    store: &S,
    detector: &D,
    ctx: &ViewContext,
) -> Result<AnomalyReport, QueryError>
where
    S: ResourceStore + ?Sized,
    D: AnomalyDetector + ?Sized,
{
    let (hospitals, submissions) = city_hospitals_and_resources(
        store,
        &ctx.city,
        RangeOption::Fortnight.ending(ctx.today),
    )?;
    if submissions.is_empty() {
        return Ok(AnomalyReport::default());
    }

    let names: HashMap<&str, &str> = hospitals
        .iter()
        .filter_map(|hospital| {
            hospital
                .department_id
                .as_deref()
                .map(|id| (id, hospital.name.as_str()))
        })
        .collect();
    let name_of = |id: &str| names.get(id).copied().unwrap_or(id).to_string();

    let mut anomalies: Vec<String> = data_quality_flags(&submissions)
        .iter()
        .flat_map(|report| {
            let name = name_of(&report.hospital_id);
            report
                .flags
                .iter()
                .map(move |flag| AnomalyReport::line(&name, report.date, flag))
                .collect::<Vec<_>>()
        })
        .collect();

    let input = AnomalyInput {
        city: ctx.city.clone(),
        rows: submissions
            .iter()
            .map(|submission| AnomalyRow {
                hospital_name: name_of(&submission.hospital_id),
                submission: submission.clone(),
            })
            .collect(),
    };

    let report = match detector
        .detect(&input)
        .and_then(|response| AnomalyReport::from_response(&response))
    {
        Ok(report) => report,
        Err(err) => {
            warn!(city = %ctx.city, error = %err, "anomaly detector failed, using rule-based flags only");
            AnomalyReport::default()
        }
    };

    for line in report.anomalies {
        if !anomalies.contains(&line) {
            anomalies.push(line);
        }
    }

    Ok(AnomalyReport {
        paragraph: report.paragraph,
        anomalies,
    })
}

/// Classifies a patient's described symptoms. Blank input never reaches the
/// classifier.
pub fn triage<C>(classifier: &C, symptoms: &str) -> Result<Diagnosis, QueryError>
where
    C: SymptomClassifier + ?Sized,
{
    let symptoms = symptoms.trim();
    if symptoms.is_empty() {
        return Err(SetuError::MissingData.into());
    }

    let response = classifier.classify(symptoms)?;
    let diagnosis = Diagnosis::from_response(&response)?;
    info!(urgency = %diagnosis.urgency, "symptoms triaged");
    Ok(diagnosis)
}
