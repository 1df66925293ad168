//! JSON rows from the hosted store to aggregated day series.

use serde::Deserialize;
use serde_json::{Map, Value};
use setu_core::{
    aggregate_by_date, count_from_f64, parse_date, sort_chronologically, AggregateSpec,
    AggregatedDay, ResourceSubmission, Row, SetuError,
};
use tracing::debug;

/// Aggregation call as sent by a browser or CLI caller.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateRequest {
    pub rows: Value,
    #[serde(default)]
    pub spec: AggregateSpec,
    /// Sort the output by date instead of first-occurrence order.
    #[serde(default)]
    pub chronological: bool,
}

impl AggregateRequest {
    pub fn run(&self) -> Result<Vec<AggregatedDay>, SetuError> {
        let mut days = aggregate_rows_value(&self.rows, &self.spec)?;
        if self.chronological {
            sort_chronologically(&mut days);
        }
        Ok(days)
    }
}

/// Aggregate rows from a JSON string.
pub fn aggregate_rows_str(
    rows_json: &str,
    spec: &AggregateSpec,
) -> Result<Vec<AggregatedDay>, SetuError> {
    let value: Value =
        serde_json::from_str(rows_json).map_err(|err| SetuError::Parse(err.to_string()))?;
    aggregate_rows_value(&value, spec)
}

/// Aggregate rows from a `serde_json::Value`.
pub fn aggregate_rows_value(
    rows: &Value,
    spec: &AggregateSpec,
) -> Result<Vec<AggregatedDay>, SetuError> {
    let rows = rows_from_value(rows)?;
    Ok(aggregate_by_date(&rows, spec))
}

/// Read a row array, or a `{ "data": [...], "error": ... }` query result.
///
/// Records without a usable `date` cannot be grouped and are skipped. Numeric
/// fields become values, `null` stays an explicit null, and anything else
/// (strings, arrays, negative numbers) is left out of the row.
pub fn rows_from_value(value: &Value) -> Result<Vec<Row>, SetuError> {
    let records = records(value)?;
    let mut rows = Vec::with_capacity(records.len());

    for (position, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            debug!(position, "skipping non-object row");
            continue;
        };
        match row_from_object(object) {
            Some(row) => rows.push(row),
            None => debug!(position, "skipping row without a valid date"),
        }
    }

    Ok(rows)
}

/// Typed submissions from the same shapes [`rows_from_value`] accepts.
pub fn submissions_from_value(value: &Value) -> Result<Vec<ResourceSubmission>, SetuError> {
    records(value)?
        .iter()
        .map(|record| {
            serde_json::from_value(record.clone()).map_err(|err| SetuError::Parse(err.to_string()))
        })
        .collect()
}

pub fn submissions_from_str(json: &str) -> Result<Vec<ResourceSubmission>, SetuError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| SetuError::Parse(err.to_string()))?;
    submissions_from_value(&value)
}

fn records(value: &Value) -> Result<&[Value], SetuError> {
    if let Some(array) = value.as_array() {
        return Ok(array.as_slice());
    }

    let object = value
        .as_object()
        .ok_or_else(|| SetuError::Parse("expected an array of rows".to_string()))?;

    if let Some(error) = object.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(SetuError::Parse(format!("query failed: {message}")));
    }

    match object.get("data") {
        Some(Value::Array(array)) => Ok(array.as_slice()),
        // A fetch with no payload reads as an empty result.
        Some(Value::Null) | None => Ok(&[]),
        Some(_) => Err(SetuError::MissingData),
    }
}

fn row_from_object(object: &Map<String, Value>) -> Option<Row> {
    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(|raw| parse_date(date_part(raw)).ok())?;

    let hospital_id = object
        .get("hospital_id")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut row = Row::new(hospital_id, date);
    for (field, value) in object {
        if field == "date" || field == "hospital_id" {
            continue;
        }
        match value {
            Value::Null => row.set(field.clone(), None),
            Value::Number(number) => {
                if let Some(count) = number_as_count(number) {
                    row.set(field.clone(), Some(count));
                }
            }
            _ => {}
        }
    }
    Some(row)
}

/// Store timestamps may carry a time part; only the calendar day matters.
fn date_part(raw: &str) -> &str {
    raw.split_once('T').map(|(day, _)| day).unwrap_or(raw)
}

fn number_as_count(number: &serde_json::Number) -> Option<u64> {
    if let Some(count) = number.as_u64() {
        return Some(count);
    }
    number.as_f64().and_then(count_from_f64)
}
