//! Framework-neutral WASM <-> JavaScript bridge for the aggregator.

use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use setu_core::{count_from_f64, AvailabilityLevel, SetuConfig, SetuError};
use setu_rows::AggregateRequest;
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsSetuConfig {
    #[serde(default)]
    critical_utilization_pct: Option<f64>,
    #[serde(default)]
    limited_utilization_pct: Option<f64>,
}

impl From<JsSetuConfig> for SetuConfig {
    fn from(cfg: JsSetuConfig) -> Self {
        let mut base = SetuConfig::default();
        if let Some(pct) = cfg.critical_utilization_pct {
            base.critical_utilization_pct = pct;
        }
        if let Some(pct) = cfg.limited_utilization_pct {
            base.limited_utilization_pct = pct;
        }
        base
    }
}

/// `aggregateRows({ rows, spec, chronological })` -> array of day records.
#[wasm_bindgen(js_name = aggregateRows)]
pub fn aggregate_rows(request: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let request: AggregateRequest = from_value(request)
        .map_err(|err| JsValue::from_str(&format!("could not read aggregate request: {err}")))?;

    let days = request
        .run()
        .map_err(|err| JsValue::from_str(&format_setu_error(err)))?;

    // Day records must arrive as plain objects, not JS Maps.
    days.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("could not serialize series: {err}")))
}

/// `max(total - used, 0)`.
#[wasm_bindgen]
pub fn availability(used: f64, total: f64) -> f64 {
    setu_core::availability(to_count(used), to_count(total)) as f64
}

/// Availability level name for a card: `good`, `limited`, `critical` or `unknown`.
#[wasm_bindgen(js_name = availabilityLevel)]
pub fn availability_level(used: f64, total: f64, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsSetuConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            SetuConfig::from(cfg)
        }
        None => SetuConfig::default(),
    };

    let level = AvailabilityLevel::classify(to_count(used), to_count(total), &cfg);
    to_value(&level).map_err(|err| JsValue::from_str(&format!("could not serialize level: {err}")))
}

fn to_count(value: f64) -> u64 {
    count_from_f64(value).unwrap_or(0)
}

fn format_setu_error(err: SetuError) -> String {
    format!("Aggregation error: {err}")
}
