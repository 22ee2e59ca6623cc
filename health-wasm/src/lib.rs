//! WASM <-> JavaScript bridge for the mobile dashboard.

use health_core::{GroupingConfig, MetricCatalog, StatusScores};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsStatusScores {
    #[serde(default)]
    normal: Option<u8>,
    #[serde(default)]
    borderline: Option<u8>,
    #[serde(default)]
    high: Option<u8>,
    #[serde(default)]
    low: Option<u8>,
}

#[derive(Deserialize, Default)]
struct JsGroupingConfig {
    #[serde(default)]
    status_scores: Option<JsStatusScores>,
    #[serde(default)]
    unranked_weight: Option<u32>,
    #[serde(default)]
    fallback_score: Option<u8>,
    #[serde(default)]
    derive_missing_status: Option<bool>,
}

impl From<JsGroupingConfig> for GroupingConfig {
    fn from(cfg: JsGroupingConfig) -> Self {
        let mut base = GroupingConfig::default();
        if let Some(scores) = cfg.status_scores {
            base.status_scores = merge_scores(base.status_scores, scores);
        }
        if let Some(weight) = cfg.unranked_weight {
            base.unranked_weight = weight;
        }
        if let Some(score) = cfg.fallback_score {
            base.fallback_score = score;
        }
        if let Some(derive) = cfg.derive_missing_status {
            base.derive_missing_status = derive;
        }
        base
    }
}

fn merge_scores(mut base: StatusScores, js: JsStatusScores) -> StatusScores {
    if let Some(value) = js.normal {
        base.normal = value;
    }
    if let Some(value) = js.borderline {
        base.borderline = value;
    }
    if let Some(value) = js.high {
        base.high = value;
    }
    if let Some(value) = js.low {
        base.low = value;
    }
    base
}

/// Group a backend snapshot into organ systems using the built-in catalog.
#[wasm_bindgen(js_name = groupMetrics)]
pub fn group_metrics(snapshot: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let snapshot_value = from_value::<serde_json::Value>(snapshot)
        .map_err(|err| JsValue::from_str(&format!("could not read snapshot: {err}")))?;

    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsGroupingConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            GroupingConfig::from(cfg)
        }
        _ => GroupingConfig::default(),
    };
    cfg.validate()
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let report =
        health_grouping::summarize_snapshot_value(&snapshot_value, &MetricCatalog::standard(), &cfg);

    to_value(&report).map_err(|err| JsValue::from_str(&format!("could not serialize report: {err}")))
}

#[wasm_bindgen(js_name = formatHealthScore)]
pub fn format_health_score(score: Option<u8>) -> Result<JsValue, JsValue> {
    to_value(&health_core::format_health_score(score))
        .map_err(|err| JsValue::from_str(&format!("could not serialize score: {err}")))
}

#[wasm_bindgen(js_name = metricDisplayName)]
pub fn metric_display_name(metric_type: &str) -> String {
    health_core::metric_display_name(metric_type)
}

#[wasm_bindgen(js_name = statusColor)]
pub fn status_color(status: &str) -> String {
    health_core::status_color(status).to_string()
}
