//! Backend metrics snapshot to per-organ health scores.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use health_core::{
    Diagnostic, GroupingConfig, HealthError, HealthReport, MetricCatalog, MetricEntry,
    MetricSource, MetricStatus, MetricValue, OrganGrouping, OrganHealth,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Typed view of a backend snapshot after boundary checks.
///
/// Serializes to the flat per-type shape used by unfiltered metric lists,
/// including metric types no organ system claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Accepted entries per metric type, most recent first.
    pub metrics: BTreeMap<String, Vec<MetricEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_hints: Option<Value>,
    /// Problems found while reading the snapshot.
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a report from a snapshot JSON string.
pub fn summarize_snapshot_str(
    snapshot_json: &str,
    catalog: &MetricCatalog,
    config: &GroupingConfig,
) -> Result<HealthReport, HealthError> {
    let value: Value =
        serde_json::from_str(snapshot_json).map_err(|err| HealthError::Parse(err.to_string()))?;
    Ok(summarize_snapshot_value(&value, catalog, config))
}

/// Build a report from a `serde_json::Value` snapshot.
///
/// Never fails: shape problems end up in `grouping.diagnostics`.
pub fn summarize_snapshot_value(
    snapshot: &Value,
    catalog: &MetricCatalog,
    config: &GroupingConfig,
) -> HealthReport {
    let parsed = parse_snapshot(snapshot, catalog, config);
    let grouping = group_metrics_by_organ_system(&parsed, catalog, config);
    HealthReport::new(grouping, parsed.summary, parsed.ui_hints)
}

/// Read the `metrics` object into typed entries.
///
/// Entries are rejected when they are not objects, have no usable value, or
/// have no usable status that can be derived from the reference range.
/// Undated entries are kept.
pub fn parse_snapshot(
    snapshot: &Value,
    catalog: &MetricCatalog,
    config: &GroupingConfig,
) -> HealthSnapshot {
    let mut parsed = HealthSnapshot {
        summary: passthrough(snapshot, "summary"),
        ui_hints: passthrough(snapshot, "ui_hints"),
        ..HealthSnapshot::default()
    };

    let Some(metrics) = snapshot.get("metrics").and_then(Value::as_object) else {
        tracing::warn!("snapshot has no metrics object, nothing to group");
        parsed.diagnostics.push(Diagnostic::MissingMetrics);
        return parsed;
    };

    for (metric_type, series) in metrics {
        let Some(raw_entries) = series.as_array() else {
            tracing::warn!("metric series for {} is not an array", metric_type);
            parsed.diagnostics.push(Diagnostic::MalformedSeries {
                metric_type: metric_type.clone(),
            });
            continue;
        };

        let entries: Vec<MetricEntry> = raw_entries
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                parse_entry(
                    metric_type,
                    index,
                    raw,
                    catalog,
                    config,
                    &mut parsed.diagnostics,
                )
            })
            .collect();

        parsed.metrics.insert(metric_type.clone(), entries);
    }

    parsed
}

/// Bucket a snapshot into organ systems and score each system with data.
///
/// The latest reading of a type is the first *accepted* entry of its series.
/// When the backend's index-0 entry was rejected by [`parse_snapshot`], the
/// next accepted (older) entry takes its place and the rejection is listed in
/// the diagnostics as `MalformedEntry { index: 0, .. }`.
///
/// Systems without contributing metrics are absent from the result.
pub fn group_metrics_by_organ_system(
    snapshot: &HealthSnapshot,
    catalog: &MetricCatalog,
    config: &GroupingConfig,
) -> OrganGrouping {
    let mut aggregate = GroupingAggregate::new(catalog, snapshot.diagnostics.clone());

    for (metric_type, entries) in &snapshot.metrics {
        aggregate.handle_series(metric_type, entries);
    }

    aggregate.finalize(config)
}

struct GroupingAggregate<'a> {
    catalog: &'a MetricCatalog,
    systems: BTreeMap<String, OrganHealth>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> GroupingAggregate<'a> {
    fn new(catalog: &'a MetricCatalog, diagnostics: Vec<Diagnostic>) -> Self {
        let systems = catalog
            .systems()
            .iter()
            .map(|system| (system.key.clone(), OrganHealth::empty(system.clone())))
            .collect();
        Self {
            catalog,
            systems,
            diagnostics,
        }
    }

    fn handle_series(&mut self, metric_type: &str, entries: &[MetricEntry]) {
        let Some(latest) = entries.first() else {
            return;
        };

        let catalog = self.catalog;
        let Some(system_key) = catalog.find_organ_system_for_metric(metric_type) else {
            tracing::debug!("metric {} is not mapped to an organ system", metric_type);
            self.diagnostics.push(Diagnostic::UnmappedMetric {
                metric_type: metric_type.to_string(),
            });
            return;
        };

        let Some(health) = self.systems.get_mut(system_key) else {
            return;
        };

        health.metrics.extend(entries.iter().cloned());
        health
            .latest_metrics
            .insert(metric_type.to_string(), latest.clone());
        if is_more_recent(latest.date, health.last_updated) {
            health.last_updated = latest.date;
        }
        health.has_data = true;
    }

    fn finalize(mut self, config: &GroupingConfig) -> OrganGrouping {
        let mut systems = BTreeMap::new();

        for (key, mut health) in self.systems {
            if !health.has_data {
                continue;
            }
            if let Some(diagnostic) = score_system(&mut health, config) {
                self.diagnostics.push(diagnostic);
            }
            tracing::debug!(
                "system {} scored {:?} with status {}",
                key,
                health.score,
                health.status
            );
            systems.insert(key, health);
        }

        OrganGrouping {
            systems,
            diagnostics: self.diagnostics,
        }
    }
}

/// Weighted status score, worst status and primary metric for one system.
fn score_system(health: &mut OrganHealth, config: &GroupingConfig) -> Option<Diagnostic> {
    let system = &health.system;
    let mut weighted_score: u64 = 0;
    let mut total_weight: u64 = 0;
    let mut worst: Option<MetricStatus> = None;
    let mut primary: Option<(usize, &MetricEntry)> = None;

    for (metric_type, entry) in &health.latest_metrics {
        let weight = u64::from(system.weight_for(metric_type, config.unranked_weight));
        weighted_score += u64::from(config.status_scores.for_status(entry.status)) * weight;
        total_weight += weight;

        if worst.map_or(true, |current| entry.status.severity() > current.severity()) {
            worst = Some(entry.status);
        }

        if let Some(rank) = system.priority_index(metric_type) {
            if primary.map_or(true, |(best, _)| rank < best) {
                primary = Some((rank, entry));
            }
        }
    }

    let primary_metric = primary
        .map(|(_, entry)| entry.clone())
        .or_else(|| health.latest_metrics.values().next().cloned());
    let status = worst.unwrap_or_default();

    let (score, diagnostic) = if total_weight == 0 {
        tracing::warn!(
            "system {} has data but zero total weight, using fallback score",
            system.key
        );
        (
            config.fallback_score,
            Some(Diagnostic::DegenerateWeight {
                system: system.key.clone(),
            }),
        )
    } else {
        let mean = weighted_score as f64 / total_weight as f64;
        (mean.round().min(100.0) as u8, None)
    };

    health.score = Some(score);
    health.status = status;
    health.primary_metric = primary_metric;
    diagnostic
}

fn parse_entry(
    metric_type: &str,
    index: usize,
    raw: &Value,
    catalog: &MetricCatalog,
    config: &GroupingConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<MetricEntry> {
    let mut reject = |reason: &str| {
        tracing::warn!("dropping {} entry #{}: {}", metric_type, index, reason);
        diagnostics.push(Diagnostic::MalformedEntry {
            metric_type: metric_type.to_string(),
            index,
            reason: reason.to_string(),
        });
        None
    };

    let Some(object) = raw.as_object() else {
        return reject("entry is not an object");
    };

    let Some(value) = extract_value(object) else {
        return reject("missing or non-scalar value");
    };

    let range = catalog.reference_range(metric_type);
    let status = match object
        .get("status")
        .and_then(Value::as_str)
        .and_then(MetricStatus::parse)
    {
        Some(status) => status,
        None => {
            let derived = if config.derive_missing_status {
                range.zip(value.as_f64()).map(|(range, v)| range.classify(v))
            } else {
                None
            };
            let Some(status) = derived else {
                return reject("missing or unknown status");
            };
            tracing::debug!(
                "derived status {} for {} entry #{} from reference range",
                status,
                metric_type,
                index
            );
            diagnostics.push(Diagnostic::DerivedStatus {
                metric_type: metric_type.to_string(),
                index,
                status,
            });
            status
        }
    };

    let date = match object.get("date") {
        None | Some(Value::Null) => None,
        Some(raw_date) => {
            let parsed = raw_date.as_str().and_then(parse_datetime);
            if parsed.is_none() {
                let raw = raw_date
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| raw_date.to_string());
                tracing::warn!("unreadable date {:?} on {} entry #{}", raw, metric_type, index);
                diagnostics.push(Diagnostic::UnparseableDate {
                    metric_type: metric_type.to_string(),
                    index,
                    raw,
                });
            }
            parsed
        }
    };

    let unit = object
        .get("unit")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| range.map(|range| range.unit.clone()))
        .unwrap_or_default();

    Some(MetricEntry {
        id: object.get("id").and_then(Value::as_str).map(str::to_string),
        metric_type: metric_type.to_string(),
        value,
        unit,
        date,
        status,
        source: object
            .get("source")
            .and_then(Value::as_str)
            .map(MetricSource::parse)
            .unwrap_or_default(),
        needs_review: object
            .get("needs_review")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn extract_value(object: &Map<String, Value>) -> Option<MetricValue> {
    match object.get("value")? {
        Value::Number(number) => Some(MetricValue::Number(number.clone())),
        Value::String(text) if !text.trim().is_empty() => {
            Some(MetricValue::Text(text.trim().to_string()))
        }
        _ => None,
    }
}

fn passthrough(snapshot: &Value, field: &str) -> Option<Value> {
    snapshot.get(field).filter(|value| !value.is_null()).cloned()
}

/// Accepts RFC 3339, naive date-times (read as UTC) and plain dates.
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn is_more_recent(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        _ => false,
    }
}
