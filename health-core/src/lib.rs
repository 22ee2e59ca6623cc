//! Core data model for organ-system health scoring.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod format;

pub use catalog::{MetricCatalog, OrganSystemDefinition, ReferenceRange};
pub use format::{format_health_score, metric_display_name, status_color, ScoreDisplay};

/// Scores and weights used when aggregating a system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroupingConfig {
    /// Score contributed by a metric in each status.
    pub status_scores: StatusScores,
    /// Weight of a member metric that is absent from the priority list.
    pub unranked_weight: u32,
    /// Score used when a system ends up with zero total weight.
    pub fallback_score: u8,
    /// Classify entries without a usable status against the reference range.
    pub derive_missing_status: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            status_scores: StatusScores::default(),
            unranked_weight: 1,
            fallback_score: 100,
            derive_missing_status: true,
        }
    }
}

impl GroupingConfig {
    /// Reject settings that would push scores outside 0..=100.
    pub fn validate(&self) -> Result<(), HealthError> {
        let scores = &self.status_scores;
        for (name, value) in [
            ("normal", scores.normal),
            ("borderline", scores.borderline),
            ("high", scores.high),
            ("low", scores.low),
            ("fallback", self.fallback_score),
        ] {
            if value > 100 {
                return Err(HealthError::InvalidConfig(format!(
                    "{name} score {value} is above 100"
                )));
            }
        }
        if self.unranked_weight == 0 {
            return Err(HealthError::InvalidConfig(
                "unranked_weight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusScores {
    pub normal: u8,
    pub borderline: u8,
    pub high: u8,
    pub low: u8,
}

impl Default for StatusScores {
    fn default() -> Self {
        Self {
            normal: 100,
            borderline: 70,
            high: 40,
            low: 40,
        }
    }
}

impl StatusScores {
    pub fn for_status(&self, status: MetricStatus) -> u8 {
        match status {
            MetricStatus::Normal => self.normal,
            MetricStatus::Borderline => self.borderline,
            MetricStatus::High => self.high,
            MetricStatus::Low => self.low,
        }
    }
}

/// Status assigned to a measurement against its reference range.
///
/// `High` and `Low` share the same severity tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    #[default]
    Normal,
    Borderline,
    High,
    Low,
}

impl MetricStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "borderline" => Some(Self::Borderline),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Borderline => "borderline",
            Self::High => "high",
            Self::Low => "low",
        }
    }

    /// Severity rank: normal 0, borderline 1, high and low 2.
    pub fn severity(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Borderline => 1,
            Self::High | Self::Low => 2,
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where a measurement came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Manual,
    Report,
    #[default]
    Unknown,
}

impl MetricSource {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Self::Manual,
            "report" => Self::Report,
            _ => Self::Unknown,
        }
    }
}

/// Measured value; composite readings such as blood pressure stay textual.
///
/// Numbers keep their JSON representation, so `55` is written back as `55`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Number(serde_json::Number),
    Text(String),
}

impl MetricValue {
    /// Numeric view of the value. Text is only accepted when it is a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => value.as_f64(),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One observed measurement of a lab or vital value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: MetricValue,
    #[serde(default)]
    pub unit: String,
    pub date: Option<DateTime<Utc>>,
    pub status: MetricStatus,
    #[serde(default)]
    pub source: MetricSource,
    #[serde(default)]
    pub needs_review: bool,
}

/// Aggregate view of one organ system, rebuilt on every grouping call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganHealth {
    pub system: OrganSystemDefinition,
    pub metrics: Vec<MetricEntry>,
    pub latest_metrics: BTreeMap<String, MetricEntry>,
    pub score: Option<u8>,
    pub status: MetricStatus,
    pub primary_metric: Option<MetricEntry>,
    pub last_updated: Option<DateTime<Utc>>,
    pub has_data: bool,
}

impl OrganHealth {
    /// Accumulator with no data for the given system.
    pub fn empty(system: OrganSystemDefinition) -> Self {
        Self {
            system,
            metrics: Vec::new(),
            latest_metrics: BTreeMap::new(),
            score: None,
            status: MetricStatus::Normal,
            primary_metric: None,
            last_updated: None,
            has_data: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.system.key
    }

    /// Entries of one metric type ordered oldest first, for charting.
    /// Undated entries go last.
    pub fn series(&self, metric_type: &str) -> Vec<&MetricEntry> {
        let mut points: Vec<&MetricEntry> = self
            .metrics
            .iter()
            .filter(|entry| entry.metric_type == metric_type)
            .collect();
        points.sort_by(|a, b| match (a.date, b.date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        points
    }
}

/// Non-fatal problem noticed while reading or grouping a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The snapshot had no usable `metrics` object.
    MissingMetrics,
    /// The metric type is not a member of any organ system.
    UnmappedMetric { metric_type: String },
    /// The series for a metric type was not an array.
    MalformedSeries { metric_type: String },
    /// An entry was rejected at the boundary.
    MalformedEntry {
        metric_type: String,
        index: usize,
        reason: String,
    },
    /// An entry had a date that could not be read; it was kept undated.
    UnparseableDate {
        metric_type: String,
        index: usize,
        raw: String,
    },
    /// An entry without a usable status was classified from its value.
    DerivedStatus {
        metric_type: String,
        index: usize,
        status: MetricStatus,
    },
    /// A system had data but zero total weight; the fallback score was used.
    DegenerateWeight { system: String },
}

/// Output of the grouping engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrganGrouping {
    pub systems: BTreeMap<String, OrganHealth>,
    pub diagnostics: Vec<Diagnostic>,
}

impl OrganGrouping {
    pub fn get(&self, key: &str) -> Option<&OrganHealth> {
        self.systems.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Systems worst first: highest severity, then lowest score, then key.
    pub fn ranked(&self) -> Vec<&OrganHealth> {
        let mut systems: Vec<&OrganHealth> = self.systems.values().collect();
        systems.sort_by(|a, b| {
            b.status
                .severity()
                .cmp(&a.status.severity())
                .then_with(|| a.score.cmp(&b.score))
                .then_with(|| a.key().cmp(b.key()))
        });
        systems
    }

    /// Rounded mean of the system scores.
    pub fn overall_score(&self) -> Option<u8> {
        let scores: Vec<u32> = self
            .systems
            .values()
            .filter_map(|health| health.score.map(u32::from))
            .collect();
        if scores.is_empty() {
            return None;
        }
        let mean = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
        Some(mean.round() as u8)
    }

    pub fn unmapped_metric_types(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                Diagnostic::UnmappedMetric { metric_type } => Some(metric_type.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Grouping result plus the backend fields the engine passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub grouping: OrganGrouping,
    #[serde(default)]
    pub summary: Option<serde_json::Value>,
    #[serde(default)]
    pub ui_hints: Option<serde_json::Value>,
}

impl HealthReport {
    pub fn new(
        grouping: OrganGrouping,
        summary: Option<serde_json::Value>,
        ui_hints: Option<serde_json::Value>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            grouping,
            summary,
            ui_hints,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("could not read snapshot: {0}")]
    Parse(String),
    #[error("invalid catalog: {0}")]
    Catalog(String),
    #[error("invalid grouping config: {0}")]
    InvalidConfig(String),
}
