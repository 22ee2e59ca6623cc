//! Display helpers shared by the grouping engine and UI consumers.

use serde::{Deserialize, Serialize};

use crate::MetricStatus;

pub const COLOR_EXCELLENT: &str = "#10B981";
pub const COLOR_GOOD: &str = "#22C55E";
pub const COLOR_FAIR: &str = "#F59E0B";
pub const COLOR_POOR: &str = "#F97316";
pub const COLOR_CRITICAL: &str = "#EF4444";
pub const COLOR_NEUTRAL: &str = "#9CA3AF";

/// Card-ready rendering of a 0-100 health score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreDisplay {
    pub display: String,
    pub label: Option<String>,
    pub color: String,
}

pub fn format_health_score(score: Option<u8>) -> ScoreDisplay {
    let Some(score) = score else {
        return ScoreDisplay {
            display: "N/A".to_string(),
            label: None,
            color: COLOR_NEUTRAL.to_string(),
        };
    };

    let (label, color) = match score {
        90.. => ("Excellent", COLOR_EXCELLENT),
        80..=89 => ("Good", COLOR_GOOD),
        70..=79 => ("Fair", COLOR_FAIR),
        60..=69 => ("Poor", COLOR_POOR),
        _ => ("Critical", COLOR_CRITICAL),
    };

    ScoreDisplay {
        display: score.to_string(),
        label: Some(label.to_string()),
        color: color.to_string(),
    }
}

impl MetricStatus {
    /// High and low share one color.
    pub fn color(self) -> &'static str {
        match self {
            Self::Normal => COLOR_EXCELLENT,
            Self::Borderline => COLOR_FAIR,
            Self::High | Self::Low => COLOR_CRITICAL,
        }
    }
}

/// Color for a raw status string; unknown statuses are neutral gray.
pub fn status_color(status: &str) -> &'static str {
    MetricStatus::parse(status)
        .map(MetricStatus::color)
        .unwrap_or(COLOR_NEUTRAL)
}

/// Human readable name for a metric type, never failing on unknown input.
pub fn metric_display_name(metric_type: &str) -> String {
    let known = match metric_type {
        "ldl" => "LDL Cholesterol",
        "hdl" => "HDL Cholesterol",
        "vldl" => "VLDL Cholesterol",
        "total_cholesterol" => "Total Cholesterol",
        "triglycerides" => "Triglycerides",
        "blood_pressure" => "Blood Pressure",
        "heart_rate" => "Heart Rate",
        "egfr" => "eGFR",
        "creatinine" => "Creatinine",
        "bun" => "Blood Urea Nitrogen",
        "uric_acid" => "Uric Acid",
        "urea" => "Urea",
        "alt" => "ALT (SGPT)",
        "ast" => "AST (SGOT)",
        "alp" => "Alkaline Phosphatase",
        "bilirubin_total" => "Total Bilirubin",
        "albumin" => "Albumin",
        "ggt" => "GGT",
        "hemoglobin" => "Hemoglobin",
        "wbc" => "White Blood Cells",
        "rbc" => "Red Blood Cells",
        "platelets" => "Platelets",
        "hematocrit" => "Hematocrit",
        "mcv" => "MCV",
        "hba1c" => "HbA1c",
        "glucose_fasting" => "Fasting Glucose",
        "glucose_random" => "Random Glucose",
        "insulin" => "Insulin",
        "tsh" => "TSH",
        "free_t4" => "Free T4",
        "t4" => "T4",
        "t3" => "T3",
        "vitamin_d" => "Vitamin D",
        "vitamin_b12" => "Vitamin B12",
        "ferritin" => "Ferritin",
        "iron" => "Iron",
        "calcium" => "Calcium",
        "folate" => "Folate",
        "oxygen_saturation" => "Oxygen Saturation",
        "respiratory_rate" => "Respiratory Rate",
        "temperature" => "Temperature",
        "bmi" => "BMI",
        "weight" => "Weight",
        other => return title_case(other),
    };
    known.to_string()
}

fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
