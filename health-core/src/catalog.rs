//! Registry of organ systems, their member metrics and reference ranges.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{HealthError, MetricStatus};

/// Static description of one body system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganSystemDefinition {
    pub key: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
    pub metrics: Vec<String>,
    /// Member metrics ordered by clinical importance, most important first.
    #[serde(default)]
    pub priority: Vec<String>,
}

impl OrganSystemDefinition {
    pub fn contains(&self, metric_type: &str) -> bool {
        self.metrics.iter().any(|metric| metric == metric_type)
    }

    pub fn priority_index(&self, metric_type: &str) -> Option<usize> {
        self.priority.iter().position(|metric| metric == metric_type)
    }

    /// `priority.len() - index` for ranked metrics, `unranked` otherwise.
    pub fn weight_for(&self, metric_type: &str, unranked: u32) -> u32 {
        match self.priority_index(metric_type) {
            Some(index) => (self.priority.len() - index) as u32,
            None => unranked,
        }
    }
}

/// Reference interval used to classify numeric values.
///
/// Values outside the normal bounds are `borderline` while they stay within
/// the matching borderline bound, and `low`/`high` beyond it. Without a
/// borderline bound they go straight to `low`/`high`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub unit: String,
    #[serde(default)]
    pub normal_low: Option<f64>,
    #[serde(default)]
    pub normal_high: Option<f64>,
    #[serde(default)]
    pub borderline_low: Option<f64>,
    #[serde(default)]
    pub borderline_high: Option<f64>,
}

impl ReferenceRange {
    pub fn classify(&self, value: f64) -> MetricStatus {
        if let Some(normal_low) = self.normal_low {
            if value < normal_low {
                return match self.borderline_low {
                    Some(limit) if value >= limit => MetricStatus::Borderline,
                    _ => MetricStatus::Low,
                };
            }
        }
        if let Some(normal_high) = self.normal_high {
            if value > normal_high {
                return match self.borderline_high {
                    Some(limit) if value <= limit => MetricStatus::Borderline,
                    _ => MetricStatus::High,
                };
            }
        }
        MetricStatus::Normal
    }
}

/// Immutable lookup from metric type to organ system and reference range.
///
/// Membership is disjoint: construction fails if a metric type is listed
/// under more than one system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "CatalogFile", into = "CatalogFile")]
pub struct MetricCatalog {
    systems: Vec<OrganSystemDefinition>,
    reference_ranges: BTreeMap<String, ReferenceRange>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    systems: Vec<OrganSystemDefinition>,
    #[serde(default)]
    reference_ranges: BTreeMap<String, ReferenceRange>,
}

impl TryFrom<CatalogFile> for MetricCatalog {
    type Error = HealthError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        MetricCatalog::new(file.systems, file.reference_ranges)
    }
}

impl From<MetricCatalog> for CatalogFile {
    fn from(catalog: MetricCatalog) -> Self {
        Self {
            systems: catalog.systems,
            reference_ranges: catalog.reference_ranges,
        }
    }
}

impl MetricCatalog {
    pub fn new(
        systems: Vec<OrganSystemDefinition>,
        reference_ranges: BTreeMap<String, ReferenceRange>,
    ) -> Result<Self, HealthError> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut seen_keys: Vec<&str> = Vec::new();

        for (position, system) in systems.iter().enumerate() {
            if system.key.trim().is_empty() {
                return Err(HealthError::Catalog(format!(
                    "system #{position} has an empty key"
                )));
            }
            if seen_keys.contains(&system.key.as_str()) {
                return Err(HealthError::Catalog(format!(
                    "system key {} is defined twice",
                    system.key
                )));
            }
            seen_keys.push(&system.key);

            for metric in &system.metrics {
                if let Some(&owner) = index.get(metric) {
                    if owner == position {
                        return Err(HealthError::Catalog(format!(
                            "metric {metric} is listed twice in {}",
                            system.key
                        )));
                    }
                    return Err(HealthError::Catalog(format!(
                        "metric {metric} belongs to both {} and {}",
                        systems[owner].key, system.key
                    )));
                }
                index.insert(metric.clone(), position);
            }

            if let Some(stray) = system.priority.iter().find(|m| !system.contains(m)) {
                return Err(HealthError::Catalog(format!(
                    "priority metric {stray} is not a member of {}",
                    system.key
                )));
            }

            for (rank, metric) in system.priority.iter().enumerate() {
                if system.priority[..rank].contains(metric) {
                    return Err(HealthError::Catalog(format!(
                        "priority metric {metric} is ranked twice in {}",
                        system.key
                    )));
                }
            }
        }

        Ok(Self {
            systems,
            reference_ranges,
            index,
        })
    }

    /// Built-in taxonomy covering the metric types the backend emits.
    pub fn standard() -> Self {
        let systems = STANDARD_SYSTEMS
            .iter()
            .map(|seed| OrganSystemDefinition {
                key: seed.key.to_string(),
                name: seed.name.to_string(),
                icon: seed.icon.to_string(),
                color: seed.color.to_string(),
                description: seed.description.to_string(),
                metrics: seed.metrics.iter().map(|m| m.to_string()).collect(),
                priority: seed.priority.iter().map(|m| m.to_string()).collect(),
            })
            .collect();

        let reference_ranges = STANDARD_RANGES
            .iter()
            .map(|(metric, unit, normal_low, normal_high, borderline_low, borderline_high)| {
                (
                    metric.to_string(),
                    ReferenceRange {
                        unit: unit.to_string(),
                        normal_low: *normal_low,
                        normal_high: *normal_high,
                        borderline_low: *borderline_low,
                        borderline_high: *borderline_high,
                    },
                )
            })
            .collect();

        match Self::new(systems, reference_ranges) {
            Ok(catalog) => catalog,
            Err(err) => unreachable!("built-in catalog is invalid: {err}"),
        }
    }

    /// Systems in definition order.
    pub fn systems(&self) -> &[OrganSystemDefinition] {
        &self.systems
    }

    pub fn system(&self, key: &str) -> Option<&OrganSystemDefinition> {
        self.systems.iter().find(|system| system.key == key)
    }

    pub fn find_organ_system_for_metric(&self, metric_type: &str) -> Option<&str> {
        self.index
            .get(metric_type)
            .map(|&position| self.systems[position].key.as_str())
    }

    pub fn reference_range(&self, metric_type: &str) -> Option<&ReferenceRange> {
        self.reference_ranges.get(metric_type)
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

struct SystemSeed {
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    color: &'static str,
    description: &'static str,
    metrics: &'static [&'static str],
    priority: &'static [&'static str],
}

const STANDARD_SYSTEMS: [SystemSeed; 8] = [
    SystemSeed {
        key: "heart",
        name: "Heart",
        icon: "heart",
        color: "#EF4444",
        description: "Cholesterol, blood pressure and heart rate",
        metrics: &[
            "ldl",
            "hdl",
            "total_cholesterol",
            "triglycerides",
            "blood_pressure",
            "heart_rate",
            "vldl",
        ],
        priority: &[
            "ldl",
            "hdl",
            "total_cholesterol",
            "triglycerides",
            "blood_pressure",
            "heart_rate",
        ],
    },
    SystemSeed {
        key: "kidney",
        name: "Kidneys",
        icon: "water",
        color: "#3B82F6",
        description: "Filtration and waste clearance",
        metrics: &["egfr", "creatinine", "bun", "uric_acid", "urea"],
        priority: &["egfr", "creatinine", "bun", "uric_acid"],
    },
    SystemSeed {
        key: "liver",
        name: "Liver",
        icon: "medical",
        color: "#F59E0B",
        description: "Liver enzymes and protein synthesis",
        metrics: &["alt", "ast", "alp", "bilirubin_total", "albumin", "ggt"],
        priority: &["alt", "ast", "bilirubin_total", "alp", "ggt", "albumin"],
    },
    SystemSeed {
        key: "blood",
        name: "Blood",
        icon: "water-outline",
        color: "#DC2626",
        description: "Blood cell counts",
        metrics: &["hemoglobin", "wbc", "platelets", "rbc", "hematocrit", "mcv"],
        priority: &["hemoglobin", "wbc", "platelets", "rbc", "hematocrit"],
    },
    SystemSeed {
        key: "metabolic",
        name: "Metabolism",
        icon: "flash",
        color: "#8B5CF6",
        description: "Blood sugar control",
        metrics: &["hba1c", "glucose_fasting", "glucose_random", "insulin"],
        priority: &["hba1c", "glucose_fasting", "glucose_random", "insulin"],
    },
    SystemSeed {
        key: "thyroid",
        name: "Thyroid",
        icon: "pulse",
        color: "#EC4899",
        description: "Thyroid hormones",
        metrics: &["tsh", "free_t4", "t4", "t3"],
        priority: &["tsh", "free_t4", "t4", "t3"],
    },
    SystemSeed {
        key: "nutrients",
        name: "Vitamins & Minerals",
        icon: "nutrition",
        color: "#10B981",
        description: "Vitamin and mineral levels",
        metrics: &[
            "vitamin_d",
            "vitamin_b12",
            "ferritin",
            "iron",
            "calcium",
            "folate",
        ],
        priority: &["vitamin_d", "vitamin_b12", "ferritin", "iron", "calcium"],
    },
    SystemSeed {
        key: "vitals",
        name: "Vitals",
        icon: "fitness",
        color: "#06B6D4",
        description: "Body measurements and vital signs",
        metrics: &[
            "oxygen_saturation",
            "respiratory_rate",
            "temperature",
            "bmi",
            "weight",
        ],
        priority: &["oxygen_saturation", "respiratory_rate", "temperature", "bmi"],
    },
];

type RangeSeed = (
    &'static str,
    &'static str,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
);

// (metric, unit, normal_low, normal_high, borderline_low, borderline_high)
const STANDARD_RANGES: &[RangeSeed] = &[
    ("ldl", "mg/dL", None, Some(130.0), None, Some(160.0)),
    ("hdl", "mg/dL", Some(40.0), None, None, None),
    ("total_cholesterol", "mg/dL", None, Some(200.0), None, Some(240.0)),
    ("triglycerides", "mg/dL", None, Some(150.0), None, Some(200.0)),
    ("vldl", "mg/dL", Some(2.0), Some(30.0), None, None),
    ("heart_rate", "bpm", Some(60.0), Some(100.0), None, None),
    ("egfr", "mL/min/1.73m²", Some(90.0), None, Some(60.0), None),
    ("creatinine", "mg/dL", Some(0.6), Some(1.3), None, None),
    ("bun", "mg/dL", Some(7.0), Some(20.0), None, None),
    ("uric_acid", "mg/dL", Some(3.5), Some(7.2), None, None),
    ("urea", "mg/dL", Some(15.0), Some(45.0), None, None),
    ("alt", "U/L", Some(7.0), Some(56.0), None, None),
    ("ast", "U/L", Some(10.0), Some(40.0), None, None),
    ("alp", "U/L", Some(44.0), Some(147.0), None, None),
    ("bilirubin_total", "mg/dL", Some(0.1), Some(1.2), None, None),
    ("albumin", "g/dL", Some(3.5), Some(5.0), None, None),
    ("ggt", "U/L", None, Some(48.0), None, None),
    ("hemoglobin", "g/dL", Some(12.0), Some(17.5), None, None),
    ("wbc", "10^3/µL", Some(4.0), Some(11.0), None, None),
    ("platelets", "10^3/µL", Some(150.0), Some(450.0), None, None),
    ("rbc", "10^6/µL", Some(4.2), Some(5.9), None, None),
    ("hematocrit", "%", Some(36.0), Some(52.0), None, None),
    ("mcv", "fL", Some(80.0), Some(100.0), None, None),
    ("hba1c", "%", None, Some(5.6), None, Some(6.4)),
    ("glucose_fasting", "mg/dL", Some(70.0), Some(99.0), None, Some(125.0)),
    ("glucose_random", "mg/dL", Some(70.0), Some(140.0), None, Some(199.0)),
    ("insulin", "µIU/mL", Some(2.6), Some(24.9), None, None),
    ("tsh", "mIU/L", Some(0.4), Some(4.0), None, None),
    ("free_t4", "ng/dL", Some(0.8), Some(1.8), None, None),
    ("t4", "µg/dL", Some(5.0), Some(12.0), None, None),
    ("t3", "ng/dL", Some(80.0), Some(200.0), None, None),
    ("vitamin_d", "ng/mL", Some(30.0), Some(100.0), Some(20.0), None),
    ("vitamin_b12", "pg/mL", Some(200.0), Some(900.0), None, None),
    ("ferritin", "ng/mL", Some(30.0), Some(400.0), None, None),
    ("iron", "µg/dL", Some(60.0), Some(170.0), None, None),
    ("calcium", "mg/dL", Some(8.6), Some(10.3), None, None),
    ("folate", "ng/mL", Some(3.0), None, None, None),
    ("oxygen_saturation", "%", Some(95.0), None, Some(90.0), None),
    ("respiratory_rate", "breaths/min", Some(12.0), Some(20.0), None, None),
    ("temperature", "°C", Some(36.1), Some(37.2), None, Some(38.0)),
    ("bmi", "kg/m²", Some(18.5), Some(24.9), None, Some(29.9)),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn system(key: &str, metrics: &[&str], priority: &[&str]) -> OrganSystemDefinition {
        OrganSystemDefinition {
            key: key.to_string(),
            name: key.to_string(),
            icon: String::new(),
            color: String::new(),
            description: String::new(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            priority: priority.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn standard_catalog_maps_known_metrics() {
        let catalog = MetricCatalog::standard();
        assert_eq!(catalog.find_organ_system_for_metric("hdl"), Some("heart"));
        assert_eq!(
            catalog.find_organ_system_for_metric("creatinine"),
            Some("kidney")
        );
        assert_eq!(catalog.find_organ_system_for_metric("unknown_marker"), None);
        assert_eq!(catalog.systems().len(), 8);
        assert_eq!(catalog.systems()[0].key, "heart");
    }

    #[test]
    fn every_range_belongs_to_a_mapped_metric() {
        let catalog = MetricCatalog::standard();
        for (metric, ..) in STANDARD_RANGES {
            assert!(
                catalog.find_organ_system_for_metric(metric).is_some(),
                "{metric} has a range but no system"
            );
        }
        assert!(catalog.reference_range("blood_pressure").is_none());
    }

    #[test]
    fn weights_follow_priority_order() {
        let catalog = MetricCatalog::standard();
        let heart = catalog.system("heart").unwrap();
        assert_eq!(heart.weight_for("ldl", 1), 6);
        assert_eq!(heart.weight_for("hdl", 1), 5);
        assert_eq!(heart.weight_for("vldl", 1), 1);
        assert_eq!(heart.priority_index("heart_rate"), Some(5));
    }

    #[test]
    fn duplicate_membership_is_rejected() {
        let result = MetricCatalog::new(
            vec![
                system("heart", &["ldl", "hdl"], &["ldl"]),
                system("metabolic", &["hdl"], &[]),
            ],
            BTreeMap::new(),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("hdl belongs to both heart and metabolic"), "{err}");
    }

    #[test]
    fn repeats_inside_one_system_are_rejected() {
        let err = MetricCatalog::new(
            vec![system("heart", &["ldl", "hdl", "ldl"], &["ldl"])],
            BTreeMap::new(),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("metric ldl is listed twice in heart"), "{err}");
        assert!(!err.contains("belongs to both"), "{err}");

        let err = MetricCatalog::new(
            vec![system("heart", &["ldl", "hdl"], &["ldl", "hdl", "ldl"])],
            BTreeMap::new(),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("priority metric ldl is ranked twice in heart"), "{err}");
    }

    #[test]
    fn duplicate_keys_and_stray_priorities_are_rejected() {
        assert!(MetricCatalog::new(
            vec![system("heart", &["ldl"], &[]), system("heart", &["hdl"], &[])],
            BTreeMap::new(),
        )
        .is_err());

        assert!(MetricCatalog::new(
            vec![system("heart", &["ldl"], &["ldl", "hdl"])],
            BTreeMap::new(),
        )
        .is_err());

        assert!(MetricCatalog::new(vec![system(" ", &["ldl"], &[])], BTreeMap::new()).is_err());
    }

    #[test]
    fn catalog_json_is_validated_on_load() {
        let json = r#"{
            "systems": [
                {"key": "a", "name": "A", "icon": "", "color": "", "metrics": ["x"]},
                {"key": "b", "name": "B", "icon": "", "color": "", "metrics": ["x"]}
            ]
        }"#;
        assert!(serde_json::from_str::<MetricCatalog>(json).is_err());

        let round_trip = serde_json::to_string(&MetricCatalog::standard()).unwrap();
        let loaded: MetricCatalog = serde_json::from_str(&round_trip).unwrap();
        assert_eq!(loaded.find_organ_system_for_metric("tsh"), Some("thyroid"));
    }

    #[test]
    fn classify_uses_borderline_band() {
        let catalog = MetricCatalog::standard();
        let ldl = catalog.reference_range("ldl").unwrap();
        assert_eq!(ldl.classify(100.0), MetricStatus::Normal);
        assert_eq!(ldl.classify(145.0), MetricStatus::Borderline);
        assert_eq!(ldl.classify(170.0), MetricStatus::High);

        let vitamin_d = catalog.reference_range("vitamin_d").unwrap();
        assert_eq!(vitamin_d.classify(25.0), MetricStatus::Borderline);
        assert_eq!(vitamin_d.classify(12.0), MetricStatus::Low);

        let hdl = catalog.reference_range("hdl").unwrap();
        assert_eq!(hdl.classify(35.0), MetricStatus::Low);
        assert_eq!(hdl.classify(80.0), MetricStatus::Normal);
    }
}
