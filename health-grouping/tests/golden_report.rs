use std::fs;

use chrono::DateTime;
use health_core::{GroupingConfig, MetricCatalog};
use health_grouping::summarize_snapshot_str;
use serde_json::Value;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"));
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("cannot read {path}: {err}"))
}

fn dashboard_report() -> Value {
    let report = summarize_snapshot_str(
        &fixture("dashboard_snapshot.json"),
        &MetricCatalog::standard(),
        &GroupingConfig::default(),
    )
    .expect("report should build");
    serde_json::to_value(report).expect("report should serialize")
}

fn golden() -> Value {
    serde_json::from_str(&fixture("dashboard_report.json")).expect("golden is not valid JSON")
}

#[test]
fn organ_systems_match_golden() {
    let actual = dashboard_report();
    let expected = golden();

    let actual_systems = actual["grouping"]["systems"].as_object().unwrap();
    let expected_systems = expected["grouping"]["systems"].as_object().unwrap();
    assert_eq!(
        actual_systems.keys().collect::<Vec<_>>(),
        expected_systems.keys().collect::<Vec<_>>()
    );
    for (key, expected_health) in expected_systems {
        assert_eq!(&actual_systems[key], expected_health, "system {key}");
    }
}

#[test]
fn diagnostics_and_passthrough_match_golden() {
    let actual = dashboard_report();
    let expected = golden();

    assert_eq!(
        actual["grouping"]["diagnostics"],
        expected["grouping"]["diagnostics"]
    );
    assert_eq!(actual["summary"], expected["summary"]);
    assert_eq!(actual["ui_hints"], expected["ui_hints"]);
}

#[test]
fn generated_at_is_an_rfc3339_stamp() {
    let actual = dashboard_report();
    let stamp = actual["generated_at"].as_str().expect("generated_at is a string");
    assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
}
