use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use health_core::{format_health_score, metric_display_name, GroupingConfig, MetricCatalog};
use health_grouping::summarize_snapshot_str;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "health-cli",
    about = "Group a backend metrics snapshot into organ-system health scores."
)]
struct Args {
    /// Path to the snapshot JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Catalog JSON replacing the built-in organ systems.
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Print the full report as JSON instead of cards.
    #[arg(long)]
    json: bool,
}

/// Built-in catalog unless a catalog file is given.
fn load_catalog(path: Option<&Path>) -> anyhow::Result<MetricCatalog> {
    let Some(path) = path else {
        return Ok(MetricCatalog::standard());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read catalog {path:?}"))?;
    let catalog = serde_json::from_str::<MetricCatalog>(&raw)
        .with_context(|| format!("invalid catalog {path:?}"))?;
    tracing::info!(
        "loaded catalog {:?} with {} organ systems",
        path,
        catalog.systems().len()
    );
    Ok(catalog)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("health=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read snapshot {:?}", args.input))?;

    let catalog = load_catalog(args.catalog.as_deref())?;

    let config = GroupingConfig::default();
    let report = summarize_snapshot_str(&data, &catalog, &config)?;
    tracing::info!(
        "grouped {} organ systems with {} diagnostics",
        report.grouping.systems.len(),
        report.grouping.diagnostics.len()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let overall = format_health_score(report.grouping.overall_score());
    println!(
        "Generated at: {}\nOverall: {} {}",
        report.generated_at,
        overall.display,
        overall.label.unwrap_or_default()
    );

    for health in report.grouping.ranked() {
        let score = format_health_score(health.score);
        let primary = health
            .primary_metric
            .as_ref()
            .map(|entry| {
                format!(
                    "{}: {} {}",
                    metric_display_name(&entry.metric_type),
                    entry.value,
                    entry.unit
                )
            })
            .unwrap_or_default();
        println!(
            "{:<22} {:>4} {:<10} {:<10} {}",
            health.system.name,
            score.display,
            score.label.unwrap_or_default(),
            health.status,
            primary.trim_end()
        );
    }

    if !report.grouping.diagnostics.is_empty() {
        println!("Diagnostics: {}", report.grouping.diagnostics.len());
        for metric_type in report.grouping.unmapped_metric_types() {
            println!("  unmapped metric: {metric_type}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("health-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, body).expect("temp catalog should be writable");
        path
    }

    #[test]
    fn default_catalog_without_path() {
        let catalog = load_catalog(None).unwrap();
        assert_eq!(catalog, MetricCatalog::standard());
    }

    #[test]
    fn custom_catalog_is_loaded_from_file() {
        let path = write_catalog(
            "lipids.json",
            r#"{"systems": [{"key": "lipids", "name": "Lipids", "icon": "", "color": "", "metrics": ["ldl"]}]}"#,
        );
        let catalog = load_catalog(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.systems().len(), 1);
        assert_eq!(catalog.find_organ_system_for_metric("ldl"), Some("lipids"));
    }

    #[test]
    fn invalid_catalog_file_is_an_error() {
        let path = write_catalog(
            "dup.json",
            r#"{"systems": [{"key": "a", "name": "A", "icon": "", "color": "", "metrics": ["x", "x"]}]}"#,
        );
        let err = load_catalog(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(format!("{err:#}").contains("listed twice"), "{err:#}");
    }
}
