use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use leasing_core::control::{ChartKind, ControlError, LeasingControlPlane};
use leasing_core::loader::DEFAULT_SPECS;
use leasing_core::services::{RegistryConfig, SchemaRegistry};
use leasing_store::schema::TABLE_GUEST_CARDS;
use surrealdb::engine::local::Db;
use tempfile::TempDir;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

async fn control_plane(config: RegistryConfig) -> LeasingControlPlane<Db> {
    let registry = SchemaRegistry::in_memory(&config)
        .await
        .unwrap_or_else(|err| panic!("failed to build registry: {err}"));
    LeasingControlPlane::new(registry)
}

/// Pulls the saved path and inline image out of a chart response.
fn saved_image(response: &str, path_label: &str) -> (PathBuf, Vec<u8>) {
    let path = response
        .split(path_label)
        .nth(1)
        .and_then(|rest| rest.split('`').nth(1))
        .expect("response names the saved file");
    let encoded = response
        .split("data:image/png;base64,")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .expect("response embeds the image");
    let decoded = STANDARD.decode(encoded).expect("image is valid base64");
    (PathBuf::from(path), decoded)
}

fn png_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("charts dir exists")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect()
}

#[tokio::test]
async fn individual_chart_is_written_and_embedded() {
    let charts = TempDir::new().expect("temp dir");
    let charts_dir = charts.path().join("charts");
    let control =
        control_plane(RegistryConfig::new(data_dir()).with_charts_dir(&charts_dir)).await;

    let response = control
        .create_individual_chart("pet_bar")
        .await
        .expect("chart should render");

    assert!(response.starts_with("📊 Chart Generated: **pet_bar**"));
    let (path, decoded) = saved_image(&response, "**Saved to:**");
    assert!(path.starts_with(&charts_dir));
    assert!(
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("pet_bar_"))
    );
    let written = std::fs::read(&path).expect("chart file exists");
    assert!(written.starts_with(PNG_MAGIC));
    assert_eq!(decoded, written);
}

#[tokio::test]
async fn every_chart_type_renders() {
    let charts = TempDir::new().expect("temp dir");
    let control =
        control_plane(RegistryConfig::new(data_dir()).with_charts_dir(charts.path())).await;

    for kind in ChartKind::ALL {
        let response = control
            .create_individual_chart(kind.name())
            .await
            .unwrap_or_else(|err| panic!("{} should render: {err}", kind.name()));
        let (_, decoded) = saved_image(&response, "**Saved to:**");
        assert!(decoded.starts_with(PNG_MAGIC), "{} is a png", kind.name());
    }
    assert!(png_files(charts.path()).len() >= ChartKind::ALL.len());
}

#[tokio::test]
async fn market_report_summarizes_and_embeds_the_grid() {
    let charts = TempDir::new().expect("temp dir");
    let control =
        control_plane(RegistryConfig::new(data_dir()).with_charts_dir(charts.path())).await;

    let report = control
        .create_market_report()
        .await
        .expect("report should render");

    assert!(report.starts_with("## 📊 Market Report Generated"));
    assert!(report.contains("- **Market Average Rent:** $2,550"));
    assert!(report.contains("- **Our Rate:** $2,400 ($150 below market avg)"));
    assert!(report.contains("- **Rent Range:** $2,200 - $2,950"));
    assert!(report.contains("- **Total Prospects:** 7"));
    assert!(report.contains("- **Average Budget:** $2,508"));
    assert!(report.contains("- **Prospects Who Can Afford Our Rate:** 5 of 6 with a budget (83.3%)"));
    assert!(report.contains("6. **Activity Types**"));

    let (path, decoded) = saved_image(&report, "**Report saved to:**");
    assert!(
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("market_report_"))
    );
    assert!(decoded.starts_with(PNG_MAGIC));
    assert_eq!(png_files(charts.path()), vec![path]);
}

#[tokio::test]
async fn unknown_chart_lists_the_choices() {
    let charts = TempDir::new().expect("temp dir");
    let control =
        control_plane(RegistryConfig::new(data_dir()).with_charts_dir(charts.path())).await;

    let err = control
        .create_individual_chart("radar")
        .await
        .expect_err("unknown chart type");

    assert!(matches!(&err, ControlError::UnknownChart(name) if name == "radar"));
    assert!(err.to_string().contains("- rent_histogram: Distribution of nearby rental prices"));
    assert!(png_files(charts.path()).is_empty());
}

#[tokio::test]
async fn charts_need_their_tables() {
    let charts = TempDir::new().expect("temp dir");
    let specs = DEFAULT_SPECS
        .iter()
        .filter(|spec| spec.name != TABLE_GUEST_CARDS)
        .copied()
        .collect();
    let control = control_plane(
        RegistryConfig::new(data_dir())
            .with_charts_dir(charts.path())
            .with_specs(specs),
    )
    .await;

    let report = control.create_market_report().await;
    assert!(matches!(report, Err(ControlError::TableAbsent(name)) if name == TABLE_GUEST_CARDS));

    let pets = control.create_individual_chart("pet_bar").await;
    assert!(matches!(pets, Err(ControlError::TableAbsent(_))));

    control
        .create_individual_chart("similarity_rent")
        .await
        .expect("nearby units charts still render");
}
