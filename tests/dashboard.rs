//! Configuration file, CSV on disk and rendered output, end to end.

use cri::cri_components::policy::{PolicyBand, Sector};
use cri::{render, Config, Dashboard, Format, Notice, PanelKind, Selection};
use cri::cri_core::ClimateDataset;
use chrono::NaiveDate;
use is_close::is_close;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn annual_signal(year: i32) -> f64 {
    if year <= 1975 {
        14.0 + 0.003 * (year - 1850) as f64
    } else {
        14.0 + 0.003 * 125.0 + 0.02 * (year - 1975) as f64
    }
}

fn write_csv(path: &Path) {
    let mut csv = String::from("dt,LandAndOceanAverageTemperature\n");
    for year in 1850..=2020 {
        for month in 1..=12 {
            let seasonal = (month as f64 - 6.5) * 0.1;
            csv.push_str(&format!(
                "{}-{:02}-01,{}\n",
                year,
                month,
                annual_signal(year) + seasonal
            ));
        }
    }
    fs::write(path, csv).unwrap();
}

fn setup(config_body: &str) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("temps.csv");
    write_csv(&csv);
    let config_path = dir.path().join("cri.toml");
    fs::write(
        &config_path,
        format!("[data]\npath = {:?}\n{}", csv.display().to_string(), config_body),
    )
    .unwrap();
    let config = Config::from_file(&config_path).unwrap();
    (dir, config)
}

fn build(config: &Config, selection: Selection) -> Dashboard {
    let path = config.data.path.as_ref().unwrap();
    let dataset = ClimateDataset::from_path(path, &config.data.loader).unwrap();
    Dashboard::build(
        &dataset,
        config,
        selection,
        &PanelKind::ALL,
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_dashboard_from_files() {
    let (_dir, config) = setup("");
    let dashboard = build(&config, Selection::default());
    assert!(dashboard.notices.is_empty(), "{:?}", dashboard.notices);

    let trends = dashboard.trends.as_ref().unwrap();
    let (year, anomaly) = trends.latest.unwrap();
    assert_eq!(year, 2020);
    assert!(is_close!(anomaly, 1.2));
    assert_eq!(trends.histograms.first().map(|h| h.decade), Some(1950));

    let policy = dashboard.policy.as_ref().unwrap();
    assert_eq!(policy.summary.region, "Global Average");
    assert_eq!(policy.summary.sector, Sector::PublicHealth);
    assert_eq!(policy.summary.band, policy.summary.score.band());
}

#[test]
fn test_correction_is_applied_before_analysis() {
    let (_dir, config) = setup("[correction]\nyear = 2017\n");
    let dashboard = build(&config, Selection::default());

    let stats = dashboard.correction.as_ref().unwrap();
    assert_eq!(stats.months_corrected, 12);
    assert!(is_close!(stats.original_mean.unwrap(), annual_signal(2017)));
    // Climatology of 2010-2016 plus one year of trend
    assert!(is_close!(stats.corrected_mean.unwrap(), annual_signal(2014)));
    assert!(dashboard
        .notices
        .iter()
        .any(|n| matches!(n, Notice::Info(m) if m.contains("12 months of 2017"))));

    let brief = &dashboard.policy.as_ref().unwrap().brief;
    assert!(brief.render_markdown().contains("**Data Integrity:** 12 monthly values of 2017"));
}

#[test]
fn test_vulnerable_region_scores_higher() {
    let (_dir, config) = setup("");
    let europe = build(
        &config,
        Selection {
            region: "Europe".to_string(),
            ..Selection::default()
        },
    );
    let islands = build(
        &config,
        Selection {
            region: "SIDS".to_string(),
            sector: Sector::Infrastructure,
            ..Selection::default()
        },
    );
    let europe_score = europe.pulse.unwrap().composite;
    let islands_score = islands.pulse.unwrap().composite;
    assert!(islands_score > europe_score);
    assert!(islands.policy.unwrap().summary.band >= PolicyBand::Moderate);
}

#[test]
fn test_every_format_renders() {
    let (_dir, config) = setup("");
    let dashboard = build(&config, Selection::default());

    let text = render(&dashboard, Format::Text).unwrap();
    assert!(text.contains("Temperature Trends\n=================="));
    assert!(text.contains("Risk Pulse"));

    let markdown = render(&dashboard, Format::Markdown).unwrap();
    assert!(markdown.contains("## Regional Risk Translation"));
    assert!(markdown.contains("# Climate Strategy Briefing: Executive Summary"));

    let json: serde_json::Value =
        serde_json::from_str(&render(&dashboard, Format::Json).unwrap()).unwrap();
    assert_eq!(json["data_region"], "Global");
    assert_eq!(json["trends"]["latest"][0], 2020);
    assert!(json["pulse"]["composite"].as_f64().unwrap() <= 1.0);
}

#[test]
fn test_invalid_configuration_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[pulse]\nwindow = 3\n").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("bad.toml"));
}
