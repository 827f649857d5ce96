mod common;

use assert_cmd::Command;
use mic_plate::{AnalysisReport, AnalyzerConfig, LocateStrategy};
use predicates::prelude::*;

fn write_png(img: &mic_plate::core::RgbImage, path: &std::path::Path) {
    let buf = image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .expect("buffer");
    buf.save(path).expect("save png");
}

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("mic-plate").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn analyze_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("plate.png");
    let report_path = dir.path().join("report.json");
    write_png(&common::render_plate(), &image_path);

    let mut cmd = Command::cargo_bin("mic-plate").unwrap();
    cmd.arg("analyze")
        .arg(&image_path)
        .arg("--output")
        .arg(&report_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Fluconazole"))
        .stdout(predicate::str::contains("≤0.004"));

    let report = AnalysisReport::load_json(&report_path).unwrap();
    assert_eq!(report.error, None);
    assert_eq!(report.strategy, Some(LocateStrategy::ColorBounds));
    assert_eq!(report.wells.len(), 96);
    assert_eq!(report.mic.len(), 8);
    assert_eq!(report.mic[6].mic_value, Some(32.0));
    assert!(report.control_valid);
}

#[test]
fn default_report_path_and_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("plate.png");
    let config_path = dir.path().join("cfg.json");
    write_png(&common::render_plate(), &image_path);

    let mut cmd = Command::cargo_bin("mic-plate").unwrap();
    cmd.arg("config").arg(&config_path);
    cmd.assert().success();
    assert_eq!(
        AnalyzerConfig::load_json(&config_path).unwrap(),
        AnalyzerConfig::default()
    );

    let mut cmd = Command::cargo_bin("mic-plate").unwrap();
    cmd.arg("analyze")
        .arg(&image_path)
        .arg("--config")
        .arg(&config_path)
        .arg("--log-level")
        .arg("info");
    cmd.assert().success();

    let report = AnalysisReport::load_json(dir.path().join("plate_mic.json")).unwrap();
    assert_eq!(
        report.config_path.as_deref(),
        Some(config_path.to_string_lossy().as_ref())
    );
}

#[test]
fn undecodable_image_fails_with_error_report() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("broken.png");
    let report_path = dir.path().join("report.json");
    std::fs::write(&image_path, b"not a png").unwrap();

    let mut cmd = Command::cargo_bin("mic-plate").unwrap();
    cmd.arg("analyze")
        .arg(&image_path)
        .arg("--output")
        .arg(&report_path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Decode"));

    let report = AnalysisReport::load_json(&report_path).unwrap();
    assert!(report.error.is_some());
    assert!(report.wells.is_empty());
}
