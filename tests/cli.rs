use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// A temp dir with a config file pointing the calibration store inside it.
struct Context {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl Context {
    fn new() -> Self {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("ring-sizer.toml");
        let state_path = temp_dir.path().join("state.json");
        fs::write(
            &config_path,
            format!("[storage]\npath = {:?}\n", state_path.to_str().unwrap()),
        )
        .unwrap();
        Self {
            temp_dir,
            config_path,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ring-sizer").unwrap();
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    fn dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

#[test]
fn convert_us_size() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["convert", "us-ca", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Equivalent International Sizes"))
        .stdout(predicate::str::contains("17.35"))
        .stdout(predicate::str::contains("N½"));
}

#[test]
fn convert_without_value_prompts() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["convert", "DIAMETER_MM"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Enter a size"));
}

#[test]
fn convert_out_of_range_reports_no_match() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["convert", "diameter-mm", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching size found for \"30\" in Diameter (mm)"));
}

#[test]
fn convert_json() {
    let ctx = Context::new();
    let output = ctx
        .cmd()
        .args(["convert", "CIRCUMFERENCE_MM", "58.2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["id"], 17);
    assert_eq!(value["us_ca"], "8.5");
}

#[test]
fn unknown_input_type_is_rejected() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["convert", "ring", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown input type 'ring'"));
}

#[test]
fn options_lists_numbers_in_order() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["options", "us-ca"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("US / Canada: 0, 1, 1.5, 2, 2.5"));
}

#[test]
fn chart_prints_every_row() {
    let ctx = Context::new();
    let output = ctx.cmd().arg("chart").output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 31);
}

#[test]
fn measure_requires_calibration() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["measure", "--ring-px", "65"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Screen calibration needed"));
}

#[test]
fn calibrate_then_measure() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "300", "--dpr", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibration saved: 3.5047 px/mm"))
        .stdout(predicate::str::contains("Effective screen density: 178 PPI"));

    assert!(ctx.dir().join("state.json").exists());

    ctx.cmd()
        .args(["measure", "--ring-px", "65", "--dpr", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Diameter:      18.55 mm"))
        .stdout(predicate::str::contains("8.5"));
}

#[test]
fn calibrate_warns_on_implausible_density() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "600", "--dpr", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning: "));
}

#[test]
fn measure_after_zoom_change_asks_to_recalibrate() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "300", "--dpr", "2"])
        .assert()
        .success();

    ctx.cmd()
        .args(["measure", "--ring-px", "65", "--dpr", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please recalibrate"));

    // the stale calibration is gone for good
    ctx.cmd()
        .args(["measure", "--ring-px", "65", "--dpr", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Screen calibration needed"));
}

#[test]
fn recalibrate_discards_saved_calibration() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["recalibrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved calibration."));

    ctx.cmd()
        .args(["calibrate", "--reference-px", "300"])
        .assert()
        .success();

    ctx.cmd()
        .args(["recalibrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibration discarded."));

    ctx.cmd()
        .args(["measure", "--ring-px", "65"])
        .assert()
        .failure();
}

#[test]
fn calibrate_rejects_reference_outside_control_range() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "700"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be between 150 and 600 px"));

    assert!(!ctx.dir().join("state.json").exists());
}

#[test]
fn measure_rejects_ring_outside_control_range() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "300"])
        .assert()
        .success();

    ctx.cmd()
        .args(["measure", "--ring-px", "120"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be between 30 and 100 px"));
}

#[test]
fn measure_json_includes_physical_size() {
    let ctx = Context::new();
    ctx.cmd()
        .args(["calibrate", "--reference-px", "300"])
        .assert()
        .success();

    let output = ctx
        .cmd()
        .args(["measure", "--ring-px", "65", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ring_px"], 65.0);
    assert!((json["diameter_mm"].as_f64().unwrap() - 18.547).abs() < 0.01);
    assert!((json["circumference_mm"].as_f64().unwrap() - 58.27).abs() < 0.01);
    assert_eq!(json["matched"]["id"], 17);
}
