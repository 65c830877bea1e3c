mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn write_scene(dir: &Path) -> (PathBuf, PathBuf, PathBuf, PathBuf) {
    let surface = dir.join("surface.png");
    let base = dir.join("base.png");
    let frame = dir.join("frame.png");
    let config = dir.join("pipeline.json");
    surface_frame().save(&surface).expect("surface png");
    base_frame().save(&base).expect("base png");
    object_frame(150, 100, RED).save(&frame).expect("frame png");
    std::fs::write(
        &config,
        format!(r#"{{ "calibration": {{ "canvas_width": {CANVAS_W}, "canvas_height": {CANVAS_H} }} }}"#),
    )
    .expect("config");
    (surface, base, frame, config)
}

#[test]
fn surface_prints_corners_and_matrix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (surface, _, _, config) = write_scene(dir.path());

    Command::cargo_bin("tablecast")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .arg("surface")
        .arg(&surface)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"corners\""))
        .stdout(predicate::str::contains("\"rectification_matrix\""))
        .stdout(predicate::str::contains("300"));
}

#[test]
fn capture_writes_template_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (surface, base, frame, config) = write_scene(dir.path());
    let out = dir.path().join("template.json");

    Command::cargo_bin("tablecast")
        .expect("binary")
        .args(["--config", config.to_str().expect("utf8")])
        .arg("capture")
        .arg("--surface")
        .arg(&surface)
        .arg("--base")
        .arg(&base)
        .arg("--frame")
        .arg(&frame)
        .args(["--name", "red block", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("red block"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("written")).expect("json");
    assert_eq!(json["name"], "red block");
    assert!(json["canonical_contour"].as_array().is_some_and(|a| a.len() >= 3));
    assert_eq!(json["check_color_match"], true);
}

#[test]
fn missing_image_fails_cleanly() {
    Command::cargo_bin("tablecast")
        .expect("binary")
        .args(["surface", "/no/such/image.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open image"));
}
