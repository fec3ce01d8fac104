use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ONE_BOX: &str = r#"[{"x1":10,"y1":10,"x2":50,"y2":60,"label":0,"conf":0.9}]"#;

/// Ground truth, a detection folder and an output location in one temp dir.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(images: &[(&str, i64)], detections: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let images: Vec<serde_json::Value> = images
            .iter()
            .map(|(name, id)| serde_json::json!({ "file_name": name, "id": id }))
            .collect();
        fs::write(
            dir.path().join("instances.json"),
            serde_json::json!({ "images": images, "annotations": [], "categories": [] })
                .to_string(),
        )
        .unwrap();

        fs::create_dir(dir.path().join("dets")).unwrap();
        for (name, content) in detections {
            fs::write(dir.path().join("dets").join(name), content).unwrap();
        }
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn output(&self) -> PathBuf {
        self.path("merged.json")
    }

    /// Command with the fixture's inputs and an isolated config.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("detmerge").unwrap();
        cmd.env("DETMERGE_CONFIG", self.path("no-config.toml"))
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--gt_json")
            .arg(self.path("instances.json"))
            .arg("--det_folder")
            .arg(self.path("dets"))
            .arg("--output_json")
            .arg(self.output());
        cmd
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn help_lists_flags() {
    let mut cmd = Command::cargo_bin("detmerge").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--gt_json"))
        .stdout(predicate::str::contains("--det_folder"))
        .stdout(predicate::str::contains("--img_suffix"))
        .stdout(predicate::str::contains("--output_json"))
        .stdout(predicate::str::contains("--no-eval"));
}

#[test]
fn required_flags_are_enforced() {
    let mut cmd = Command::cargo_bin("detmerge").unwrap();
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--gt_json"));

    let mut cmd = Command::cargo_bin("detmerge").unwrap();
    cmd.args(["--gt_json", "instances.json"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--det_folder"));
}

#[test]
fn kebab_case_aliases_are_accepted() {
    let fx = Fixture::new(&[("000001.jpg", 42)], &[("000001.json", ONE_BOX)]);
    let mut cmd = Command::cargo_bin("detmerge").unwrap();
    cmd.env("DETMERGE_CONFIG", fx.path("no-config.toml"))
        .arg("--gt-json")
        .arg(fx.path("instances.json"))
        .arg("--det-folder")
        .arg(fx.path("dets"))
        .arg("--output-json")
        .arg(fx.output())
        .arg("--no-eval")
        .assert()
        .success();
    assert!(fx.output().is_file());
}

#[test]
fn merge_only_writes_results_file() {
    let fx = Fixture::new(&[("000001.jpg", 42)], &[("000001.json", ONE_BOX)]);

    fx.cmd()
        .arg("--no-eval")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loading COCO annotations..."))
        .stdout(predicate::str::contains("Merging detections..."))
        .stdout(predicate::str::contains(
            "Total boxes merged: 1 | Files unmatched: 0",
        ))
        .stdout(predicate::str::contains("Saving merged detections file:"))
        .stdout(predicate::str::contains("Evaluating with COCO API...").not())
        .stdout(predicate::str::contains("Done."));

    // Coordinates are always written as floats, even for integer input.
    let merged = fs::read_to_string(fx.output()).unwrap();
    insta::assert_snapshot!(merged, @r#"[{"image_id":42,"category_id":1,"bbox":[10.0,10.0,40.0,50.0],"score":0.9}]"#);
}

#[test]
fn unmatched_file_warns_and_is_skipped() {
    let fx = Fixture::new(
        &[("000001.jpg", 42)],
        &[("000001.json", ONE_BOX), ("999999.json", ONE_BOX)],
    );

    fx.cmd()
        .arg("--no-eval")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Total boxes merged: 1 | Files unmatched: 1",
        ))
        .stderr(predicate::str::contains(
            "[WARN] 999999.jpg not found in GT. Skipped.",
        ));

    let merged = read_json(&fx.output());
    assert_eq!(merged.as_array().unwrap().len(), 1);
    assert_eq!(merged[0]["image_id"], 42);
}

#[test]
fn quiet_suppresses_warnings() {
    let fx = Fixture::new(&[], &[("999999.json", ONE_BOX)]);

    fx.cmd()
        .args(["--no-eval", "--quiet"])
        .assert()
        .success()
        .stderr(predicate::str::contains("999999.jpg").not());
}

#[test]
fn img_suffix_changes_lookup() {
    let fx = Fixture::new(&[("000001.png", 5)], &[("000001.json", ONE_BOX)]);

    fx.cmd()
        .args(["--no-eval", "--img_suffix", ".png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files unmatched: 0"));
    assert_eq!(read_json(&fx.output())[0]["image_id"], 5);
}

#[test]
fn config_file_supplies_defaults() {
    let fx = Fixture::new(&[("000001.png", 5)], &[("000001.json", ONE_BOX)]);
    let config = fx.path("config.toml");
    fs::write(&config, "[merge]\nimg_suffix = \".png\"\n").unwrap();

    fx.cmd()
        .env("DETMERGE_CONFIG", &config)
        .arg("--no-eval")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files unmatched: 0"));

    // The flag beats the config file.
    fx.cmd()
        .env("DETMERGE_CONFIG", &config)
        .args(["--no-eval", "--img_suffix", ".jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files unmatched: 1"));
}

#[test]
fn json_report_for_merge_only() {
    let fx = Fixture::new(
        &[("000001.jpg", 42)],
        &[("000001.json", ONE_BOX), ("999999.json", "null")],
    );

    let output = fx.cmd().args(["--no-eval", "--json"]).output().unwrap();
    assert!(output.status.success());

    let mut report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let written = report
        .as_object_mut()
        .unwrap()
        .remove("output_json")
        .unwrap();
    assert_eq!(written.as_str().map(PathBuf::from), Some(fx.output()));

    insta::assert_snapshot!(serde_json::to_string_pretty(&report).unwrap(), @r#"
    {
      "ap": null,
      "ap50": null,
      "ap75": null,
      "evaluated": false,
      "evaluated_images": 0,
      "matched_files": 1,
      "metrics": [],
      "total_boxes": 1,
      "unmatched_files": 1
    }
    "#);
}

#[test]
fn missing_evaluator_prints_install_hint() {
    let fx = Fixture::new(&[("000001.jpg", 42)], &[("000001.json", ONE_BOX)]);

    fx.cmd()
        .args(["--python", "/nonexistent/bin/python3"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please install pycocotools! (pip install pycocotools)",
        ))
        .stdout(predicate::str::contains("Merging detections...").not());
    assert!(!fx.output().exists());
}

#[test]
fn missing_evaluator_in_json_mode_reports_json() {
    let fx = Fixture::new(&[("000001.jpg", 42)], &[("000001.json", ONE_BOX)]);

    let output = fx
        .cmd()
        .args(["--python", "/nonexistent/bin/python3", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["evaluated"], false);
    assert_eq!(
        report["error"],
        "Please install pycocotools! (pip install pycocotools)"
    );
    assert!(!fx.output().exists());
}

#[test]
fn label_out_of_range_fails_the_run() {
    let fx = Fixture::new(
        &[("000001.jpg", 42)],
        &[(
            "000001.json",
            r#"[{"x1":0,"y1":0,"x2":1,"y2":1,"label":80,"conf":0.5}]"#,
        )],
    );

    fx.cmd()
        .arg("--no-eval")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: merging detections"))
        .stderr(predicate::str::contains("label 80"));
    assert!(!fx.output().exists());
}

#[test]
fn malformed_detection_file_fails_the_run() {
    let fx = Fixture::new(&[("000001.jpg", 42)], &[("000001.json", "[{")]);

    fx.cmd()
        .arg("--no-eval")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("malformed detection file"));
    assert!(!fx.output().exists());
}

#[test]
fn malformed_ground_truth_fails_the_run() {
    let fx = Fixture::new(&[], &[]);
    fs::write(fx.path("instances.json"), r#"{"annotations": []}"#).unwrap();

    fx.cmd()
        .arg("--no-eval")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: loading ground truth"));
}
