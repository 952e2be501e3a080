//! Command-line behaviour of the `pmug` binary.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

fn pmug(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pmug"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pmug")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "pmug failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn convert_prints_pixel_matrix() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("art.json"),
        r##"{"image_data": [["#ff0000", "#00ff00"], ["#0000ff", "#ffffff"]]}"##,
    )
    .unwrap();

    let output = pmug(dir.path(), &["convert", "art.json", "--width", "2", "--height", "2"]);
    let report = stdout_json(&output);

    assert_eq!(report["width"], 2);
    assert_eq!(report["totalPixels"], 4);
    assert_eq!(report["inputFormat"], "hex-grid");
    assert_eq!(report["pixelMatrix"][0][1], "#00ff00");
    assert_eq!(report["pixelMatrix"][1][1], "#ffffff");
}

#[test]
fn convert_rejects_bad_hex() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.json"), r##"[["#GG0000"]]"##).unwrap();

    let output = pmug(dir.path(), &["convert", "bad.json", "--width", "1", "--height", "1"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn colours_are_deterministic_per_seed() {
    let dir = tempfile::tempdir().unwrap();

    let first = stdout_json(&pmug(dir.path(), &["colours", "--seed", "lamp"]));
    let second = stdout_json(&pmug(dir.path(), &["colours", "--seed", "lamp"]));

    assert_eq!(first, second);
    assert_eq!(first["seed"], "lamp");
    assert_ne!(first["text"], first["background"]);
}

#[test]
fn send_image_without_store_writes_outbox() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pmug.yaml"),
        "outbox: sent.jsonl\nlogging:\n  level: warn\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("dot.json"), r##"[["#123456"]]"##).unwrap();

    let output = pmug(
        dir.path(),
        &[
            "send-image",
            "dot.json",
            "--product",
            "P-1",
            "--device",
            "lamp",
            "--width",
            "1",
            "--height",
            "1",
        ],
    );
    let report = stdout_json(&output);

    // No store root configured, so the payload travels with the command.
    assert_eq!(report["status"], "success");
    assert_eq!(report["deliveryMethod"], "direct");
    assert_eq!(report["command"]["url"], "direct_transmission");

    let outbox = std::fs::read_to_string(dir.path().join("sent.jsonl")).unwrap();
    assert_eq!(outbox.lines().count(), 1);
    let record: Value = serde_json::from_str(outbox.trim()).unwrap();
    assert_eq!(record["deviceName"], "lamp");
    assert!(record["payloadBase64"].is_string());
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pmug.yaml"), "ttl_seconds: 0\n").unwrap();

    let output = pmug(dir.path(), &["colours", "--seed", "x"]);
    assert!(!output.status.success());
}
