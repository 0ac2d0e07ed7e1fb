use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECEIPT: &str = r#"[
    {"text": "PERTAMINA", "confidence": 0.98, "bbox": [10, 10, 200, 30]},
    {"text": "Jl. Sudirman No.1", "confidence": 0.95, "bbox": [10, 40, 220, 60]},
    {"text": "24/06/2023 14:30", "confidence": 0.93, "bbox": [10, 70, 220, 90]},
    {"text": "Subtotal", "confidence": 0.96, "bbox": [10, 100, 100, 120]},
    {"text": "25,000", "confidence": 0.97, "bbox": [150, 100, 220, 120]},
    {"text": "Tax", "confidence": 0.96, "bbox": [10, 130, 60, 150]},
    {"text": "2,500", "confidence": 0.97, "bbox": [150, 130, 220, 150]},
    {"text": "Total", "confidence": 0.99, "bbox": [10, 160, 80, 180]},
    {"text": "27,500", "confidence": 0.98, "bbox": [150, 160, 220, 180]}
]"#;

fn rcpt(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

/// Temp dir holding a default config file, so the user's own config is ignored.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), "{}").unwrap();
    dir
}

#[test]
fn test_process_json() {
    let dir = workspace();
    let input = dir.path().join("receipt.json");
    fs::write(&input, RECEIPT).unwrap();

    let output = rcpt(&dir.path().join("config.json"))
        .arg("process")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["merchant_name"], "PERTAMINA");
    assert_eq!(json["transaction_date"], "2023-06-24");
    assert_eq!(json["total_amount_raw"], "27,500");
    assert_eq!(json["total_amount_value"], 27500.0);
    assert!(json["confidence_score"].as_f64().unwrap() > 0.0);
    assert!(json.get("diagnostics").is_none());
}

#[test]
fn test_process_debug_includes_diagnostics() {
    let dir = workspace();
    let input = dir.path().join("receipt.json");
    fs::write(&input, RECEIPT).unwrap();

    let output = rcpt(&dir.path().join("config.json"))
        .args(["process", "--debug"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let raw_text = json["diagnostics"]["raw_text"].as_str().unwrap();
    assert!(raw_text.starts_with("PERTAMINA\n"));
    assert_eq!(json["diagnostics"]["transaction_date_raw"], "24/06/2023");
}

#[test]
fn test_process_csv_and_text() {
    let dir = workspace();
    let input = dir.path().join("receipt.json");
    fs::write(&input, RECEIPT).unwrap();
    let config = dir.path().join("config.json");

    rcpt(&config)
        .args(["process", "--format", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("merchant_name,transaction_date"))
        .stdout(predicate::str::contains("PERTAMINA,2023-06-24,\"27,500\",27500"));

    rcpt(&config)
        .args(["process", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Merchant: PERTAMINA"))
        .stdout(predicate::str::contains("Total:    27,500 (27,500)"));
}

#[test]
fn test_process_paddle_lines() {
    let dir = workspace();
    let input = dir.path().join("paddle.json");
    fs::write(
        &input,
        r#"[
            [[[0, 0], [120, 0], [120, 20], [0, 20]], ["INDOMARET", 0.97]],
            [[[0, 30], [120, 30], [120, 50], [0, 50]], ["11/01/2026", 0.95]],
            [[[0, 60], [60, 60], [60, 80], [0, 80]], ["TOTAL", 0.96]],
            [[[100, 60], [200, 60], [200, 80], [100, 80]], ["Rp 15.000", 0.91]]
        ]"#,
    )
    .unwrap();

    let output = rcpt(&dir.path().join("config.json"))
        .arg("process")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["merchant_name"], "INDOMARET");
    assert_eq!(json["transaction_date"], "2026-01-11");
    assert_eq!(json["total_amount_raw"], "Rp 15.000");
    assert_eq!(json["total_amount_value"], 15000.0);
}

#[test]
fn test_process_empty_receipt_reports_nulls() {
    let dir = workspace();
    let input = dir.path().join("empty.json");
    fs::write(&input, "[]").unwrap();

    let output = rcpt(&dir.path().join("config.json"))
        .arg("process")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["merchant_name"].is_null());
    assert!(json["transaction_date"].is_null());
    assert!(json["total_amount_raw"].is_null());
    assert!(json["total_amount_value"].is_null());
    assert_eq!(json["confidence_score"], 0.0);
}

#[test]
fn test_process_rejects_invalid_input() {
    let dir = workspace();
    let input = dir.path().join("broken.json");
    fs::write(&input, "not json").unwrap();

    rcpt(&dir.path().join("config.json"))
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid image"));
}

#[test]
fn test_process_missing_file() {
    let dir = workspace();
    rcpt(&dir.path().join("config.json"))
        .args(["process", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_with_summary() {
    let dir = workspace();
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.json"), RECEIPT).unwrap();
    fs::write(inputs.join("b.json"), "[]").unwrap();
    fs::write(inputs.join("c.json"), "{oops").unwrap();

    let pattern = format!("{}/*.json", inputs.display());

    rcpt(&dir.path().join("config.json"))
        .args(["batch", "--summary", "--continue-on-error", "-j", "2"])
        .arg(&pattern)
        .arg("--output-dir")
        .arg(&outputs)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 1 failed"));

    assert!(outputs.join("a.json").exists());
    assert!(outputs.join("b.json").exists());
    assert!(!outputs.join("c.json").exists());

    let summary = fs::read_to_string(outputs.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("a.json,success,PERTAMINA,2023-06-24"));
    assert!(lines[3].starts_with("c.json,error"));
}

#[test]
fn test_batch_stops_on_error() {
    let dir = workspace();
    fs::write(dir.path().join("bad.json"), "{oops").unwrap();
    let pattern = format!("{}/bad*.json", dir.path().display());

    rcpt(&dir.path().join("config.json"))
        .arg("batch")
        .arg(&pattern)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("rcpt.json");

    rcpt(&config).args(["config", "init"]).assert().success();
    assert!(config.exists());

    rcpt(&config)
        .args(["config", "get", "extraction.merchant.top_n"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    rcpt(&config)
        .args(["config", "set", "extraction.merchant.top_n", "3"])
        .assert()
        .success();

    rcpt(&config)
        .args(["config", "get", "extraction.merchant.top_n"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));

    rcpt(&config)
        .args(["config", "set", "extraction.merchant.top_n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_n"));

    rcpt(&config)
        .args(["config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure();

    rcpt(&config).args(["config", "validate"]).assert().success();
}
