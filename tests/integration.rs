//! End-to-end tests that drive the compiled `pricectl` binary.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use common::{config_toml, sorted_rows, tar_archive, zip_archive, zip_entries, HEADER, TWO_TOOLS};

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_path = config_dir.join("prices.toml");
    fs::write(&config_path, config_toml(&root, "127.0.0.1:0", extra)).unwrap();

    (tmp, config_path)
}

fn run_pricectl(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_pricectl");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pricectl at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn export_rows(tmp: &TempDir, config_path: &Path) -> Vec<String> {
    let out = tmp.path().join("out").join("data.zip");
    let (stdout, stderr, success) =
        run_pricectl(config_path, &["export", "--output", out.to_str().unwrap()]);
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);

    let entries = zip_entries(&fs::read(&out).unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "data.csv");
    assert!(entries[0].1.starts_with(HEADER));
    sorted_rows(&entries[0].1)
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_pricectl(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_pricectl(&config_path, &["init"]);
    assert!(success, "Second init failed (not idempotent)");
}

#[test]
fn test_import_zip_prints_summary() {
    let (tmp, config_path) = setup_test_env("");
    let archive = write_file(
        tmp.path(),
        "upload.zip",
        &zip_archive(&[("data.csv", TWO_TOOLS)]),
    );

    let (stdout, stderr, success) =
        run_pricectl(&config_path, &["import", archive.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);

    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["total_items"], 2);
    assert_eq!(summary["total_categories"], 1);
    assert_eq!(summary["total_price"].as_f64(), Some(29.98));
}

#[test]
fn test_import_tar_then_export_round_trip() {
    let (tmp, config_path) = setup_test_env("");
    let archive = write_file(
        tmp.path(),
        "upload.tar",
        &tar_archive(&[("README", "not csv"), ("prices/data.csv", TWO_TOOLS)]),
    );

    let (stdout, stderr, success) = run_pricectl(
        &config_path,
        &["import", archive.to_str().unwrap(), "--type", "tar"],
    );
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);

    assert_eq!(
        export_rows(&tmp, &config_path),
        vec![
            "Gadget,Tools,19.99,2024-01-16".to_string(),
            "Widget,Tools,9.99,2024-01-15".to_string(),
        ]
    );
}

#[test]
fn test_rejected_archive_leaves_store_empty() {
    let (tmp, config_path) = setup_test_env("");
    let bad = format!(
        "{}Widget,Tools,9.99,2024-01-15\nGadget,Tools,abc,2024-01-16\n",
        HEADER
    );
    let archive = write_file(tmp.path(), "bad.zip", &zip_archive(&[("data.csv", &bad)]));

    let (_, stderr, success) = run_pricectl(&config_path, &["import", archive.to_str().unwrap()]);
    assert!(!success, "import of invalid price should fail");
    assert!(stderr.contains("invalid price"), "stderr={}", stderr);

    assert!(export_rows(&tmp, &config_path).is_empty());
}

#[test]
fn test_negative_price_rolls_back_batch() {
    let (tmp, config_path) = setup_test_env("");
    let csv = format!(
        "{}Widget,Tools,9.99,2024-01-15\nRefund,Tools,-5.00,2024-01-16\n",
        HEADER
    );
    let archive = write_file(tmp.path(), "neg.zip", &zip_archive(&[("data.csv", &csv)]));

    let (_, stderr, success) = run_pricectl(&config_path, &["import", archive.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("rolled back"), "stderr={}", stderr);

    assert!(export_rows(&tmp, &config_path).is_empty());
}

#[test]
fn test_leading_id_column_configuration() {
    let (tmp, config_path) = setup_test_env(
        "[csv]\ncolumns = [\"id\", \"name\", \"category\", \"price\", \"create_date\"]\n",
    );
    let csv = "id,name,category,price,create_date\n\
               1,Widget,Tools,9.99,2024-01-15\n\
               2,Apple,Food,0.50,2024-01-16\n";
    let archive = write_file(tmp.path(), "ids.zip", &zip_archive(&[("data.csv", csv)]));

    let (stdout, stderr, success) =
        run_pricectl(&config_path, &["import", archive.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);

    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["total_categories"], 2);

    assert_eq!(
        export_rows(&tmp, &config_path),
        vec![
            "Apple,Food,0.50,2024-01-16".to_string(),
            "Widget,Tools,9.99,2024-01-15".to_string(),
        ]
    );
}

#[test]
fn test_stats_reports_categories() {
    let (tmp, config_path) = setup_test_env("");
    let archive = write_file(
        tmp.path(),
        "upload.zip",
        &zip_archive(&[("data.csv", TWO_TOOLS)]),
    );
    run_pricectl(&config_path, &["import", archive.to_str().unwrap()]);

    let (stdout, stderr, success) = run_pricectl(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Items:       2"));
    assert!(stdout.contains("Categories:  1"));
    assert!(stdout.contains("29.98"));
    assert!(stdout.contains("Tools"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (_tmp, config_path) = setup_test_env("[csv]\ncolumns = [\"name\", \"price\"]\n");
    let (_, stderr, success) = run_pricectl(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("csv.columns"), "stderr={}", stderr);
}
