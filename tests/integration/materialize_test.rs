//! Load, compute, write and validate through the file adapters

use std::fs;

use crid_engine::config::MIN_COHORT;
use crid_engine::utils::test::SyntheticSnapshot;
use crid_engine::{
    ValidationReport, load_observations, load_weights, read_crid_records, write_crid_records,
};

use crate::utils::{test_engine, write_observations, write_weights_json};

fn snapshot() -> SyntheticSnapshot {
    SyntheticSnapshot::new(vec![12, 8, 15], 4)
        .with_missing_rate(0.02)
        .with_suppression_rate(0.01)
}

#[test]
fn test_materialize_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let observations_path = dir.path().join("observations.parquet");
    let weights_path = dir.path().join("weights.json");
    let output = dir.path().join("out").join("crid.parquet");

    let observations = snapshot().generate();
    write_observations(&observations_path, &observations).unwrap();
    write_weights_json(&weights_path).unwrap();

    let loaded = load_observations(&observations_path).unwrap();
    assert_eq!(loaded, observations);
    let weights = load_weights(&weights_path).unwrap();

    let run = test_engine(true).run(&loaded);
    write_crid_records(&output, &run.records).unwrap();

    let written = read_crid_records(&output).unwrap();
    assert_eq!(written, run.records);

    let report = ValidationReport::from_records(&written, Some(&weights), MIN_COHORT);
    assert_eq!(report.summary.total_rows, run.records.len());
    assert_eq!(report.summary.unique_facilities, 35);
    assert_eq!(report.summary.periods, 4);
    assert!(!report.has_warnings(), "{:?}", report.warnings);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("crid.parquet");
    let observations = snapshot().generate();

    write_crid_records(&output, &test_engine(true).run(&observations).records).unwrap();
    let first = fs::read(&output).unwrap();

    write_crid_records(&output, &test_engine(false).run(&observations).records).unwrap();
    let second = fs::read(&output).unwrap();

    assert_eq!(first, second);
    // only the target file remains
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_observations_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let observations = snapshot().generate();
    let (head, tail) = observations.split_at(observations.len() / 2);
    write_observations(&dir.path().join("part-0.parquet"), head).unwrap();
    write_observations(&dir.path().join("part-1.parquet"), tail).unwrap();

    let loaded = load_observations(dir.path()).unwrap();
    assert_eq!(loaded, observations);
}

#[test]
fn test_validation_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("crid.parquet");
    let report_path = dir.path().join("report.json");

    write_crid_records(&output, &test_engine(true).run(&snapshot().generate()).records).unwrap();
    let report = ValidationReport::from_records(&read_crid_records(&output).unwrap(), None, MIN_COHORT);
    report.write_json(&report_path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["summary"]["total_rows"], report.summary.total_rows);
    assert_eq!(json["completeness"].as_array().unwrap().len(), 4);
    assert!(json["weights"].as_array().unwrap().is_empty());
    assert!(report.to_string().contains("CRID MATERIALIZATION VALIDATION"));
}

#[test]
fn test_missing_weight_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");
    fs::write(
        &path,
        r#"[{"measure_code": "410", "crid_weight": 0.25, "crid_component": "MDS"}]"#,
    )
    .unwrap();
    assert!(load_weights(&path).unwrap_err().is_config());
}

#[test]
fn test_missing_output_fails_validation_read() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_crid_records(&dir.path().join("absent.parquet")).is_err());
}
