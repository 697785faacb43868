//! Command-line options of the materialization binary

use std::path::PathBuf;

use crid_engine::{RunMode, RunOptions, VolatilityWindow};

fn args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}

#[test]
fn test_full_materialize_command() {
    let options = RunOptions::parse_with_env(
        &args("--observations obs --weights w.json --output out.parquet --sequential --report-json r.json"),
        None,
    )
    .unwrap()
    .unwrap();
    assert_eq!(options.mode, RunMode::Materialize);
    assert_eq!(options.volatility_window, VolatilityWindow::Three);
    assert!(options.sequential);
    assert_eq!(options.report_json, Some(PathBuf::from("r.json")));
}

#[test]
fn test_dry_run_still_needs_inputs() {
    assert!(RunOptions::parse_with_env(&args("--output o --dry-run"), None).is_err());
    let options = RunOptions::parse_with_env(
        &args("--output o --dry-run --observations a --weights b"),
        None,
    )
    .unwrap()
    .unwrap();
    assert_eq!(options.mode, RunMode::DryRun);
}

#[test]
fn test_window_flag_beats_environment() {
    let options = RunOptions::parse_with_env(
        &args("--output o --validate --volatility-window=3"),
        Some("4".into()),
    )
    .unwrap()
    .unwrap();
    assert_eq!(options.volatility_window, VolatilityWindow::Three);
}

#[test]
fn test_invalid_window_is_config_error_even_with_other_problems() {
    // window is checked before the missing inputs
    let err = RunOptions::parse_with_env(&args("--output o --volatility-window 7"), None).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains('7'));
}

#[test]
fn test_help_and_unknown_flags() {
    assert!(RunOptions::parse_with_env(&args("--help"), None).unwrap().is_none());
    assert!(RunOptions::parse_with_env(&args("--output o --validate --frobnicate"), None).is_err());
}
