//! # Configuration Tests
//!
//! Defaults, partial JSON, file loading and validation.

use std::io::Write;

use pretty_assertions::assert_eq;
use rstest::rstest;
use sniper_timing::common::ConfigError;
use sniper_timing::config::{BranchPredictorKind, Config, ReplacementPolicy, TimingModel};

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.core.model, TimingModel::RobSmt);
    assert_eq!(config.core.smt_threads, 1);
    assert_eq!(config.core.dispatch_width, 4);
    assert_eq!(config.core.window_size, 128);
    assert_eq!(config.rob_timer.commit_width, 4);
    assert_eq!(config.rob_timer.rs_entries, 36);
    assert!(config.rob_timer.store_to_load_forwarding);
    assert!(!config.rob_timer.in_order);
    assert_eq!(config.branch_predictor.mispredict_penalty, 8);
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_json_is_the_default() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.core.window_size, Config::default().core.window_size);
    assert_eq!(config.memory.dram_latency, Config::default().memory.dram_latency);
}

#[test]
fn test_nested_json_overrides() {
    let json = r#"{
        "core": { "frequency_ghz": 3.0, "window_size": 64 },
        "memory": { "l1_d": { "enabled": true, "policy": "FIFO", "latency": 2 } },
        "branch_predictor": { "kind": "None" }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.core.window_size, 64);
    assert!((config.core.frequency_ghz - 3.0).abs() < f64::EPSILON);
    assert_eq!(config.memory.l1_d.policy, ReplacementPolicy::Fifo);
    assert_eq!(config.memory.l1_d.latency, 2);
    assert_eq!(config.branch_predictor.kind, BranchPredictorKind::None);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "core": {{ "model": "Magic" }} }}"#).unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.core.model, TimingModel::Magic);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let err = Config::from_json(r#"{ "core": { "window_size": "big" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[rstest]
#[case(r#"{ "core": { "dispatch_width": 0 } }"#, "core.dispatch_width")]
#[case(r#"{ "core": { "window_size": 0 } }"#, "core.window_size")]
#[case(r#"{ "core": { "window_size": 2, "dispatch_width": 4 } }"#, "core.window_size")]
#[case(r#"{ "core": { "smt_threads": 0 } }"#, "core.smt_threads")]
#[case(r#"{ "core": { "frequency_ghz": 0.0 } }"#, "core.frequency_ghz")]
#[case(r#"{ "rob_timer": { "commit_width": 0 } }"#, "rob_timer.commit_width")]
#[case(r#"{ "branch_predictor": { "btb_size": 100 } }"#, "branch_predictor.btb_size")]
fn test_validation_rejects(#[case] json: &str, #[case] expected: &str) {
    match Config::from_json(json) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected invalid {expected}, got {other:?}"),
    }
}
