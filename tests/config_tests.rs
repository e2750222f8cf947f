//! Configuration round-trip and validation tests.

use capital_tracker::{AnalysisConfig, SessionAnalyzer, WeightMap};
use tempfile::tempdir;

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("analysis.toml");

    let config = AnalysisConfig::default()
        .with_window_sec(60)
        .with_synthetic_threshold(750_000.0)
        .with_wall_threshold(20_000);
    config.save_toml(&path).unwrap();

    let loaded = AnalysisConfig::load_toml(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("analysis.json");

    let mut weights = WeightMap::default();
    weights.aggressive = 2.0;
    let config = AnalysisConfig::default().with_weights(weights);
    config.save_json(&path).unwrap();

    let loaded = AnalysisConfig::load_json(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.weights.aggressive, 2.0);
}

#[test]
fn test_load_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "window_sec = 0\n").unwrap();
    assert!(AnalysisConfig::load_toml(&path).is_err());
}

#[test]
fn test_analyzer_rejects_invalid_config_at_startup() {
    let mut config = AnalysisConfig::default();
    config.ma_periods = vec![];
    let err = SessionAnalyzer::new(config).unwrap_err();
    assert!(err.to_string().contains("configuration"));
}

#[test]
fn test_weight_overrides_reach_the_pipeline() {
    let mut weights = WeightMap::default();
    weights.algo = 0.0; // disqualify algorithmic orders entirely
    let config = AnalysisConfig::default().with_weights(weights);
    let analyzer = SessionAnalyzer::new(config).unwrap();
    assert_eq!(analyzer.weights().algo, 0.0);
}
