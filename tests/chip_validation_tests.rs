//! Chip-distribution validation against the cost estimate.
//!
//! The failure scenario: cheap aggressive accumulation while the bulk of
//! turnover happens far above — the cost estimate no longer describes
//! where shares reside and must be flagged.

use capital_tracker::prelude::*;
use chrono::NaiveDate;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

#[test]
fn test_cost_far_from_peak_is_invalid() {
    let mut ticks = Vec::new();

    // Aggressive accumulation near 10.02 that dominates the weighted
    // cost: one qualifying buy program.
    for i in 0..6 {
        ticks.push(
            Tick::new(i * 1_000, "600000", 10.02, 10_000, 100_200.0, Direction::Buy)
                .with_quote(10.01, 300, 10.02, 400),
        );
    }

    // The bulk of the session's turnover sits at 13.00 — ten times the
    // per-print volume, fifty prints.
    for i in 0..50 {
        ticks.push(Tick::new(
            10_000 + i * 200,
            "600000",
            13.00,
            100_000,
            1_300_000.0,
            Direction::Neutral,
        ));
    }

    let analyzer = SessionAnalyzer::new(AnalysisConfig::default()).unwrap();
    let result = analyzer.analyze_day("600000", date(), &ticks, &[], None);

    assert!((result.weighted_cost - 10.02).abs() < 1e-9);
    let peak = result.chip_peak_price.expect("distribution has a peak");
    assert!((peak - 13.00).abs() < 0.05);
    // |10.02 − ~13.00| / ~13.00 ≈ 0.23 > 0.20
    assert_eq!(result.validation_status, ValidationStatus::Invalid);
}

#[test]
fn test_cost_near_peak_is_valid() {
    let mut ticks = Vec::new();
    for i in 0..6 {
        ticks.push(
            Tick::new(i * 1_000, "600000", 10.02, 10_000, 100_200.0, Direction::Buy)
                .with_quote(10.01, 300, 10.02, 400),
        );
    }
    // Turnover concentrated around the same band as the accumulation.
    for i in 0..50 {
        ticks.push(Tick::new(
            10_000 + i * 200,
            "600000",
            10.40,
            100_000,
            1_040_000.0,
            Direction::Neutral,
        ));
    }

    let analyzer = SessionAnalyzer::new(AnalysisConfig::default()).unwrap();
    let result = analyzer.analyze_day("600000", date(), &ticks, &[], None);

    assert!((result.weighted_cost - 10.02).abs() < 1e-9);
    // |10.02 − ~10.40| / 10.40 ≈ 0.037 < 0.20
    assert_eq!(result.validation_status, ValidationStatus::Valid);
}

#[test]
fn test_empty_distribution_has_no_evidence() {
    let analyzer = ChipAnalyzer::from_config(&AnalysisConfig::default());
    let build = analyzer.build_distribution(&[]);
    assert_eq!(
        analyzer.validate_cost(10.0, &build.distribution),
        ValidationStatus::Valid
    );
}

#[test]
fn test_concentration_stays_in_unit_interval() {
    let analyzer = ChipAnalyzer::from_config(&AnalysisConfig::default());

    // Widely scattered turnover.
    let scattered: Vec<Tick> = (0..200)
        .map(|i| {
            let price = 10.0 + (i as f64) * 0.005;
            Tick::new(i, "600000", price, 1_000, price * 1_000.0, Direction::Buy)
        })
        .collect();
    let build = analyzer.build_distribution(&scattered);
    let ratio = analyzer.concentration_ratio(&build.distribution);
    assert!((0.0..=1.0).contains(&ratio));

    // Everything in one bucket.
    let focused: Vec<Tick> = (0..200)
        .map(|i| Tick::new(i, "600000", 10.0, 1_000, 10_000.0, Direction::Buy))
        .collect();
    let build = analyzer.build_distribution(&focused);
    assert!((analyzer.concentration_ratio(&build.distribution) - 1.0).abs() < 1e-12);
}

#[test]
fn test_migration_tracks_center_shift_across_sessions() {
    let analyzer = ChipAnalyzer::from_config(&AnalysisConfig::default());

    let monday: Vec<Tick> = (0..50)
        .map(|i| {
            let price = 10.0 + (i % 5) as f64 * 0.01;
            Tick::new(i, "600000", price, 1_000, price * 1_000.0, Direction::Buy)
        })
        .collect();
    let friday: Vec<Tick> = (0..50)
        .map(|i| {
            let price = 11.5 + (i % 5) as f64 * 0.01;
            Tick::new(i, "600000", price, 1_000, price * 1_000.0, Direction::Buy)
        })
        .collect();

    let old = analyzer.build_distribution(&monday).distribution;
    let new = analyzer.build_distribution(&friday).distribution;
    let migration = ChipMigration::between(&old, &new);

    assert_eq!(migration.direction, MigrationDirection::Upward);
    assert!(migration.ratio > 0.1);
    assert!(migration.new_center > migration.old_center);
}
