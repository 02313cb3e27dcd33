//! Composite scoring: normalization policy, pillar fallback, bands and
//! the national summary.

use aghi_core::{
    config::ScoringConfig,
    error::EngineError,
    record::{Metric, Record},
    scorer::{resilience_index, summarize, PerformanceCategory, Scorer},
};
use chrono::NaiveDate;

fn jan() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn district(
    state: &str,
    name: &str,
    success: f64,
    update_success: f64,
    pending: f64,
    rejection: f64,
    imbalance: f64,
    per_enrollment: f64,
) -> Record {
    Record::new(state, name, jan())
        .with(Metric::EnrollmentSuccessRate, success)
        .with(Metric::UpdateSuccessRate, update_success)
        .with(Metric::PendingRatio, pending)
        .with(Metric::EnrollmentRejectionRate, rejection)
        .with(Metric::GovernanceImbalance, imbalance)
        .with(Metric::TotalUpdatesPerEnrollment, per_enrollment)
        .with(Metric::YouthCoverageRatio, 30.0)
}

fn pair() -> Vec<Record> {
    vec![
        district("Kerala", "Kollam", 90.0, 95.0, 5.0, 5.0, 5.0, 2.0),
        district("Bihar", "Gaya", 50.0, 60.0, 40.0, 30.0, 35.0, 1.0),
    ]
}

/// Verify that each performance band includes its upper edge.
#[test]
fn band_edges_are_upper_inclusive() {
    assert_eq!(PerformanceCategory::from_score(0.0), PerformanceCategory::Critical);
    assert_eq!(PerformanceCategory::from_score(40.0), PerformanceCategory::Critical);
    assert_eq!(PerformanceCategory::from_score(40.01), PerformanceCategory::NeedsImprovement);
    assert_eq!(PerformanceCategory::from_score(60.0), PerformanceCategory::NeedsImprovement);
    assert_eq!(PerformanceCategory::from_score(60.5), PerformanceCategory::Good);
    assert_eq!(PerformanceCategory::from_score(80.0), PerformanceCategory::Good);
    assert_eq!(PerformanceCategory::from_score(80.01), PerformanceCategory::Excellent);
    assert_eq!(PerformanceCategory::from_score(100.0), PerformanceCategory::Excellent);
}

/// Verify that the composite is the weighted sum of the record's own pillar scores.
#[test]
fn composite_is_weighted_sum_of_record_pillars() {
    let config = ScoringConfig::default();
    let scored = Scorer::new(&config).score(&pair());

    // Kollam: efficiency mean(100, 95), health mean(100, 100), stability 95.
    let kollam = &scored[0];
    assert!((kollam.pillars.operational_efficiency - 97.5).abs() < 1e-9);
    assert!((kollam.pillars.data_health - 100.0).abs() < 1e-9);
    assert!((kollam.pillars.system_stability - 95.0).abs() < 1e-9);
    assert!((kollam.aghi_score - 97.75).abs() < 1e-9);
    assert_eq!(kollam.performance_category, PerformanceCategory::Excellent);

    // Gaya: efficiency mean(0, 60), health 0, stability mean(60, 70, 65).
    let gaya = &scored[1];
    assert!((gaya.aghi_score - 28.25).abs() < 1e-9);
    assert_eq!(gaya.performance_category, PerformanceCategory::Critical);
}

/// Verify that all scores stay within [0, 100] and rescoring gives the same result.
#[test]
fn scores_stay_in_range_and_scoring_is_idempotent() {
    let config = ScoringConfig::default();
    let scorer = Scorer::new(&config);
    let mut records = pair();
    records.push(district("Goa", "Panaji", 150.0, -20.0, 180.0, 250.0, 0.0, 9.0));

    let first = scorer.score(&records);
    let second = scorer.score(&records);
    assert_eq!(first, second);

    for r in &first {
        assert!((0.0..=100.0).contains(&r.aghi_score), "{} out of range", r.aghi_score);
        for score in [r.pillars.operational_efficiency, r.pillars.data_health, r.pillars.system_stability] {
            assert!((0.0..=100.0).contains(&score));
        }
    }
    // Input is never mutated.
    assert_eq!(first[2].record, records[2]);
}

/// Verify that a pillar with none of its indicators present scores the neutral 50.
#[test]
fn pillar_without_indicators_is_neutral() {
    let config = ScoringConfig::default();
    let records = vec![
        Record::new("Kerala", "Kollam", jan()).with(Metric::EnrollmentSuccessRate, 90.0),
        Record::new("Kerala", "Kochi", jan()).with(Metric::EnrollmentSuccessRate, 70.0),
    ];
    let scored = Scorer::new(&config).score(&records);

    for r in &scored {
        assert_eq!(r.pillars.data_health, 50.0);
        assert_eq!(r.pillars.system_stability, 50.0);
    }
    assert_eq!(scored[0].pillars.operational_efficiency, 100.0);
    assert_eq!(scored[1].pillars.operational_efficiency, 0.0);
    assert!((scored[0].aghi_score - (40.0 + 17.5 + 12.5)).abs() < 1e-9);
}

/// Verify that a benefit indicator without spread normalizes to 50 for every record.
#[test]
fn identical_benefit_values_normalize_to_midpoint() {
    let config = ScoringConfig::default();
    let records = vec![
        Record::new("Kerala", "Kollam", jan()).with(Metric::UpdateSuccessRate, 80.0),
        Record::new("Kerala", "Kochi", jan()).with(Metric::UpdateSuccessRate, 80.0),
    ];
    let scored = Scorer::new(&config).score(&records);
    assert!(scored.iter().all(|r| r.pillars.data_health == 50.0));
}

/// Verify that NaN and infinite values are treated as absent during normalization.
#[test]
fn non_finite_values_count_as_absent() {
    let config = ScoringConfig::default();
    let records = vec![
        Record::new("Kerala", "Kollam", jan()).with(Metric::PendingRatio, f64::NAN),
        Record::new("Kerala", "Kochi", jan()).with(Metric::PendingRatio, 10.0),
    ];
    let scored = Scorer::new(&config).score(&records);
    assert_eq!(scored[0].pillars.system_stability, 50.0);
    assert_eq!(scored[1].pillars.system_stability, 90.0);
}

/// Verify that the summary reports top and bottom districts, band counts and metric means.
#[test]
fn summary_reports_extremes_and_counts() {
    let config = ScoringConfig::default();
    let scored = Scorer::new(&config).score(&pair());
    let summary = summarize(&scored).expect("summary");

    assert_eq!(summary.top_district, "Kollam");
    assert_eq!(summary.bottom_district, "Gaya");
    assert_eq!(summary.top_pillar, "Health");
    assert_eq!(summary.total_districts, 2);
    assert_eq!(summary.excellent_performers, 1);
    assert_eq!(summary.critical_performers, 1);
    assert!((summary.national_aghi - 63.0).abs() < 1e-9);
    assert!((summary.avg_enrollment_rate - 70.0).abs() < 1e-9);
    assert!((summary.inclusion_rate - 30.0).abs() < 1e-9);
    assert!(summary.resilience_index < 100.0);
    assert_eq!(summary.monthly_change, 0.0);
}

/// Verify that resilience is 100 minus the sample coefficient of variation in percent.
#[test]
fn resilience_is_one_hundred_minus_the_coefficient_of_variation() {
    // Mean 50, sample std sqrt(200).
    let expected = 100.0 - 200f64.sqrt() / 50.0 * 100.0;
    assert!((resilience_index(&[40.0, 60.0]) - expected).abs() < 1e-9);
    assert!((resilience_index(&[40.0, 60.0]) - 71.715_728_752_5).abs() < 1e-6);
    assert_eq!(resilience_index(&[70.0, 70.0, 70.0]), 100.0);
}

/// Verify that resilience is 50 when the mean is zero or there are no scores.
#[test]
fn resilience_without_a_positive_mean_is_neutral() {
    assert_eq!(resilience_index(&[0.0, 0.0]), 50.0);
    assert_eq!(resilience_index(&[]), 50.0);
}

/// Verify that summarizing an empty snapshot fails with EmptySnapshot.
#[test]
fn summary_of_empty_snapshot_is_an_error() {
    assert!(matches!(summarize(&[]), Err(EngineError::EmptySnapshot)));
}
