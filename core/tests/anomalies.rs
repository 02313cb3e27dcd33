//! Anomaly detection: minimum sample size, outlier ranking, alert
//! categorization and priority interventions.

use aghi_core::{
    anomaly_engine::{priority_interventions, AnomalyEngine, AnomalyType},
    config::{AnomalyConfig, EngineConfig, ScoringConfig},
    engine::GovernanceEngine,
    record::{Metric, Record},
    scorer::{PerformanceCategory, PillarScores, ScoredRecord, Scorer},
};
use chrono::NaiveDate;

fn jan() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

fn typical(i: usize) -> Record {
    let wobble = (i % 5) as f64;
    Record::new("Kerala", format!("District {i}"), jan())
        .with(Metric::EnrollmentSuccessRate, 90.0 + wobble)
        .with(Metric::UpdateSuccessRate, 88.0 + (i % 3) as f64)
        .with(Metric::PendingRatio, 8.0 + (i % 4) as f64)
        .with(Metric::TotalUpdates, 1_000.0 + 10.0 * wobble)
        .with(Metric::EnrollmentRejected, 40.0 + wobble)
        .with(Metric::EnrollmentTotal, 1_000.0)
        .with(Metric::DemoRejected, 20.0 + (i % 3) as f64)
        .with(Metric::BioRejected, 15.0 + (i % 2) as f64)
}

fn extreme() -> Record {
    Record::new("Bihar", "Outlier", jan())
        .with(Metric::EnrollmentSuccessRate, 20.0)
        .with(Metric::UpdateSuccessRate, 15.0)
        .with(Metric::PendingRatio, 85.0)
        .with(Metric::TotalUpdates, 9_000.0)
        .with(Metric::EnrollmentRejected, 700.0)
        .with(Metric::EnrollmentTotal, 1_000.0)
        .with(Metric::DemoRejected, 400.0)
        .with(Metric::BioRejected, 350.0)
}

fn scored(records: &[Record]) -> Vec<ScoredRecord> {
    Scorer::new(&ScoringConfig::default()).score(records)
}

fn fixed(aghi_score: f64, record: Record) -> ScoredRecord {
    ScoredRecord {
        record,
        pillars: PillarScores {
            operational_efficiency: aghi_score,
            data_health:            aghi_score,
            system_stability:       aghi_score,
        },
        aghi_score,
        performance_category: PerformanceCategory::from_score(aghi_score),
    }
}

/// Verify that a snapshot below the minimum sample size of 10 yields no anomalies.
#[test]
fn fewer_than_ten_records_yield_nothing() {
    let config = AnomalyConfig::default();
    let mut records: Vec<Record> = (0..8).map(typical).collect();
    records.push(extreme());

    let anomalies = AnomalyEngine::new(&config).detect(&scored(&records));
    assert!(anomalies.is_empty());
}

/// Verify that exactly 10 records are enough to fit the model and rank the extreme district first.
#[test]
fn exactly_ten_records_are_enough() {
    let config = AnomalyConfig::default();
    let mut records: Vec<Record> = (0..9).map(typical).collect();
    records.push(extreme());

    let anomalies = AnomalyEngine::new(&config).detect(&scored(&records));
    assert!(!anomalies.is_empty());
    assert_eq!(anomalies[0].scored.record.district, "Outlier");
    assert!(anomalies[0].anomaly_confidence < 0.0);
}

/// Verify that the extreme district ranks first and flagged records stay within contamination.
#[test]
fn extreme_region_is_the_most_anomalous() {
    let config = AnomalyConfig::default();
    let mut records: Vec<Record> = (0..19).map(typical).collect();
    records.push(extreme());

    let anomalies = AnomalyEngine::new(&config).detect(&scored(&records));
    assert!(!anomalies.is_empty());
    assert_eq!(anomalies[0].scored.record.district, "Outlier");
    assert!(anomalies.iter().all(|a| a.anomaly_confidence < 0.0));
    assert!(anomalies.len() <= 3, "flagged {} of 20", anomalies.len());

    // Most anomalous first.
    for pair in anomalies.windows(2) {
        assert!(pair[0].anomaly_confidence <= pair[1].anomaly_confidence);
    }
    assert_eq!(anomalies[0].anomaly_type, AnomalyType::CriticalPerformance);
    assert!(anomalies[0].alert_message.contains("Outlier (Bihar)"));
}

/// Verify that two runs over the same snapshot flag the same districts with the same confidences.
#[test]
fn detection_is_deterministic() {
    let config = AnomalyConfig::default();
    let mut records: Vec<Record> = (0..19).map(typical).collect();
    records.push(extreme());
    let snapshot = scored(&records);

    let engine = AnomalyEngine::new(&config);
    assert_eq!(engine.detect(&snapshot), engine.detect(&snapshot));
}

/// Verify that anomaly typing applies the ordered rules and stops at the first match.
#[test]
fn categorization_takes_first_matching_rule() {
    let config = AnomalyConfig::default();
    let engine = AnomalyEngine::new(&config);
    let base = || Record::new("Kerala", "Kollam", jan());

    assert_eq!(engine.categorize(&fixed(30.0, base())), AnomalyType::CriticalPerformance);
    assert_eq!(engine.categorize(&fixed(50.0, base())), AnomalyType::Underperforming);

    // Backlog outranks rejections when both apply.
    let both = base()
        .with(Metric::PendingRatio, 60.0)
        .with(Metric::EnrollmentRejected, 400.0)
        .with(Metric::EnrollmentTotal, 1_000.0);
    assert_eq!(engine.categorize(&fixed(70.0, both)), AnomalyType::HighBacklog);

    let rejections = base()
        .with(Metric::EnrollmentRejected, 400.0)
        .with(Metric::EnrollmentTotal, 1_000.0);
    assert_eq!(engine.categorize(&fixed(70.0, rejections)), AnomalyType::HighRejectionRate);

    // Without a total the rejected count is compared against 1.
    let no_total = base().with(Metric::EnrollmentRejected, 5.0);
    assert_eq!(engine.categorize(&fixed(70.0, no_total)), AnomalyType::HighRejectionRate);

    assert_eq!(engine.categorize(&fixed(70.0, base())), AnomalyType::OperationalAnomaly);
}

/// Verify that detection falls back to the leading numeric columns when no configured feature is present.
#[test]
fn fallback_features_used_when_allow_list_is_absent() {
    let config = AnomalyConfig {
        features: vec!["not_a_column".to_string()],
        ..AnomalyConfig::default()
    };
    let engine = AnomalyEngine::new(&config);
    let snapshot = scored(&[typical(0), typical(1)]);

    let features = engine.select_features(&snapshot);
    assert_eq!(features.len(), 8);
    assert_eq!(features[0], "enrollment_total");
    assert!(!features.contains(&"not_a_column".to_string()));
}

/// Verify that priority interventions are capped at top_n and carry a recommended action.
#[test]
fn priority_interventions_carry_actions() {
    let config = AnomalyConfig::default();
    let mut records: Vec<Record> = (0..19).map(typical).collect();
    records.push(extreme());
    let anomalies = AnomalyEngine::new(&config).detect(&scored(&records));

    let top = priority_interventions(&anomalies, 1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].district, "Outlier");
    assert_eq!(top[0].recommended_action, AnomalyType::CriticalPerformance.recommended_action());

    assert!(priority_interventions(&[], 5).is_empty());
}

/// Verify that the anomaly report derives its interventions from the anomalies it returns.
#[test]
fn report_interventions_come_from_the_reported_anomalies() {
    let mut records: Vec<Record> = (0..19).map(typical).collect();
    records.push(extreme());
    let engine = GovernanceEngine::with_records(EngineConfig::default(), records).expect("engine");

    let report = engine.anomaly_report(2);
    assert!(!report.anomalies.is_empty());
    assert_eq!(report.priority_interventions, priority_interventions(&report.anomalies, 2));
    assert_eq!(report.priority_interventions[0].district, "Outlier");
    assert_eq!(engine.priority_interventions(2), report.priority_interventions);
}
