//! Operations view: rejection shares, watchlist ordering and status bands,
//! and summed volumes in the trend series.

use aghi_core::{
    error::EngineError,
    operations::{operations_report, rejection_breakdown, watchlist, WatchStatus, WATCHLIST_SIZE},
    rankings::trend_series,
    record::{Metric, Record},
    scorer::{PerformanceCategory, PillarScores, ScoredRecord},
    types::Target,
};
use chrono::NaiveDate;

fn month(m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, 1).expect("valid date")
}

fn at(aghi_score: f64, record: Record) -> ScoredRecord {
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

/// Verify that each rejection source is reported as a share of all rejections.
#[test]
fn rejection_shares_sum_to_one_hundred() {
    let data = vec![
        at(60.0, Record::new("Kerala", "Kollam", month(1))
            .with(Metric::EnrollmentRejected, 20.0)
            .with(Metric::DemoRejected, 30.0)
            .with(Metric::BioRejected, 10.0)),
        at(70.0, Record::new("Kerala", "Kochi", month(1))
            .with(Metric::EnrollmentRejected, 10.0)
            .with(Metric::DemoRejected, 20.0)
            .with(Metric::BioRejected, 10.0)),
    ];

    let shares = rejection_breakdown(&data);
    assert!((shares.tech_error - 30.0).abs() < 1e-9);
    assert!((shares.doc_quality - 50.0).abs() < 1e-9);
    assert!((shares.bio_mismatch - 20.0).abs() < 1e-9);
}

/// Verify that a snapshot without rejections reports zero shares instead of dividing by zero.
#[test]
fn no_rejections_report_zero_shares() {
    let data = vec![at(80.0, Record::new("Kerala", "Kollam", month(1)))];
    let shares = rejection_breakdown(&data);
    assert_eq!(shares.tech_error, 0.0);
    assert_eq!(shares.doc_quality, 0.0);
    assert_eq!(shares.bio_mismatch, 0.0);
}

/// Verify that the national watchlist keeps the five weakest states, worst first.
#[test]
fn national_watchlist_is_capped_and_worst_first() {
    let states = ["Assam", "Bihar", "Goa", "Kerala", "Punjab", "Sikkim", "Tripura"];
    let data: Vec<ScoredRecord> = states
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let record = Record::new(*s, "Capital", month(1))
                .with(Metric::EnrollmentRejectionRate, 12.9);
            at(30.0 + 10.0 * i as f64, record)
        })
        .collect();

    let watch = watchlist(&data, &Target::National);
    assert_eq!(watch.len(), WATCHLIST_SIZE);
    let names: Vec<&str> = watch.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Assam", "Bihar", "Goa", "Kerala", "Punjab"]);
    assert_eq!(watch[0].failures, 12);
    assert!((watch[0].risk - 70.0).abs() < 1e-9);
    // Risk 50 is not above the national threshold.
    assert_eq!(watch[2].status, WatchStatus::Flagged);
    assert_eq!(watch[1].status, WatchStatus::AuditRequired);
}

/// Verify that a state watchlist groups by district and only escalates above 60 risk.
#[test]
fn state_watchlist_groups_districts() {
    let target = Target::State("Kerala".into());
    let data = vec![
        at(40.0, Record::new("Kerala", "Kollam", month(1))),
        at(35.0, Record::new("Kerala", "Kochi", month(1))),
    ];

    let watch = watchlist(&data, &target);
    assert_eq!(watch[0].name, "Kochi");
    assert_eq!(watch[0].status, WatchStatus::Critical);
    assert_eq!(watch[1].name, "Kollam");
    assert_eq!(watch[1].status, WatchStatus::Warning);
}

/// Verify that the report only reads the latest month and rejects unknown targets.
#[test]
fn report_reads_the_latest_month_only() {
    let history = vec![
        at(10.0, Record::new("Bihar", "Gaya", month(1)).with(Metric::EnrollmentSuccessRate, 40.0)),
        at(90.0, Record::new("Bihar", "Gaya", month(2)).with(Metric::EnrollmentSuccessRate, 95.0)),
    ];

    let report = operations_report(&history, &Target::State("Bihar".into())).expect("report");
    assert_eq!(report.sla.enrollment_tat, 95.0);
    assert_eq!(report.watchlist.len(), 1);
    assert!((report.watchlist[0].risk - 10.0).abs() < 1e-9);

    let err = operations_report(&history, &Target::parse("Goa")).unwrap_err();
    assert!(matches!(err, EngineError::RegionNotFound { .. }));
}

/// Verify that trend volumes are summed per month and absent values are skipped.
#[test]
fn trend_volumes_are_summed_per_month() {
    let history = vec![
        at(50.0, Record::new("Bihar", "Gaya", month(1))
            .with(Metric::EnrollmentTotal, 1_000.0)
            .with(Metric::BioUpdates, 200.0)),
        at(70.0, Record::new("Bihar", "Patna", month(1))
            .with(Metric::EnrollmentTotal, 500.0)),
        at(80.0, Record::new("Bihar", "Gaya", month(2))
            .with(Metric::EnrollmentTotal, 1_200.0)),
    ];

    let series = trend_series(&history, &Target::National, None);
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].enrollment_total, 1_500.0);
    assert_eq!(series[0].bio_updates, 200.0);
    assert_eq!(series[0].demo_updates, 0.0);
    assert_eq!(series[0].aghi_score, 60.0);
    assert_eq!(series[1].month, month(2));
    assert_eq!(series[1].enrollment_total, 1_200.0);
}
