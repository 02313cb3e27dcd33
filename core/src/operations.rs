//! Operations view of the latest month: service-level proxies, rejection
//! breakdown and a watchlist of the weakest entities.
//!
//! RULES:
//!   - SLA figures are proxies: the mean success rates stand in for
//!     turnaround data the records do not carry.
//!   - Rejection shares divide by the summed rejections, or by 1 when
//!     nothing was rejected.
//!   - National watches states; a single state watches its districts.

use crate::{
    error::{EngineError, EngineResult},
    record::Metric,
    scorer::{mean, metric_mean, ScoredRecord},
    snapshot,
    types::Target,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WATCHLIST_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaProxies {
    pub enrollment_tat: f64,
    pub update_tat:     f64,
    /// Mean of the two proxies above.
    pub grievance_tat:  f64,
}

/// Percentage of all rejections coming from each source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RejectionBreakdown {
    pub bio_mismatch: f64,
    pub doc_quality:  f64,
    pub tech_error:   f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchStatus {
    #[serde(rename = "Audit Req.")]
    AuditRequired,
    Flagged,
    Critical,
    Warning,
}

impl WatchStatus {
    /// States escalate above 50 risk, districts above 60.
    pub fn classify(target: &Target, risk: f64) -> Self {
        match target {
            Target::National if risk > 50.0 => WatchStatus::AuditRequired,
            Target::National => WatchStatus::Flagged,
            Target::State(_) if risk > 60.0 => WatchStatus::Critical,
            Target::State(_) => WatchStatus::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub name:     String,
    /// Mean enrollment rejection rate, truncated.
    pub failures: i64,
    /// 100 − mean composite.
    pub risk:     f64,
    pub status:   WatchStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsReport {
    pub target:    String,
    pub sla:       SlaProxies,
    pub failures:  RejectionBreakdown,
    pub watchlist: Vec<WatchlistEntry>,
}

pub fn operations_report(history: &[ScoredRecord], target: &Target) -> EngineResult<OperationsReport> {
    let data: Vec<ScoredRecord> = snapshot::latest_snapshot(history)
        .into_iter()
        .filter(|r| target.includes(&r.record.state))
        .collect();
    if data.is_empty() {
        return Err(EngineError::RegionNotFound { region: target.name().to_string() });
    }

    let enrollment_tat = metric_mean(&data, Metric::EnrollmentSuccessRate);
    let update_tat = metric_mean(&data, Metric::UpdateSuccessRate);
    let sla = SlaProxies {
        enrollment_tat,
        update_tat,
        grievance_tat: (enrollment_tat + update_tat) / 2.0,
    };

    let report = OperationsReport {
        target: target.name().to_string(),
        sla,
        failures: rejection_breakdown(&data),
        watchlist: watchlist(&data, target),
    };
    log::debug!("Operations report for {target}: {} watchlist entries", report.watchlist.len());
    Ok(report)
}

pub fn rejection_breakdown(data: &[ScoredRecord]) -> RejectionBreakdown {
    let total_of = |m: Metric| -> f64 {
        data.iter().filter_map(|r| r.get(m)).filter(|v| v.is_finite()).sum()
    };
    let enrollment = total_of(Metric::EnrollmentRejected);
    let demo = total_of(Metric::DemoRejected);
    let bio = total_of(Metric::BioRejected);

    let mut total = enrollment + demo + bio;
    if total == 0.0 {
        total = 1.0;
    }
    RejectionBreakdown {
        bio_mismatch: bio / total * 100.0,
        doc_quality:  demo / total * 100.0,
        tech_error:   enrollment / total * 100.0,
    }
}

/// Worst entities by mean composite, at most `WATCHLIST_SIZE`.
/// Ties keep alphabetical order.
pub fn watchlist(data: &[ScoredRecord], target: &Target) -> Vec<WatchlistEntry> {
    let mut groups: BTreeMap<&str, Vec<ScoredRecord>> = BTreeMap::new();
    for r in data {
        let name = match target {
            Target::National => r.record.state.as_str(),
            Target::State(_) => r.record.district.as_str(),
        };
        groups.entry(name).or_default().push(r.clone());
    }

    let mut ranked: Vec<(&str, f64, f64)> = groups
        .iter()
        .map(|(name, rows)| {
            let scores: Vec<f64> = rows.iter().map(|r| r.aghi_score).collect();
            (*name, mean(&scores), metric_mean(rows, Metric::EnrollmentRejectionRate))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    ranked
        .into_iter()
        .take(WATCHLIST_SIZE)
        .map(|(name, aghi, rejection_rate)| {
            let risk = 100.0 - aghi;
            WatchlistEntry {
                name:     name.to_string(),
                failures: rejection_rate.trunc() as i64,
                risk,
                status:   WatchStatus::classify(target, risk),
            }
        })
        .collect()
}
