//! Snapshots and the national baseline.
//!
//! A snapshot is every record for one month. The engine scores each month
//! as its own snapshot and keeps the full scored history, ordered by month.

use crate::{
    record::{Metric, Record},
    scorer::{mean, metric_mean, ScoredRecord},
    types::{Month, Pillar},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Split records into per-month snapshots, oldest first.
/// Record order inside a month is preserved.
pub fn group_by_month(records: Vec<Record>) -> BTreeMap<Month, Vec<Record>> {
    let mut months: BTreeMap<Month, Vec<Record>> = BTreeMap::new();
    for record in records {
        months.entry(record.month).or_default().push(record);
    }
    months
}

pub fn latest_month(history: &[ScoredRecord]) -> Option<Month> {
    history.iter().map(|r| r.record.month).max()
}

/// Records of one month, in history order.
pub fn month_slice(history: &[ScoredRecord], month: Month) -> Vec<ScoredRecord> {
    history
        .iter()
        .filter(|r| r.record.month == month)
        .cloned()
        .collect()
}

/// The most recent month's snapshot, empty when there is no history.
pub fn latest_snapshot(history: &[ScoredRecord]) -> Vec<ScoredRecord> {
    latest_month(history)
        .map(|m| month_slice(history, m))
        .unwrap_or_default()
}

/// Months present in the history, oldest first.
pub fn months(history: &[ScoredRecord]) -> Vec<Month> {
    let mut months: Vec<Month> = history.iter().map(|r| r.record.month).collect();
    months.sort_unstable();
    months.dedup();
    months
}

/// Column-wise mean of every numeric field across a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalBaseline {
    pub record_count: usize,
    /// Only metrics carried by at least one record appear here.
    pub metrics:      BTreeMap<Metric, f64>,
    pub pillars:      BTreeMap<Pillar, f64>,
    pub aghi_score:   f64,
}

impl NationalBaseline {
    pub fn from_snapshot(snapshot: &[ScoredRecord]) -> Self {
        let metrics = Metric::ALL
            .iter()
            .copied()
            .filter(|m| snapshot.iter().any(|r| r.get(*m).is_some_and(f64::is_finite)))
            .map(|m| (m, metric_mean(snapshot, m)))
            .collect();

        let pillars = Pillar::ALL
            .iter()
            .map(|p| {
                let values: Vec<f64> = snapshot.iter().map(|r| r.pillars.get(*p)).collect();
                (*p, mean(&values))
            })
            .collect();

        let scores: Vec<f64> = snapshot.iter().map(|r| r.aghi_score).collect();

        Self {
            record_count: snapshot.len(),
            metrics,
            pillars,
            aghi_score: mean(&scores),
        }
    }

    pub fn pillar(&self, pillar: Pillar) -> f64 {
        self.pillars.get(&pillar).copied().unwrap_or(0.0)
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}
