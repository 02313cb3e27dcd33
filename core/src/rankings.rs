//! Read-only league tables over the latest month: state and district
//! rankings, and side-by-side pillar benchmarks. Also the month-by-month
//! trend series that feeds the headline monthly change.

use crate::{
    record::Metric,
    scorer::{mean, metric_mean, ScoredRecord},
    snapshot,
    types::{Month, Pillar, Target},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRanking {
    pub state:      String,
    pub aghi_score: f64,
    pub rank:       usize,
    /// Places gained since the previous month (negative = lost).
    pub rank_shift: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictRanking {
    pub state:      String,
    pub district:   String,
    pub aghi_score: f64,
    pub rank:       usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rankings<T> {
    pub top_performers:    Vec<T>,
    /// Worst first.
    pub bottom_performers: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub name:       String,
    pub efficiency: f64,
    pub health:     f64,
    pub stability:  f64,
    pub composite:  f64,
}

/// One month of a trend series. Volumes are summed, rates averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month:                   Month,
    pub aghi_score:              f64,
    pub enrollment_total:        f64,
    pub demo_updates:            f64,
    pub bio_updates:             f64,
    pub total_updates:           f64,
    pub enrollment_success_rate: f64,
    pub update_success_rate:     f64,
}

/// Mean composite per state for one month, best first.
/// Ties keep alphabetical order.
fn ranked_states(history: &[ScoredRecord], month: Month) -> Vec<(String, f64)> {
    let mut by_state: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in history.iter().filter(|r| r.record.month == month) {
        by_state.entry(r.record.state.as_str()).or_default().push(r.aghi_score);
    }
    let mut ranked: Vec<(String, f64)> = by_state
        .into_iter()
        .map(|(state, scores)| (state.to_string(), mean(&scores)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

pub fn state_rankings(history: &[ScoredRecord], limit: usize) -> Rankings<StateRanking> {
    let months = snapshot::months(history);
    let Some(&latest) = months.last() else {
        return Rankings { top_performers: Vec::new(), bottom_performers: Vec::new() };
    };

    let previous: BTreeMap<String, usize> = months
        .len()
        .checked_sub(2)
        .map(|i| {
            ranked_states(history, months[i])
                .into_iter()
                .enumerate()
                .map(|(i, (state, _))| (state, i + 1))
                .collect()
        })
        .unwrap_or_default();

    let ranked: Vec<StateRanking> = ranked_states(history, latest)
        .into_iter()
        .enumerate()
        .map(|(i, (state, aghi_score))| {
            let rank = i + 1;
            let rank_shift = previous
                .get(&state)
                .map_or(0, |prev| *prev as i64 - rank as i64);
            StateRanking { state, aghi_score, rank, rank_shift }
        })
        .collect();

    split_top_bottom(ranked, limit)
}

pub fn district_rankings(
    history: &[ScoredRecord],
    filter: &Target,
    limit: usize,
) -> Rankings<DistrictRanking> {
    let mut latest: Vec<ScoredRecord> = snapshot::latest_snapshot(history)
        .into_iter()
        .filter(|r| filter.includes(&r.record.state))
        .collect();
    latest.sort_by(|a, b| b.aghi_score.total_cmp(&a.aghi_score));

    let ranked = latest
        .into_iter()
        .enumerate()
        .map(|(i, r)| DistrictRanking {
            state:      r.record.state,
            district:   r.record.district,
            aghi_score: r.aghi_score,
            rank:       i + 1,
        })
        .collect();

    split_top_bottom(ranked, limit)
}

fn split_top_bottom<T: Clone>(ranked: Vec<T>, limit: usize) -> Rankings<T> {
    let top_performers = ranked.iter().take(limit).cloned().collect();
    let bottom_performers = ranked.iter().rev().take(limit).cloned().collect();
    Rankings { top_performers, bottom_performers }
}

/// Pillar profile per target for the latest month. States without data
/// in that month are skipped.
pub fn benchmark(history: &[ScoredRecord], targets: &[Target]) -> Vec<Benchmark> {
    let latest = snapshot::latest_snapshot(history);
    targets
        .iter()
        .filter_map(|target| {
            let data: Vec<&ScoredRecord> =
                latest.iter().filter(|r| target.includes(&r.record.state)).collect();
            if data.is_empty() {
                log::debug!("Benchmark skipped {target}: no records in latest month");
                return None;
            }
            let pillar_mean = |p: Pillar| {
                let values: Vec<f64> = data.iter().map(|r| r.pillars.get(p)).collect();
                mean(&values)
            };
            let composite: Vec<f64> = data.iter().map(|r| r.aghi_score).collect();
            Some(Benchmark {
                name:       target.name().to_string(),
                efficiency: pillar_mean(Pillar::OperationalEfficiency),
                health:     pillar_mean(Pillar::DataHealth),
                stability:  pillar_mean(Pillar::SystemStability),
                composite:  mean(&composite),
            })
        })
        .collect()
}

/// Per-month aggregates over the target's records, oldest first.
/// `district` narrows a state target to one district; National ignores it.
pub fn trend_series(history: &[ScoredRecord], target: &Target, district: Option<&str>) -> Vec<TrendPoint> {
    let mut by_month: BTreeMap<Month, Vec<ScoredRecord>> = BTreeMap::new();
    for r in history {
        if !target.includes(&r.record.state) {
            continue;
        }
        if let (Target::State(_), Some(d)) = (target, district) {
            if r.record.district != d {
                continue;
            }
        }
        by_month.entry(r.record.month).or_default().push(r.clone());
    }

    by_month
        .into_iter()
        .map(|(month, rows)| {
            let total = |m: Metric| -> f64 {
                rows.iter().filter_map(|r| r.get(m)).filter(|v| v.is_finite()).sum()
            };
            let scores: Vec<f64> = rows.iter().map(|r| r.aghi_score).collect();
            TrendPoint {
                month,
                aghi_score:              mean(&scores),
                enrollment_total:        total(Metric::EnrollmentTotal),
                demo_updates:            total(Metric::DemoUpdates),
                bio_updates:             total(Metric::BioUpdates),
                total_updates:           total(Metric::TotalUpdates),
                enrollment_success_rate: metric_mean(&rows, Metric::EnrollmentSuccessRate),
                update_success_rate:     metric_mean(&rows, Metric::UpdateSuccessRate),
            }
        })
        .collect()
}

/// Latest month's mean composite minus the previous month's, over all
/// records. 0 with fewer than two months.
pub fn monthly_change(history: &[ScoredRecord]) -> f64 {
    match trend_series(history, &Target::National, None).as_slice() {
        [.., previous, latest] => latest.aghi_score - previous.aghi_score,
        _ => 0.0,
    }
}
