//! Diagnostics engine: root-cause attribution for a state or the nation.
//!
//! This engine:
//!   1. Takes the latest month of the scored history as the snapshot
//!   2. Computes the national baseline (column means) of that snapshot
//!   3. Measures each pillar's gap to a reference:
//!        National  → the ideal score (100)
//!        a state   → the national baseline mean for that pillar
//!   4. Ranks pillars by descending gap; the first is the primary issue
//!   5. Maps the primary pillar to a root-cause narrative using raw metrics
//!   6. Classifies the month-over-month composite trend
//!   7. Lists the lowest-scoring districts to flag first

use crate::{
    config::DiagnosticsConfig,
    error::{EngineError, EngineResult},
    record::Metric,
    scorer::{mean, metric_mean, ScoredRecord},
    snapshot::{self, NationalBaseline},
    types::{Month, Pillar, Target},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarGap {
    pub id:           Pillar,
    pub label:        String,
    pub score:        f64,
    pub national_avg: f64,
    pub gap:          f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub target:               String,
    pub month:                Month,
    pub primary_pillar_issue: PillarGap,
    pub diagnosis:            String,
    pub trend:                Trend,
    pub all_pillars:          Vec<PillarGap>,
    pub critical_districts:   Vec<String>,
    pub baseline:             NationalBaseline,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct DiagnosticsEngine<'a> {
    config: &'a DiagnosticsConfig,
}

impl<'a> DiagnosticsEngine<'a> {
    pub fn new(config: &'a DiagnosticsConfig) -> Self {
        Self { config }
    }

    pub fn diagnose(&self, history: &[ScoredRecord], target: &Target) -> EngineResult<Diagnosis> {
        let month = snapshot::latest_month(history).ok_or(EngineError::EmptySnapshot)?;
        let latest = snapshot::month_slice(history, month);
        let baseline = NationalBaseline::from_snapshot(&latest);

        let target_data: Vec<ScoredRecord> = latest
            .iter()
            .filter(|r| target.includes(&r.record.state))
            .cloned()
            .collect();
        if target_data.is_empty() {
            return Err(EngineError::RegionNotFound {
                region: target.name().to_string(),
            });
        }

        let mut gaps = self.pillar_gaps(&target_data, &baseline, target);
        gaps.sort_by(|a, b| b.gap.total_cmp(&a.gap));
        let primary = gaps[0].clone();

        let diagnosis = self.root_cause(primary.id, &target_data);
        let trend = self.trend(history, target);
        let critical_districts = self.critical_districts(&target_data);

        log::info!(
            "Diagnosed {target} for {}: primary issue {} (gap {:.1}), trend {trend:?}",
            month.format("%Y-%m"),
            primary.id.id(),
            primary.gap
        );

        Ok(Diagnosis {
            target: target.name().to_string(),
            month,
            primary_pillar_issue: primary,
            diagnosis,
            trend,
            all_pillars: gaps,
            critical_districts,
            baseline,
        })
    }

    /// Per-pillar gaps in pillar order (unsorted).
    pub fn pillar_gaps(
        &self,
        target_data: &[ScoredRecord],
        baseline: &NationalBaseline,
        target: &Target,
    ) -> Vec<PillarGap> {
        Pillar::ALL
            .iter()
            .map(|p| {
                let values: Vec<f64> = target_data.iter().map(|r| r.pillars.get(*p)).collect();
                let score = mean(&values);
                let national_avg = baseline.pillar(*p);
                let reference = match target {
                    Target::National => self.config.ideal_score,
                    Target::State(_) => national_avg,
                };
                PillarGap {
                    id: *p,
                    label: p.label().to_string(),
                    score,
                    national_avg,
                    gap: reference - score,
                }
            })
            .collect()
    }

    /// Explain the weakest pillar from the underlying raw metrics.
    pub fn root_cause(&self, pillar: Pillar, target_data: &[ScoredRecord]) -> String {
        match pillar {
            Pillar::OperationalEfficiency => {
                let share = ratio_of_means(target_data, Metric::EnrollmentRejected, Metric::EnrollmentTotal);
                if share > self.config.enrollment_rejection_share {
                    "Critical enrollment rejection rate detected. Likely cause: Infrastructure or training gaps at enrollment centers.".into()
                } else {
                    "General operational friction. Suggests resource allocation issues.".into()
                }
            }
            Pillar::DataHealth => {
                let share = ratio_of_means(target_data, Metric::DemoRejected, Metric::DemoUpdates);
                if share > self.config.demo_rejection_share {
                    "Significant demographic update rejections. Primary cause: Insufficient document verification standards.".into()
                } else {
                    "Minor data integrity fluctuations. Suggests need for periodic audit.".into()
                }
            }
            Pillar::SystemStability => {
                let backlog = metric_mean(target_data, Metric::PendingRatio);
                if backlog > self.config.backlog_pending_ratio {
                    "High backlog detected. Primary cause: Processing latency at regional data centers.".into()
                } else {
                    "System fluctuations. Monitoring required for surge capacity.".into()
                }
            }
        }
    }

    /// Compare the last two months of mean composite score for the target.
    /// Fewer than two months of history is reported as Stable.
    pub fn trend(&self, history: &[ScoredRecord], target: &Target) -> Trend {
        let mut by_month: BTreeMap<Month, Vec<f64>> = BTreeMap::new();
        for r in history.iter().filter(|r| target.includes(&r.record.state)) {
            by_month.entry(r.record.month).or_default().push(r.aghi_score);
        }

        let monthly: Vec<f64> = by_month.values().map(|scores| mean(scores)).collect();
        if monthly.len() < 2 {
            return Trend::Stable;
        }

        let change = monthly[monthly.len() - 1] - monthly[monthly.len() - 2];
        if change > self.config.trend_threshold {
            Trend::Improving
        } else if change < -self.config.trend_threshold {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Lowest-composite districts, worst first.
    pub fn critical_districts(&self, target_data: &[ScoredRecord]) -> Vec<String> {
        let mut ranked: Vec<&ScoredRecord> = target_data.iter().collect();
        ranked.sort_by(|a, b| a.aghi_score.total_cmp(&b.aghi_score));
        ranked
            .into_iter()
            .take(self.config.critical_district_count)
            .map(|r| r.record.district.clone())
            .collect()
    }
}

/// mean(numerator) / mean(denominator), 0 when the denominator mean is ≤ 0.
fn ratio_of_means(data: &[ScoredRecord], numerator: Metric, denominator: Metric) -> f64 {
    let den = metric_mean(data, denominator);
    if den > 0.0 {
        metric_mean(data, numerator) / den
    } else {
        0.0
    }
}
