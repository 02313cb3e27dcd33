//! Simulation engine: counterfactual "what if" scoring.
//!
//! RULE: Simulation always works on a copy. The canonical snapshot is
//! never touched.
//!
//! Adjustments are multiplicative (`value *= 1 + change`) followed by a
//! clip: percent-scale metrics (name contains "rate" or "ratio") into
//! [0, 100], everything else floored at 0. The adjusted copy is fully
//! rescored, so normalization bounds move with the adjusted distribution.

use crate::{
    config::{Lever, ScoringConfig, SimulationConfig},
    error::{EngineError, EngineResult},
    record::{Metric, Record},
    scorer::{mean, ScoredRecord, Scorer},
    types::{Pillar, RegionKey, Target},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requested fractional change per metric (0.10 = +10%).
pub type Adjustments = BTreeMap<Metric, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarImpacts {
    pub efficiency: f64,
    pub health:     f64,
    pub stability:  f64,
}

impl PillarImpacts {
    pub fn from_snapshot(snapshot: &[ScoredRecord]) -> Self {
        let pillar_mean = |p: Pillar| {
            let values: Vec<f64> = snapshot.iter().map(|r| r.pillars.get(p)).collect();
            mean(&values)
        };
        Self {
            efficiency: pillar_mean(Pillar::OperationalEfficiency),
            health:     pillar_mean(Pillar::DataHealth),
            stability:  pillar_mean(Pillar::SystemStability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub metric:                Metric,
    pub potential_improvement: f64,
    pub label:                 String,
}

/// Everything an operator sees after a what-if run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub target:         String,
    pub base_aghi:      f64,
    pub simulated_aghi: f64,
    pub improvement:    f64,
    pub pillar_impacts: PillarImpacts,
    pub sensitivities:  Vec<Sensitivity>,
    pub roadmap:        Vec<String>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct SimulationEngine<'a> {
    scoring: &'a ScoringConfig,
    config:  &'a SimulationConfig,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(scoring: &'a ScoringConfig, config: &'a SimulationConfig) -> Self {
        Self { scoring, config }
    }

    /// Apply `adjustments` to every record of a copy and rescore it.
    pub fn simulate(
        &self,
        snapshot: &[ScoredRecord],
        adjustments: &Adjustments,
    ) -> (Vec<ScoredRecord>, PillarImpacts) {
        let mut records = raw_copy(snapshot);
        apply_adjustments(&mut records, adjustments, None);
        let rescored = Scorer::new(self.scoring).score(&records);
        let impacts = PillarImpacts::from_snapshot(&rescored);
        (rescored, impacts)
    }

    /// Rank single-metric levers by their effect on one region's composite.
    ///
    /// Each candidate gets the standard test perturbation (raised for
    /// success-type metrics, lowered for cost/backlog ones), applied to the
    /// region's record only, inside a copy of its snapshot.
    pub fn sensitivity(
        &self,
        snapshot: &[ScoredRecord],
        region: &RegionKey,
    ) -> EngineResult<Vec<Sensitivity>> {
        let index = snapshot
            .iter()
            .position(|r| &r.record.key() == region)
            .ok_or_else(|| EngineError::RegionNotFound {
                region: region.to_string(),
            })?;

        let records = raw_copy(snapshot);
        let scorer = Scorer::new(self.scoring);
        let base = scorer.score(&records)[index].aghi_score;

        let mut impacts: Vec<Sensitivity> = self
            .config
            .candidates
            .iter()
            .filter(|c| records[index].get(c.metric).is_some())
            .map(|c| {
                let change = match c.lever {
                    Lever::Raise => self.config.test_perturbation,
                    Lever::Lower => -self.config.test_perturbation,
                };
                let adjustments: Adjustments = [(c.metric, change)].into();

                let mut perturbed = records.clone();
                apply_adjustments(&mut perturbed, &adjustments, Some(region));
                let simulated = scorer.score(&perturbed)[index].aghi_score;

                Sensitivity {
                    metric:                c.metric,
                    potential_improvement: simulated - base,
                    label:                 c.label.clone(),
                }
            })
            .collect();

        // Stable sort: equal impacts keep candidate order.
        impacts.sort_by(|a, b| {
            b.potential_improvement
                .abs()
                .total_cmp(&a.potential_improvement.abs())
        });
        Ok(impacts)
    }
}

/// Unscored copies of the snapshot's records.
fn raw_copy(snapshot: &[ScoredRecord]) -> Vec<Record> {
    snapshot.iter().map(|r| r.record.clone()).collect()
}

/// Apply adjustments in place, to every record or only to `scope`.
/// Records without a value for an adjusted metric are left without one.
pub fn apply_adjustments(records: &mut [Record], adjustments: &Adjustments, scope: Option<&RegionKey>) {
    for record in records.iter_mut() {
        if scope.is_some_and(|key| &record.key() != key) {
            continue;
        }
        for (metric, change) in adjustments {
            let Some(value) = record.get(*metric).filter(|v| v.is_finite()) else {
                continue;
            };
            let adjusted = value * (1.0 + change);
            let clipped = if metric.is_percent_scale() {
                adjusted.clamp(0.0, 100.0)
            } else {
                adjusted.max(0.0)
            };
            record.set(*metric, clipped);
        }
    }
}

/// Parse metric names from an external request. Unknown names are errors.
pub fn parse_adjustments<'s>(
    raw: impl IntoIterator<Item = (&'s str, f64)>,
) -> EngineResult<Adjustments> {
    raw.into_iter()
        .map(|(name, change)| -> EngineResult<(Metric, f64)> {
            let metric = name.parse::<Metric>().inspect_err(|_| {
                log::warn!("Rejected adjustment for unknown metric '{name}'");
            })?;
            Ok((metric, change))
        })
        .collect()
}

/// Action plan implied by the requested adjustments.
pub fn roadmap(target: &Target, adjustments: &Adjustments) -> Vec<String> {
    let change = |m: Metric| adjustments.get(&m).copied().unwrap_or(0.0);
    let mut steps = Vec::new();

    if change(Metric::EnrollmentSuccessRate) > 0.0 {
        steps.push(format!("Deploy mobile enrollment units in low-coverage blocks of {target}"));
    }
    if change(Metric::UpdateSuccessRate) > 0.0 {
        steps.push("Initiate biometric sensor calibration across all permanent centers".to_string());
    }
    if change(Metric::PendingRatio) < 0.0 {
        steps.push(format!("Authorize weekend shifts for backlog clearance in {target} HQ"));
    }
    if steps.is_empty() {
        steps.push("Maintain existing governance baseline; monitor for micro-fluctuations.".to_string());
    }
    steps
}
