//! The governance engine: the single entry point over the scored history.
//!
//! PIPELINE (fixed order on ingest):
//!   1. Normalize every record's month to the first of the month
//!   2. Reject duplicate (state, district, month) keys
//!   3. Group by month and score each month as its own snapshot
//!   4. Append to the history, oldest month first
//!
//! RULES:
//!   - Every read works on the latest month unless it says otherwise.
//!   - Simulations run on copies; the history is only changed by ingest.
//!   - All randomness lives inside the per-call outlier model.

use crate::{
    anomaly_engine::{self, AnomalyEngine, AnomalyRecord, AnomalyReport, PriorityIntervention},
    briefing::Briefing,
    config::EngineConfig,
    diagnostics_engine::{Diagnosis, DiagnosticsEngine},
    error::{EngineError, EngineResult},
    operations::{self, OperationsReport},
    rankings::{self, Benchmark, DistrictRanking, Rankings, StateRanking, TrendPoint},
    record::Record,
    scorer::{self, mean, NationalSummary, ScoredRecord, Scorer},
    simulation_engine::{self, Adjustments, SimulationEngine, SimulationReport, Sensitivity},
    snapshot,
    types::{month_start, RegionKey, Target},
};
use std::collections::BTreeSet;

pub struct GovernanceEngine {
    config:  EngineConfig,
    history: Vec<ScoredRecord>,
}

impl GovernanceEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config, history: Vec::new() })
    }

    /// Build an engine and ingest `records` in one step.
    pub fn with_records(config: EngineConfig, records: Vec<Record>) -> EngineResult<Self> {
        let mut engine = Self::new(config)?;
        engine.ingest(records)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Ingest ─────────────────────────────────────────────────

    /// Score and append new records. Nothing is appended on error.
    pub fn ingest(&mut self, mut records: Vec<Record>) -> EngineResult<usize> {
        let mut seen: BTreeSet<RegionKey> = self.history.iter().map(|r| r.record.key()).collect();
        for record in records.iter_mut() {
            record.month = month_start(record.month);
            let key = record.key();
            if !seen.insert(key) {
                return Err(EngineError::DuplicateRecord {
                    state:    record.state.clone(),
                    district: record.district.clone(),
                    month:    record.month,
                });
            }
        }

        let count = records.len();
        let all: Vec<Record> = std::mem::take(&mut self.history)
            .into_iter()
            .map(|r| r.record)
            .chain(records)
            .collect();
        let months = snapshot::group_by_month(all);

        let scorer = Scorer::new(&self.config.scoring);
        self.history = months
            .values()
            .flat_map(|month_records| scorer.score(month_records))
            .collect();

        log::info!(
            "Ingested {count} records; history holds {} records over {} months",
            self.history.len(),
            months.len()
        );
        Ok(count)
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn history(&self) -> &[ScoredRecord] {
        &self.history
    }

    pub fn latest_snapshot(&self) -> Vec<ScoredRecord> {
        snapshot::latest_snapshot(&self.history)
    }

    pub fn summary(&self) -> EngineResult<NationalSummary> {
        let mut summary = scorer::summarize(&self.latest_snapshot())?;
        summary.monthly_change = rankings::monthly_change(&self.history);
        Ok(summary)
    }

    pub fn anomalies(&self) -> Vec<AnomalyRecord> {
        AnomalyEngine::new(&self.config.anomaly).detect(&self.latest_snapshot())
    }

    /// Anomalies and the interventions drawn from them, from one model fit.
    pub fn anomaly_report(&self, top_n: usize) -> AnomalyReport {
        let anomalies = self.anomalies();
        let priority_interventions = anomaly_engine::priority_interventions(&anomalies, top_n);
        AnomalyReport { anomalies, priority_interventions }
    }

    pub fn priority_interventions(&self, top_n: usize) -> Vec<PriorityIntervention> {
        self.anomaly_report(top_n).priority_interventions
    }

    pub fn diagnose(&self, target: &Target) -> EngineResult<Diagnosis> {
        DiagnosticsEngine::new(&self.config.diagnostics).diagnose(&self.history, target)
    }

    pub fn state_rankings(&self, limit: usize) -> Rankings<StateRanking> {
        rankings::state_rankings(&self.history, limit)
    }

    pub fn district_rankings(&self, filter: &Target, limit: usize) -> Rankings<DistrictRanking> {
        rankings::district_rankings(&self.history, filter, limit)
    }

    pub fn benchmark(&self, targets: &[Target]) -> Vec<Benchmark> {
        rankings::benchmark(&self.history, targets)
    }

    pub fn trends(&self, target: &Target, district: Option<&str>) -> Vec<TrendPoint> {
        rankings::trend_series(&self.history, target, district)
    }

    pub fn operations(&self, target: &Target) -> EngineResult<OperationsReport> {
        operations::operations_report(&self.history, target)
    }

    pub fn briefing(&self, target: &Target) -> EngineResult<Briefing> {
        let summary = self.summary()?;
        let diagnosis = self.diagnose(target)?;
        Ok(Briefing::build(&summary, &diagnosis))
    }

    // ── What-if ────────────────────────────────────────────────

    /// Counterfactual for one target in the latest month.
    ///
    /// The target's records form the simulated snapshot. The baseline is
    /// that same snapshot rescored without adjustments, so an empty
    /// adjustment set reports zero improvement. Sensitivities are reported
    /// for the target's lowest-scoring record.
    pub fn simulate(&self, target: &Target, adjustments: &Adjustments) -> EngineResult<SimulationReport> {
        let target_data: Vec<ScoredRecord> = self
            .latest_snapshot()
            .into_iter()
            .filter(|r| target.includes(&r.record.state))
            .collect();
        if target_data.is_empty() {
            return Err(EngineError::RegionNotFound { region: target.name().to_string() });
        }

        let sim = SimulationEngine::new(&self.config.scoring, &self.config.simulation);
        let (baseline, _) = sim.simulate(&target_data, &Adjustments::new());
        let (simulated, pillar_impacts) = sim.simulate(&target_data, adjustments);

        let composite = |rows: &[ScoredRecord]| mean(&rows.iter().map(|r| r.aghi_score).collect::<Vec<_>>());
        let base_aghi = composite(&baseline);
        let simulated_aghi = composite(&simulated);

        let focus = target_data
            .iter()
            .min_by(|a, b| a.aghi_score.total_cmp(&b.aghi_score))
            .map(|r| r.record.key())
            .ok_or(EngineError::EmptySnapshot)?;
        let sensitivities = sim.sensitivity(&target_data, &focus)?;

        log::info!(
            "Simulated {target}: {base_aghi:.1} -> {simulated_aghi:.1} over {} records",
            target_data.len()
        );

        Ok(SimulationReport {
            target: target.name().to_string(),
            base_aghi,
            simulated_aghi,
            improvement: simulated_aghi - base_aghi,
            pillar_impacts,
            sensitivities,
            roadmap: simulation_engine::roadmap(target, adjustments),
        })
    }

    /// Lever ranking for one record, within its own month's snapshot.
    pub fn sensitivity(&self, region: &RegionKey) -> EngineResult<Vec<Sensitivity>> {
        let month = snapshot::month_slice(&self.history, region.month);
        SimulationEngine::new(&self.config.scoring, &self.config.simulation).sensitivity(&month, region)
    }
}
