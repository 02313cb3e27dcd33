//! Engine configuration.
//!
//! Every constant the engine uses lives here: pillar weights and
//! indicator lists, the anomaly model knobs, diagnostics thresholds and
//! the sensitivity candidates. `EngineConfig::default()` carries the
//! production values; `EngineConfig::load()` reads an override file.

use crate::{
    error::{EngineError, EngineResult},
    record::Metric,
    types::Pillar,
};
use serde::{Deserialize, Serialize};

// ── Scoring ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillarConfig {
    pub weight:     f64,
    pub indicators: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub operational_efficiency: PillarConfig,
    pub data_health:            PillarConfig,
    pub system_stability:       PillarConfig,
    /// Score given to a pillar that has no indicator to average.
    pub neutral_pillar_score:   f64,
    /// Benefit indicators with no spread across the snapshot land here.
    pub degenerate_benefit_score: f64,
}

impl ScoringConfig {
    pub fn pillar(&self, pillar: Pillar) -> &PillarConfig {
        match pillar {
            Pillar::OperationalEfficiency => &self.operational_efficiency,
            Pillar::DataHealth            => &self.data_health,
            Pillar::SystemStability       => &self.system_stability,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            operational_efficiency: PillarConfig {
                weight: 0.40,
                indicators: vec![
                    Metric::EnrollmentSuccessRate,
                    Metric::ProcessingDays,
                    Metric::PendingRatio,
                ],
            },
            data_health: PillarConfig {
                weight: 0.35,
                indicators: vec![
                    Metric::UpdateSuccessRate,
                    Metric::TotalUpdatesPerEnrollment,
                ],
            },
            system_stability: PillarConfig {
                weight: 0.25,
                indicators: vec![
                    Metric::PendingRatio,
                    Metric::EnrollmentRejectionRate,
                    Metric::GovernanceImbalance,
                ],
            },
            neutral_pillar_score: 50.0,
            degenerate_benefit_score: 50.0,
        }
    }
}

// ── Anomaly detection ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Expected share of outliers in a snapshot.
    pub contamination:   f64,
    pub n_estimators:    usize,
    /// Upper bound on the per-tree subsample size.
    pub max_samples:     usize,
    pub seed:            u64,
    /// Below this many records the detector returns nothing.
    pub min_records:     usize,
    /// Preferred feature columns, in order. Unknown names are skipped.
    pub features:        Vec<String>,
    /// Numeric columns taken when none of `features` is present.
    pub fallback_feature_count: usize,
    pub critical_below:        f64,
    pub underperforming_below: f64,
    pub high_backlog_pending_ratio: f64,
    /// Share of `enrollment_total` above which rejections are anomalous.
    pub high_rejection_share:  f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.10,
            n_estimators:  100,
            max_samples:   256,
            seed:          42,
            min_records:   10,
            features: [
                "aghi_score",
                "enrollment_success_rate",
                "update_success_rate",
                "pending_ratio",
                "total_updates",
                "enrollment_rejected",
                "demo_rejected",
                "bio_rejected",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_feature_count: 8,
            critical_below: 40.0,
            underperforming_below: 60.0,
            high_backlog_pending_ratio: 50.0,
            high_rejection_share: 0.30,
        }
    }
}

// ── Diagnostics ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Reference score for the National target.
    pub ideal_score:                f64,
    pub enrollment_rejection_share: f64,
    pub demo_rejection_share:       f64,
    pub backlog_pending_ratio:      f64,
    /// Month-over-month composite delta that counts as a trend.
    pub trend_threshold:            f64,
    pub critical_district_count:    usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            ideal_score: 100.0,
            enrollment_rejection_share: 0.15,
            demo_rejection_share: 0.20,
            backlog_pending_ratio: 20.0,
            trend_threshold: 2.0,
            critical_district_count: 3,
        }
    }
}

// ── Simulation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lever {
    /// Success-type metric: improvement means raising it.
    Raise,
    /// Cost/backlog-type metric: improvement means lowering it.
    Lower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityCandidate {
    pub metric: Metric,
    pub label:  String,
    pub lever:  Lever,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Size of the test perturbation used by sensitivity analysis.
    pub test_perturbation: f64,
    pub candidates:        Vec<SensitivityCandidate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let candidate = |metric, label: &str, lever| SensitivityCandidate {
            metric,
            label: label.to_string(),
            lever,
        };
        Self {
            test_perturbation: 0.15,
            candidates: vec![
                candidate(Metric::EnrollmentSuccessRate, "Enrollment Success", Lever::Raise),
                candidate(Metric::UpdateSuccessRate, "Update Success", Lever::Raise),
                candidate(Metric::PendingRatio, "Backlog Reduction", Lever::Lower),
                candidate(Metric::ProcessingDays, "Turnaround Time", Lever::Lower),
            ],
        }
    }
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring:     ScoringConfig,
    pub anomaly:     AnomalyConfig,
    pub diagnostics: DiagnosticsConfig,
    pub simulation:  SimulationConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Missing sections keep their defaults.
    /// In tests, use EngineConfig::default().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let weight_sum: f64 = Pillar::ALL
            .iter()
            .map(|p| self.scoring.pillar(*p).weight)
            .sum();
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(EngineError::InvalidConfig(format!(
                "pillar weights must sum to 1.0, got {weight_sum}"
            )));
        }
        if Pillar::ALL.iter().any(|p| self.scoring.pillar(*p).weight < 0.0) {
            return Err(EngineError::InvalidConfig("pillar weights must be non-negative".into()));
        }

        let c = self.anomaly.contamination;
        if !(c > 0.0 && c <= 0.5) {
            return Err(EngineError::InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {c}"
            )));
        }
        if self.anomaly.n_estimators == 0 || self.anomaly.max_samples < 2 {
            return Err(EngineError::InvalidConfig(
                "anomaly model needs at least one tree and two samples per tree".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = EngineConfig::default();
        config.scoring.data_health.weight = 0.5;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "anomaly": { "contamination": 0.2 } }"#).unwrap();
        assert_eq!(config.anomaly.contamination, 0.2);
        assert_eq!(config.anomaly.n_estimators, 100);
        assert_eq!(config.scoring.operational_efficiency.weight, 0.40);
    }
}
