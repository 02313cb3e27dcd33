//! Anomaly engine: flags statistically unusual regions in a scored
//! snapshot and turns them into alerts.
//!
//! This engine:
//!   1. Selects feature columns (allow-list first, numeric fallback)
//!   2. Imputes absent or non-finite values to 0
//!   3. Fits a fresh outlier model on the snapshot
//!   4. Categorizes each outlier (first matching rule wins)
//!   5. Ranks outliers most-anomalous first and writes alert text
//!
//! Fewer than `min_records` records yields an empty result. Callers must
//! read that as "not enough signal", not "no anomalies".

use crate::{
    config::AnomalyConfig,
    isolation_forest::{IsolationForest, OutlierModel},
    record::Metric,
    scorer::ScoredRecord,
    types::Pillar,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    #[serde(rename = "Critical Performance")]
    CriticalPerformance,
    Underperforming,
    #[serde(rename = "High Backlog")]
    HighBacklog,
    #[serde(rename = "High Rejection Rate")]
    HighRejectionRate,
    #[serde(rename = "Operational Anomaly")]
    OperationalAnomaly,
}

impl AnomalyType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CriticalPerformance => "Critical Performance",
            Self::Underperforming     => "Underperforming",
            Self::HighBacklog         => "High Backlog",
            Self::HighRejectionRate   => "High Rejection Rate",
            Self::OperationalAnomaly  => "Operational Anomaly",
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            Self::CriticalPerformance => {
                "Command Review: Immediate reallocation of technical resources and mandatory audit of regional service centers."
            }
            Self::Underperforming => {
                "Performance Review: Schedule a targeted capacity review with district coordinators and track pillar recovery monthly."
            }
            Self::HighBacklog => {
                "Resource Dispatch: Deploy rapid-response processing teams and authorize temporary 12-hour operational windows."
            }
            Self::HighRejectionRate => {
                "Service Audit: Investigate biometric capture hardware quality and initiate mandatory staff retraining on processing protocols."
            }
            Self::OperationalAnomaly => {
                "Diagnostic Sync: Initiate deep-dive root cause analysis and sync with regional coordinators."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(flatten)]
    pub scored:             ScoredRecord,
    pub anomaly_confidence: f64,
    pub anomaly_type:       AnomalyType,
    pub alert_message:      String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityIntervention {
    pub state:              String,
    pub district:           String,
    pub aghi_score:         f64,
    pub anomaly_confidence: f64,
    pub anomaly_type:       AnomalyType,
    pub alert_message:      String,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies:              Vec<AnomalyRecord>,
    pub priority_interventions: Vec<PriorityIntervention>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct AnomalyEngine<'a> {
    config: &'a AnomalyConfig,
}

impl<'a> AnomalyEngine<'a> {
    pub fn new(config: &'a AnomalyConfig) -> Self {
        Self { config }
    }

    /// Detect with a freshly seeded isolation forest.
    pub fn detect(&self, snapshot: &[ScoredRecord]) -> Vec<AnomalyRecord> {
        let model = IsolationForest {
            n_estimators:  self.config.n_estimators,
            max_samples:   self.config.max_samples,
            contamination: self.config.contamination,
            seed:          self.config.seed,
        };
        self.detect_with(snapshot, &model)
    }

    pub fn detect_with(&self, snapshot: &[ScoredRecord], model: &dyn OutlierModel) -> Vec<AnomalyRecord> {
        if snapshot.len() < self.config.min_records {
            log::warn!(
                "Anomaly detection skipped: {} records, need at least {}",
                snapshot.len(),
                self.config.min_records
            );
            return Vec::new();
        }

        let features = self.select_features(snapshot);
        if features.is_empty() {
            log::warn!("Anomaly detection skipped: no numeric feature columns");
            return Vec::new();
        }

        let rows: Vec<Vec<f64>> = snapshot
            .iter()
            .map(|r| {
                features
                    .iter()
                    .map(|f| r.column(f).filter(|v| v.is_finite()).unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let scores = model.fit_predict(&rows);

        let mut anomalies: Vec<AnomalyRecord> = snapshot
            .iter()
            .zip(scores)
            .filter(|(_, s)| s.is_outlier)
            .map(|(r, s)| {
                let anomaly_type = self.categorize(r);
                AnomalyRecord {
                    alert_message: alert_message(r, anomaly_type),
                    scored: r.clone(),
                    anomaly_confidence: s.confidence,
                    anomaly_type,
                }
            })
            .collect();

        anomalies.sort_by(rank_order);
        log::debug!(
            "Anomaly detection: {} of {} records flagged on {} features",
            anomalies.len(),
            snapshot.len(),
            features.len()
        );
        anomalies
    }

    /// Allow-listed columns present in the snapshot, or the first numeric
    /// columns when none of them is.
    pub fn select_features(&self, snapshot: &[ScoredRecord]) -> Vec<String> {
        let present = |name: &str| snapshot.iter().any(|r| r.column(name).is_some());

        let preferred: Vec<String> = self
            .config
            .features
            .iter()
            .filter(|f| present(f.as_str()))
            .cloned()
            .collect();
        if !preferred.is_empty() {
            return preferred;
        }

        numeric_columns()
            .into_iter()
            .filter(|c| present(c.as_str()))
            .take(self.config.fallback_feature_count)
            .collect()
    }

    pub fn categorize(&self, r: &ScoredRecord) -> AnomalyType {
        if r.aghi_score < self.config.critical_below {
            return AnomalyType::CriticalPerformance;
        }
        if r.aghi_score < self.config.underperforming_below {
            return AnomalyType::Underperforming;
        }
        if r.get(Metric::PendingRatio)
            .is_some_and(|p| p > self.config.high_backlog_pending_ratio)
        {
            return AnomalyType::HighBacklog;
        }
        if let Some(rejected) = r.get(Metric::EnrollmentRejected) {
            let total = r.get(Metric::EnrollmentTotal).unwrap_or(1.0);
            if rejected > total * self.config.high_rejection_share {
                return AnomalyType::HighRejectionRate;
            }
        }
        AnomalyType::OperationalAnomaly
    }
}

/// Top `top_n` anomalies with a recommended action attached.
pub fn priority_interventions(anomalies: &[AnomalyRecord], top_n: usize) -> Vec<PriorityIntervention> {
    let mut ranked: Vec<&AnomalyRecord> = anomalies.iter().collect();
    ranked.sort_by(|a, b| rank_order(a, b));
    ranked
        .into_iter()
        .take(top_n)
        .map(|a| PriorityIntervention {
            state:              a.scored.record.state.clone(),
            district:           a.scored.record.district.clone(),
            aghi_score:         a.scored.aghi_score,
            anomaly_confidence: a.anomaly_confidence,
            anomaly_type:       a.anomaly_type,
            alert_message:      a.alert_message.clone(),
            recommended_action: a.anomaly_type.recommended_action().to_string(),
        })
        .collect()
}

/// Most anomalous first; ties go to the lower composite score.
fn rank_order(a: &AnomalyRecord, b: &AnomalyRecord) -> Ordering {
    a.anomaly_confidence
        .total_cmp(&b.anomaly_confidence)
        .then(a.scored.aghi_score.total_cmp(&b.scored.aghi_score))
}

/// Numeric columns in table order: metrics, pillar scores, composite.
fn numeric_columns() -> Vec<String> {
    Metric::ALL
        .iter()
        .map(|m| m.name().to_string())
        .chain(Pillar::ALL.iter().map(|p| format!("{}_score", p.id())))
        .chain(std::iter::once("aghi_score".to_string()))
        .collect()
}

fn alert_message(r: &ScoredRecord, anomaly_type: AnomalyType) -> String {
    let district = &r.record.district;
    let state = &r.record.state;
    match anomaly_type {
        AnomalyType::CriticalPerformance => format!(
            "Strategic Alert: {district} ({state}) is operating significantly below the national AGHI baseline at {:.1}. System resilience is compromised.",
            r.aghi_score
        ),
        AnomalyType::Underperforming => format!(
            "Performance Alert: {district} ({state}) is underperforming with an AGHI score of {:.1}.",
            r.aghi_score
        ),
        AnomalyType::HighBacklog => format!(
            "Operational Bottleneck: {district} ({state}) shows a backlog ratio of {:.1}%, exceeding safety thresholds.",
            r.get(Metric::PendingRatio).unwrap_or(0.0)
        ),
        AnomalyType::HighRejectionRate => {
            let rejected = r.get(Metric::EnrollmentRejected).unwrap_or(0.0);
            let total = r.get(Metric::EnrollmentTotal).unwrap_or(0.0);
            let share = if total > 0.0 { rejected / total * 100.0 } else { 0.0 };
            format!(
                "Metric Alert: Significant processing friction detected in {district} ({state}). Enrollment rejections reached {share:.1}% of total enrollments."
            )
        }
        AnomalyType::OperationalAnomaly => format!(
            "System Signal: Non-standard operational patterns identified in {district} ({state}). Recommended for secondary review."
        ),
    }
}
