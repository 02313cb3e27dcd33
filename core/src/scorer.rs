//! Composite scorer: pillar averages, the weighted AGHI composite, the
//! performance band, and the cross-sectional national summary.
//!
//! Granularity: pillar and composite scores are computed per record.
//! Normalization bounds are batch-relative (taken over the snapshot being
//! scored), but each record averages ITS OWN normalized indicators. The
//! simulation engine rescores through this same path.
//!
//! RULE: Scoring never mutates its input. It returns a new snapshot.

use crate::{
    config::ScoringConfig,
    error::{EngineError, EngineResult},
    normalizer,
    record::{Metric, Record},
    types::Pillar,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

/// Ordered performance bands. Edges: [0,40] (40,60] (60,80] (80,100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceCategory {
    Critical,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Good,
    Excellent,
}

impl PerformanceCategory {
    pub fn from_score(score: f64) -> Self {
        if score <= 40.0 {
            Self::Critical
        } else if score <= 60.0 {
            Self::NeedsImprovement
        } else if score <= 80.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical         => "Critical",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Good             => "Good",
            Self::Excellent        => "Excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarScores {
    #[serde(rename = "operational_efficiency_score")]
    pub operational_efficiency: f64,
    #[serde(rename = "data_health_score")]
    pub data_health:            f64,
    #[serde(rename = "system_stability_score")]
    pub system_stability:       f64,
}

impl PillarScores {
    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::OperationalEfficiency => self.operational_efficiency,
            Pillar::DataHealth            => self.data_health,
            Pillar::SystemStability       => self.system_stability,
        }
    }

    fn set(&mut self, pillar: Pillar, value: f64) {
        match pillar {
            Pillar::OperationalEfficiency => self.operational_efficiency = value,
            Pillar::DataHealth            => self.data_health = value,
            Pillar::SystemStability       => self.system_stability = value,
        }
    }

    /// Highest-scoring pillar; ties resolve to the earlier pillar.
    pub fn strongest(&self) -> Pillar {
        Pillar::ALL
            .iter()
            .copied()
            .fold(Pillar::OperationalEfficiency, |best, p| {
                if self.get(p) > self.get(best) { p } else { best }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record:               Record,
    #[serde(flatten)]
    pub pillars:              PillarScores,
    pub aghi_score:           f64,
    pub performance_category: PerformanceCategory,
}

impl ScoredRecord {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.record.get(metric)
    }

    /// Look up any numeric column by name, including engine-produced ones.
    pub fn column(&self, name: &str) -> Option<f64> {
        match name {
            "aghi_score" => Some(self.aghi_score),
            "operational_efficiency_score" => Some(self.pillars.operational_efficiency),
            "data_health_score" => Some(self.pillars.data_health),
            "system_stability_score" => Some(self.pillars.system_stability),
            other => other.parse::<Metric>().ok().and_then(|m| self.record.get(m)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalSummary {
    pub national_aghi:        f64,
    pub top_state:            String,
    pub top_district:         String,
    pub top_score:            f64,
    pub top_pillar:           String,
    pub bottom_state:         String,
    pub bottom_district:      String,
    pub bottom_score:         f64,
    pub total_districts:      usize,
    pub excellent_performers: usize,
    pub critical_performers:  usize,
    pub avg_enrollment_rate:  f64,
    pub avg_update_rate:      f64,
    pub inclusion_rate:       f64,
    pub resilience_index:     f64,
    /// Latest month's mean composite minus the previous month's.
    pub monthly_change:       f64,
}

// ── Scorer ───────────────────────────────────────────────────────────────────

pub struct Scorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Score one snapshot. Output order matches input order.
    pub fn score(&self, records: &[Record]) -> Vec<ScoredRecord> {
        let neutral = self.config.neutral_pillar_score;
        let mut pillar_scores = vec![
            PillarScores {
                operational_efficiency: neutral,
                data_health:            neutral,
                system_stability:       neutral,
            };
            records.len()
        ];

        // Each indicator is normalized once even if two pillars share it.
        let mut normalized: BTreeMap<Metric, Vec<Option<f64>>> = BTreeMap::new();

        for pillar in Pillar::ALL {
            let indicators: Vec<Metric> = self
                .config
                .pillar(pillar)
                .indicators
                .iter()
                .copied()
                .filter(|m| normalizer::is_present(records, *m))
                .collect();

            if indicators.is_empty() {
                log::debug!("Pillar {} has no indicators present, using neutral score", pillar.id());
                continue;
            }

            for m in &indicators {
                normalized.entry(*m).or_insert_with(|| {
                    normalizer::normalize(records, *m, self.config.degenerate_benefit_score)
                });
            }

            for (i, scores) in pillar_scores.iter_mut().enumerate() {
                let values: Vec<f64> = indicators
                    .iter()
                    .filter_map(|m| normalized.get(m).and_then(|col| col[i]))
                    .collect();
                if !values.is_empty() {
                    scores.set(pillar, mean(&values));
                }
            }
        }

        records
            .iter()
            .zip(pillar_scores)
            .map(|(record, pillars)| {
                let aghi_score = self.composite(&pillars);
                ScoredRecord {
                    record: record.clone(),
                    pillars,
                    aghi_score,
                    performance_category: PerformanceCategory::from_score(aghi_score),
                }
            })
            .collect()
    }

    /// Weighted sum of the three pillar scores, kept inside [0, 100].
    pub fn composite(&self, pillars: &PillarScores) -> f64 {
        let sum: f64 = Pillar::ALL
            .iter()
            .map(|p| pillars.get(*p) * self.config.pillar(*p).weight)
            .sum();
        sum.clamp(0.0, 100.0)
    }
}

/// Cross-sectional summary of a scored snapshot. A single snapshot has no
/// previous month, so `monthly_change` is 0 here.
pub fn summarize(snapshot: &[ScoredRecord]) -> EngineResult<NationalSummary> {
    let top = snapshot
        .iter()
        .fold(None::<&ScoredRecord>, |best, r| match best {
            Some(b) if b.aghi_score >= r.aghi_score => Some(b),
            _ => Some(r),
        })
        .ok_or(EngineError::EmptySnapshot)?;
    let bottom = snapshot
        .iter()
        .fold(None::<&ScoredRecord>, |worst, r| match worst {
            Some(w) if w.aghi_score <= r.aghi_score => Some(w),
            _ => Some(r),
        })
        .ok_or(EngineError::EmptySnapshot)?;

    let scores: Vec<f64> = snapshot.iter().map(|r| r.aghi_score).collect();
    let national_aghi = mean(&scores);

    let districts: BTreeSet<&str> = snapshot.iter().map(|r| r.record.district.as_str()).collect();
    let count_in = |cat: PerformanceCategory| {
        snapshot.iter().filter(|r| r.performance_category == cat).count()
    };

    Ok(NationalSummary {
        national_aghi,
        top_state:            top.record.state.clone(),
        top_district:         top.record.district.clone(),
        top_score:            top.aghi_score,
        top_pillar:           top.pillars.strongest().short_label().to_string(),
        bottom_state:         bottom.record.state.clone(),
        bottom_district:      bottom.record.district.clone(),
        bottom_score:         bottom.aghi_score,
        total_districts:      districts.len(),
        excellent_performers: count_in(PerformanceCategory::Excellent),
        critical_performers:  count_in(PerformanceCategory::Critical),
        avg_enrollment_rate:  metric_mean(snapshot, Metric::EnrollmentSuccessRate),
        avg_update_rate:      metric_mean(snapshot, Metric::UpdateSuccessRate),
        inclusion_rate:       metric_mean(snapshot, Metric::YouthCoverageRatio),
        resilience_index:     resilience_index(&scores),
        monthly_change:       0.0,
    })
}

/// 100 − coefficient of variation (in percent). 50 when the mean is ≤ 0.
pub fn resilience_index(scores: &[f64]) -> f64 {
    let m = mean(scores);
    if m > 0.0 {
        100.0 - (sample_std(scores) / m * 100.0)
    } else {
        50.0
    }
}

/// Mean of a metric over the records that carry a finite value, else 0.
pub fn metric_mean(snapshot: &[ScoredRecord], metric: Metric) -> f64 {
    let values: Vec<f64> = snapshot
        .iter()
        .filter_map(|r| r.get(metric))
        .filter(|v| v.is_finite())
        .collect();
    mean(&values)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1). 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}
