//! Region/month records and the metric columns they carry.
//!
//! RULE: Every numeric column is a `Metric`. A record either carries a
//! value for a metric or it does not; there is no "missing = 0" shortcut
//! inside the scoring core. Zero-filling belongs to ingestion.

use crate::{
    error::{EngineError, EngineResult},
    types::{month_start, Month, RegionKey},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ── Metric columns ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    // Raw counters
    EnrollmentTotal,
    EnrollmentRejected,
    EnrollmentPending,
    #[serde(rename = "age_0_5")]
    Age0To5,
    #[serde(rename = "age_5_17")]
    Age5To17,
    DemoUpdates,
    DemoRejected,
    BioUpdates,
    BioRejected,
    // Derived rates
    EnrollmentSuccessRate,
    TotalUpdates,
    UpdateSuccessRate,
    EnrollmentRejectionRate,
    TotalUpdatesPerEnrollment,
    YouthCoverageRatio,
    GovernanceImbalance,
    PendingRatio,
    ProcessingDays,
}

/// How an indicator is mapped onto the 0–100 "higher is better" scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorClass {
    /// Lower is better, scaled against the snapshot maximum.
    Cost,
    /// Lower is better, already on a 0–100 scale.
    BoundedRate,
    /// Higher is better, min-max rescaled over the snapshot.
    Benefit,
}

impl Metric {
    /// Column order. Fallback feature selection walks this list.
    pub const ALL: [Metric; 18] = [
        Metric::EnrollmentTotal,
        Metric::EnrollmentRejected,
        Metric::EnrollmentPending,
        Metric::Age0To5,
        Metric::Age5To17,
        Metric::DemoUpdates,
        Metric::DemoRejected,
        Metric::BioUpdates,
        Metric::BioRejected,
        Metric::EnrollmentSuccessRate,
        Metric::TotalUpdates,
        Metric::UpdateSuccessRate,
        Metric::EnrollmentRejectionRate,
        Metric::TotalUpdatesPerEnrollment,
        Metric::YouthCoverageRatio,
        Metric::GovernanceImbalance,
        Metric::PendingRatio,
        Metric::ProcessingDays,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::EnrollmentTotal           => "enrollment_total",
            Self::EnrollmentRejected        => "enrollment_rejected",
            Self::EnrollmentPending         => "enrollment_pending",
            Self::Age0To5                   => "age_0_5",
            Self::Age5To17                  => "age_5_17",
            Self::DemoUpdates               => "demo_updates",
            Self::DemoRejected              => "demo_rejected",
            Self::BioUpdates                => "bio_updates",
            Self::BioRejected               => "bio_rejected",
            Self::EnrollmentSuccessRate     => "enrollment_success_rate",
            Self::TotalUpdates              => "total_updates",
            Self::UpdateSuccessRate         => "update_success_rate",
            Self::EnrollmentRejectionRate   => "enrollment_rejection_rate",
            Self::TotalUpdatesPerEnrollment => "total_updates_per_enrollment",
            Self::YouthCoverageRatio        => "youth_coverage_ratio",
            Self::GovernanceImbalance       => "governance_imbalance",
            Self::PendingRatio              => "pending_ratio",
            Self::ProcessingDays            => "processing_days",
        }
    }

    pub fn indicator_class(&self) -> IndicatorClass {
        match self {
            Self::ProcessingDays
            | Self::EnrollmentRejected
            | Self::EnrollmentPending
            | Self::DemoRejected
            | Self::BioRejected => IndicatorClass::Cost,
            Self::PendingRatio
            | Self::EnrollmentRejectionRate
            | Self::GovernanceImbalance => IndicatorClass::BoundedRate,
            _ => IndicatorClass::Benefit,
        }
    }

    /// Percent-scale columns are clipped to [0, 100] after a simulated
    /// adjustment; everything else is only floored at 0.
    pub fn is_percent_scale(&self) -> bool {
        let name = self.name();
        name.contains("rate") || name.contains("ratio")
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| EngineError::UnknownMetric { name: s.to_string() })
    }
}

// ── Metric values ────────────────────────────────────────────────────────────

/// One optional value per metric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_total:             Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_rejected:          Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_pending:           Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_0_5:                      Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_5_17:                     Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_updates:                 Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_rejected:                Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio_updates:                  Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio_rejected:                 Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_success_rate:      Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_updates:                Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_success_rate:          Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_rejection_rate:    Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_updates_per_enrollment: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youth_coverage_ratio:         Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance_imbalance:         Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_ratio:                Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_days:              Option<f64>,
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        *self.slot(metric)
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        *self.slot_mut(metric) = Some(value);
    }

    fn slot(&self, metric: Metric) -> &Option<f64> {
        match metric {
            Metric::EnrollmentTotal           => &self.enrollment_total,
            Metric::EnrollmentRejected        => &self.enrollment_rejected,
            Metric::EnrollmentPending         => &self.enrollment_pending,
            Metric::Age0To5                   => &self.age_0_5,
            Metric::Age5To17                  => &self.age_5_17,
            Metric::DemoUpdates               => &self.demo_updates,
            Metric::DemoRejected              => &self.demo_rejected,
            Metric::BioUpdates                => &self.bio_updates,
            Metric::BioRejected               => &self.bio_rejected,
            Metric::EnrollmentSuccessRate     => &self.enrollment_success_rate,
            Metric::TotalUpdates              => &self.total_updates,
            Metric::UpdateSuccessRate         => &self.update_success_rate,
            Metric::EnrollmentRejectionRate   => &self.enrollment_rejection_rate,
            Metric::TotalUpdatesPerEnrollment => &self.total_updates_per_enrollment,
            Metric::YouthCoverageRatio        => &self.youth_coverage_ratio,
            Metric::GovernanceImbalance       => &self.governance_imbalance,
            Metric::PendingRatio              => &self.pending_ratio,
            Metric::ProcessingDays            => &self.processing_days,
        }
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::EnrollmentTotal           => &mut self.enrollment_total,
            Metric::EnrollmentRejected        => &mut self.enrollment_rejected,
            Metric::EnrollmentPending         => &mut self.enrollment_pending,
            Metric::Age0To5                   => &mut self.age_0_5,
            Metric::Age5To17                  => &mut self.age_5_17,
            Metric::DemoUpdates               => &mut self.demo_updates,
            Metric::DemoRejected              => &mut self.demo_rejected,
            Metric::BioUpdates                => &mut self.bio_updates,
            Metric::BioRejected               => &mut self.bio_rejected,
            Metric::EnrollmentSuccessRate     => &mut self.enrollment_success_rate,
            Metric::TotalUpdates              => &mut self.total_updates,
            Metric::UpdateSuccessRate         => &mut self.update_success_rate,
            Metric::EnrollmentRejectionRate   => &mut self.enrollment_rejection_rate,
            Metric::TotalUpdatesPerEnrollment => &mut self.total_updates_per_enrollment,
            Metric::YouthCoverageRatio        => &mut self.youth_coverage_ratio,
            Metric::GovernanceImbalance       => &mut self.governance_imbalance,
            Metric::PendingRatio              => &mut self.pending_ratio,
            Metric::ProcessingDays            => &mut self.processing_days,
        }
    }
}

// ── Record ───────────────────────────────────────────────────────────────────

/// One (state, district, month) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub state:    String,
    pub district: String,
    pub month:    Month,
    #[serde(flatten)]
    pub metrics:  Metrics,
}

impl Record {
    pub fn new(state: impl Into<String>, district: impl Into<String>, month: NaiveDate) -> Self {
        Self {
            state:    state.into(),
            district: district.into(),
            month:    month_start(month),
            metrics:  Metrics::default(),
        }
    }

    /// Builder-style setter, mostly for fixtures and imports.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.set(metric, value);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(metric)
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.metrics.set(metric, value);
    }

    pub fn key(&self) -> RegionKey {
        RegionKey::new(self.state.clone(), self.district.clone(), self.month)
    }
}

/// Percentage of `num` over `den`, 0 when there is no denominator.
fn percent(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den * 100.0
    } else {
        0.0
    }
}

/// Recompute the derived rate columns from the raw counters.
///
/// Absent counters count as 0, matching how ingestion fills merged
/// datasets. `processing_days` is left untouched: it comes from
/// application/completion dates the counters know nothing about.
pub fn derive_metrics(record: &mut Record) {
    let raw = |m: Metric| record.get(m).unwrap_or(0.0);

    let total         = raw(Metric::EnrollmentTotal);
    let rejected      = raw(Metric::EnrollmentRejected);
    let pending       = raw(Metric::EnrollmentPending);
    let demo_updates  = raw(Metric::DemoUpdates);
    let demo_rejected = raw(Metric::DemoRejected);
    let bio_updates   = raw(Metric::BioUpdates);
    let bio_rejected  = raw(Metric::BioRejected);
    let youth         = raw(Metric::Age0To5) + raw(Metric::Age5To17);

    let total_updates = demo_updates + bio_updates;
    let update_success = percent(
        (demo_updates - demo_rejected) + (bio_updates - bio_rejected),
        total_updates,
    );
    let rejection_rate = percent(rejected, total);
    let per_enrollment = if total > 0.0 { total_updates / total } else { 0.0 };

    record.set(Metric::EnrollmentSuccessRate, percent(total - rejected, total));
    record.set(Metric::TotalUpdates, total_updates);
    record.set(Metric::UpdateSuccessRate, update_success);
    record.set(Metric::EnrollmentRejectionRate, rejection_rate);
    record.set(Metric::TotalUpdatesPerEnrollment, per_enrollment);
    record.set(Metric::YouthCoverageRatio, percent(youth, total));
    record.set(Metric::GovernanceImbalance, (rejection_rate + (100.0 - update_success)) / 2.0);
    record.set(Metric::PendingRatio, percent(pending, total));
}
