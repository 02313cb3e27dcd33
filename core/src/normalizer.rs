//! Indicator normalization: raw metric column to a 0–100 "higher is
//! better" scale.
//!
//! Policy by indicator class:
//!   - Cost:        100 × (1 − value / snapshot max); 100 everywhere when
//!                  no cost is observed (max ≤ 0) or every value is identical
//!   - BoundedRate: 100 − value when value ≤ 100, else 0 (saturated)
//!   - Benefit:     min-max rescale over the snapshot; the degenerate
//!                  min == max case yields `degenerate_score` for everyone
//!
//! Bounds are taken over the records that carry a finite value for the
//! indicator. Records without one get `None` at their position.

use crate::record::{IndicatorClass, Metric, Record};

/// Finite value of `metric` on `record`, if any.
pub fn finite_value(record: &Record, metric: Metric) -> Option<f64> {
    record.get(metric).filter(|v| v.is_finite())
}

/// True if at least one record carries a finite value for `metric`.
pub fn is_present(records: &[Record], metric: Metric) -> bool {
    records.iter().any(|r| finite_value(r, metric).is_some())
}

/// Normalize one indicator across a snapshot, preserving record order.
pub fn normalize(records: &[Record], metric: Metric, degenerate_score: f64) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = records.iter().map(|r| finite_value(r, metric)).collect();
    normalize_values(&values, metric.indicator_class(), degenerate_score)
}

pub fn normalize_values(
    values: &[Option<f64>],
    class: IndicatorClass,
    degenerate_score: f64,
) -> Vec<Option<f64>> {
    let observed = || values.iter().flatten().copied();

    match class {
        IndicatorClass::Cost => {
            let min = observed().fold(f64::INFINITY, f64::min);
            let max = observed().fold(f64::NEG_INFINITY, f64::max);
            let degenerate = max <= 0.0 || min == max;
            values
                .iter()
                .map(|v| {
                    v.map(|v| {
                        if degenerate {
                            100.0
                        } else {
                            clamp_score(100.0 * (1.0 - v / max))
                        }
                    })
                })
                .collect()
        }
        IndicatorClass::BoundedRate => values
            .iter()
            .map(|v| v.map(|v| if v <= 100.0 { clamp_score(100.0 - v) } else { 0.0 }))
            .collect(),
        IndicatorClass::Benefit => {
            let min = observed().fold(f64::INFINITY, f64::min);
            let max = observed().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            values
                .iter()
                .map(|v| {
                    v.map(|v| {
                        if span > 0.0 {
                            clamp_score((v - min) / span * 100.0)
                        } else {
                            degenerate_score
                        }
                    })
                })
                .collect()
        }
    }
}

fn clamp_score(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}
