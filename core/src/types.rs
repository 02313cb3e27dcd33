//! Shared primitive types used across the entire engine.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar month, always stored as the first day of that month.
pub type Month = NaiveDate;

/// Target name that selects the whole snapshot instead of one state.
pub const NATIONAL: &str = "National";

/// Normalize any date to the first day of its month.
pub fn month_start(date: NaiveDate) -> Month {
    date.with_day(1).unwrap_or(date)
}

/// Identity of a single record. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    pub state:    String,
    pub district: String,
    pub month:    Month,
}

impl RegionKey {
    pub fn new(state: impl Into<String>, district: impl Into<String>, month: NaiveDate) -> Self {
        Self {
            state:    state.into(),
            district: district.into(),
            month:    month_start(month),
        }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.district, self.state, self.month.format("%Y-%m"))
    }
}

/// What a diagnosis, benchmark or simulation is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    National,
    State(String),
}

impl Target {
    pub fn parse(name: &str) -> Self {
        if name == NATIONAL {
            Target::National
        } else {
            Target::State(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Target::National => NATIONAL,
            Target::State(s) => s,
        }
    }

    /// True if a record from `state` belongs to this target.
    pub fn includes(&self, state: &str) -> bool {
        match self {
            Target::National => true,
            Target::State(s) => s == state,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The three weighted categories that make up the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    OperationalEfficiency,
    DataHealth,
    SystemStability,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [
        Pillar::OperationalEfficiency,
        Pillar::DataHealth,
        Pillar::SystemStability,
    ];

    /// Stable identifier, also the prefix of the `<id>_score` column.
    pub fn id(&self) -> &'static str {
        match self {
            Self::OperationalEfficiency => "operational_efficiency",
            Self::DataHealth            => "data_health",
            Self::SystemStability       => "system_stability",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OperationalEfficiency => "Operational Efficiency",
            Self::DataHealth            => "Data Health",
            Self::SystemStability       => "System Stability",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Self::OperationalEfficiency => "Efficiency",
            Self::DataHealth            => "Health",
            Self::SystemStability       => "Stability",
        }
    }
}
