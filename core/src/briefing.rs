//! Executive briefing: a structured, section-by-section report assembled
//! from the national summary and a diagnosis. Pure text assembly; no
//! scoring happens here.

use crate::{
    diagnostics_engine::{Diagnosis, Trend},
    scorer::NationalSummary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingSection {
    pub title:   String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Briefing {
    pub report_id:    Uuid,
    pub generated_at: DateTime<Utc>,
    pub target:       String,
    pub sections:     Vec<BriefingSection>,
}

impl Briefing {
    pub fn build(summary: &NationalSummary, diagnosis: &Diagnosis) -> Self {
        let sections = vec![
            section("Executive Overview", overview(summary, diagnosis)),
            section("Operational Diagnostics", operational(diagnosis)),
            section("Governance Velocity", velocity(diagnosis.trend)),
            section("Governance DNA Profile", profile(diagnosis)),
            section("Strategic Recommendations", recommendations(diagnosis)),
        ];
        Self {
            report_id:    Uuid::new_v4(),
            generated_at: Utc::now(),
            target:       diagnosis.target.clone(),
            sections,
        }
    }

    pub fn section(&self, title: &str) -> Option<&BriefingSection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

fn section(title: &str, content: String) -> BriefingSection {
    BriefingSection { title: title.to_string(), content }
}

fn overview(summary: &NationalSummary, diagnosis: &Diagnosis) -> String {
    format!(
        "National AGHI stands at {:.1} across {} districts ({} excellent, {} critical). \
         {} leads at {:.1} ({}); {} trails at {:.1}. Resilience index: {:.1}. \
         Report scope: {} ({}).",
        summary.national_aghi,
        summary.total_districts,
        summary.excellent_performers,
        summary.critical_performers,
        summary.top_district,
        summary.top_score,
        summary.top_state,
        summary.bottom_district,
        summary.bottom_score,
        summary.resilience_index,
        diagnosis.target,
        diagnosis.month.format("%Y-%m"),
    )
}

fn operational(diagnosis: &Diagnosis) -> String {
    let primary = &diagnosis.primary_pillar_issue;
    format!(
        "Primary weakness: {} at {:.1} (gap {:.1} vs reference). {}",
        primary.label, primary.score, primary.gap, diagnosis.diagnosis
    )
}

fn velocity(trend: Trend) -> String {
    match trend {
        Trend::Improving => "Governance momentum is positive: the composite score rose month over month.".into(),
        Trend::Declining => "Governance momentum is negative: the composite score fell month over month.".into(),
        Trend::Stable => "Governance momentum is flat: no material month-over-month change.".into(),
    }
}

fn profile(diagnosis: &Diagnosis) -> String {
    diagnosis
        .all_pillars
        .iter()
        .map(|p| format!("{}: {:.1} (national {:.1})", p.id.short_label(), p.score, p.national_avg))
        .collect::<Vec<_>>()
        .join("; ")
}

fn recommendations(diagnosis: &Diagnosis) -> String {
    let focus = match diagnosis.critical_districts.first() {
        Some(district) => format!("Prioritize field intervention in {district}."),
        None => "No critical districts identified.".to_string(),
    };
    format!(
        "{focus} Direct remediation at {} before secondary pillars.",
        diagnosis.primary_pillar_issue.label
    )
}
