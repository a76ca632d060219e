//! Reporting utilities: per-cycle lines and risk overview figures.

pub mod format;

pub use format::*;

use chrono::NaiveDate;

use crate::analysis::CycleOutcome;
use crate::domain::{CyclePreset, CycleSummary, RiskLevel, RiskSeries};

/// Event names used to word a cycle report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventNames {
    pub title: &'static str,
    pub anchor: &'static str,
    pub end: &'static str,
}

impl EventNames {
    pub fn for_preset(preset: Option<CyclePreset>) -> Self {
        match preset {
            Some(p) => Self {
                title: p.display_name(),
                anchor: p.anchor_event(),
                end: p.end_event(),
            },
            None => Self {
                title: "ROI from custom anchors",
                anchor: "Anchor",
                end: "End",
            },
        }
    }
}

/// One cycle as shown in the report: either its summary or the reason it failed.
#[derive(Debug, Clone)]
pub struct CycleLine {
    pub label: String,
    pub requested_start: NaiveDate,
    pub outcome: Result<CycleDetail, String>,
}

#[derive(Debug, Clone)]
pub struct CycleDetail {
    pub summary: CycleSummary,
    pub repaired: usize,
}

pub fn cycle_lines(outcomes: &[CycleOutcome]) -> Vec<CycleLine> {
    outcomes
        .iter()
        .map(|o| CycleLine {
            label: o.anchor.label.clone(),
            requested_start: o.anchor.start,
            outcome: match &o.result {
                Ok(t) => t
                    .summary()
                    .map(|summary| CycleDetail {
                        summary,
                        repaired: t.repaired.len(),
                    })
                    .ok_or_else(|| "empty trajectory".to_string()),
                Err(e) => Err(e.to_string()),
            },
        })
        .collect()
}

/// Headline figures of a risk series.
#[derive(Debug, Clone)]
pub struct RiskOverview {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub price_min: f64,
    pub price_max: f64,
    pub risk_min: f64,
    pub risk_max: f64,
    pub current_close: f64,
    pub current_risk: f64,
    pub current_level: RiskLevel,
    /// Days spent in each band (smoothed risk), in `RiskLevel::ALL` order.
    pub days_per_level: [usize; 5],
    pub undefined_count: usize,
    pub used_fallback: bool,
}

pub fn risk_overview(risk: &RiskSeries) -> Option<RiskOverview> {
    let first = risk.rows.first()?;
    let last = risk.rows.last()?;

    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut risk_min = f64::INFINITY;
    let mut risk_max = f64::NEG_INFINITY;
    let mut days_per_level = [0usize; 5];

    for row in &risk.rows {
        price_min = price_min.min(row.close);
        price_max = price_max.max(row.close);
        risk_min = risk_min.min(row.smoothed_risk);
        risk_max = risk_max.max(row.smoothed_risk);

        let level = RiskLevel::from_value(row.smoothed_risk);
        if let Some(idx) = RiskLevel::ALL.iter().position(|l| *l == level) {
            days_per_level[idx] += 1;
        }
    }

    Some(RiskOverview {
        first_date: first.date,
        last_date: last.date,
        price_min,
        price_max,
        risk_min,
        risk_max,
        current_close: last.close,
        current_risk: last.smoothed_risk,
        current_level: RiskLevel::from_value(last.smoothed_risk),
        days_per_level,
        undefined_count: risk.undefined_count,
        used_fallback: risk.used_fallback,
    })
}
