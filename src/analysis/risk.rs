//! Rolling risk index: where the close sits inside its trailing min/max envelope.
//!
//! `0` means the close is at the trailing low, `1` at the trailing high.
//!
//! Undefined values (warm-up before `min_periods`, flat envelopes) are filled
//! from the next defined value forward in time. Anything still undefined after
//! that takes the neutral fallback `0.5`. Values are then clipped to `[0, 1]`
//! and smoothed with a centered moving average.

use crate::domain::{PriceSeries, RiskParams, RiskRow, RiskSeries};
use crate::error::AnalysisError;
use crate::math::{backfill, centered_mean, trailing_min_max};

/// Risk assigned when no defined value can be borrowed.
pub const NEUTRAL_RISK: f64 = 0.5;

pub fn risk_index(series: &PriceSeries, params: RiskParams) -> Result<RiskSeries, AnalysisError> {
    if series.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }
    let params = params.normalized();
    let closes = series.closes();

    let envelope = trailing_min_max(&closes, params.window, params.min_periods);
    let raw: Vec<Option<f64>> = closes
        .iter()
        .zip(&envelope)
        .map(|(&close, env)| match *env {
            Some((lo, hi)) if hi > lo => Some((close - lo) / (hi - lo)).filter(|v| v.is_finite()),
            _ => None,
        })
        .collect();
    let undefined_count = raw.iter().filter(|v| v.is_none()).count();

    let filled = backfill(&raw);
    let used_fallback = filled.iter().any(Option::is_none);

    let clipped: Vec<f64> = filled
        .iter()
        .map(|v| v.unwrap_or(NEUTRAL_RISK).clamp(0.0, 1.0))
        .collect();
    let smoothed = centered_mean(&clipped, params.smoothing_window);

    let rows = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| RiskRow {
            date: p.date,
            close: p.close,
            raw_risk: raw[i],
            clipped_risk: clipped[i],
            smoothed_risk: smoothed[i].clamp(0.0, 1.0),
        })
        .collect();

    Ok(RiskSeries {
        params,
        rows,
        undefined_count,
        used_fallback,
    })
}
