//! Shared domain types.
//!
//! These are plain immutable values passed between the pure analysis functions:
//!
//! - inputs (`PricePoint`, `PriceSeries`, `AnchorSpec`)
//! - outputs (`Trajectory`, `RiskSeries`) and their derived summaries
//! - run configuration (`AnalysisConfig`) derived from CLI flags

use std::ops::Range;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::preset::CyclePreset;

/// One daily close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily close history, sorted ascending by date with unique dates.
///
/// Gaps are allowed: consumers index observations, not calendar days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from observations in arrival order.
    ///
    /// Observations are sorted by date. When a date appears more than once, the
    /// later-arriving observation wins. Closes that are not finite and positive
    /// are dropped, so every close can serve as a ratio denominator.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        // Stable sort keeps arrival order among equal dates.
        points.sort_by_key(|p| p.date);

        let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match out.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => out.push(p),
            }
        }
        Self { points: out }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn get(&self, idx: usize) -> Option<&PricePoint> {
        self.points.get(idx)
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Index of an exact date, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    /// Row indices covering the closed date interval `[start, end]`.
    pub fn index_range(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        lo..hi.max(lo)
    }

    /// Observations within the closed date interval `[start, end]`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> &[PricePoint] {
        &self.points[self.index_range(start, end)]
    }
}

/// Where a cycle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorEnd {
    Date(NaiveDate),
    /// Run to the last available observation.
    SeriesEnd,
}

/// One cycle to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub label: String,
    pub start: NaiveDate,
    pub end: AnchorEnd,
}

impl AnchorSpec {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: AnchorEnd) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn until(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(label, start, AnchorEnd::Date(end))
    }

    pub fn to_series_end(label: impl Into<String>, start: NaiveDate) -> Self {
        Self::new(label, start, AnchorEnd::SeriesEnd)
    }
}

/// One row of a cycle trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    /// Zero-based observation index within the cycle.
    pub day_offset: usize,
    pub date: NaiveDate,
    pub close: f64,
    /// `close / anchor_close`.
    pub raw_ratio: f64,
    /// `raw_ratio` after outlier repair.
    pub cleaned_ratio: f64,
}

/// A cycle re-indexed to day offsets and normalized to its anchor price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub label: String,
    pub requested_start: NaiveDate,
    /// Resolved anchor date (offset 0).
    pub start: NaiveDate,
    /// Resolved end date (last offset).
    pub end: NaiveDate,
    pub anchor_close: f64,
    pub rows: Vec<TrajectoryRow>,
    /// Offsets whose ratio was replaced by the outlier filter.
    pub repaired: Vec<usize>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectoryRow> {
        self.rows.last()
    }

    /// Human-readable figures for reports and logs.
    pub fn summary(&self) -> Option<CycleSummary> {
        let last = self.rows.last()?;

        let mut peak = &self.rows[0];
        let mut trough = &self.rows[0];
        for row in &self.rows {
            if row.cleaned_ratio > peak.cleaned_ratio {
                peak = row;
            }
            if row.cleaned_ratio < trough.cleaned_ratio {
                trough = row;
            }
        }

        Some(CycleSummary {
            label: self.label.clone(),
            anchor_date: self.start,
            anchor_close: self.anchor_close,
            end_date: last.date,
            end_close: last.close,
            change_pct: (last.close / self.anchor_close - 1.0) * 100.0,
            final_ratio: last.cleaned_ratio,
            last_offset: last.day_offset,
            peak_ratio: peak.cleaned_ratio,
            peak_offset: peak.day_offset,
            trough_ratio: trough.cleaned_ratio,
            trough_offset: trough.day_offset,
        })
    }
}

/// Cycle figures derived from a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub label: String,
    pub anchor_date: NaiveDate,
    pub anchor_close: f64,
    pub end_date: NaiveDate,
    pub end_close: f64,
    /// Raw price change from anchor to end, in percent.
    pub change_pct: f64,
    pub final_ratio: f64,
    pub last_offset: usize,
    pub peak_ratio: f64,
    pub peak_offset: usize,
    pub trough_ratio: f64,
    pub trough_offset: usize,
}

/// Outlier filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    /// Centered window size (observations).
    pub window: usize,
    /// Flag when `|x - median| > threshold * std`.
    pub threshold: f64,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 3.0,
        }
    }
}

/// Rolling risk index settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Trailing envelope width (observations).
    pub window: usize,
    /// Minimum observations before the envelope is defined.
    pub min_periods: usize,
    /// Centered moving-average width for the smoothed series.
    pub smoothing_window: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            window: 730,
            min_periods: 180,
            smoothing_window: 7,
        }
    }
}

impl RiskParams {
    /// Clamp to a usable configuration: widths of at least one and
    /// `1 <= min_periods <= window`.
    pub fn normalized(self) -> Self {
        let window = self.window.max(1);
        Self {
            window,
            min_periods: self.min_periods.clamp(1, window),
            smoothing_window: self.smoothing_window.max(1),
        }
    }
}

/// One row of the risk index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub date: NaiveDate,
    pub close: f64,
    /// Envelope position before filling; `None` during warm-up or on a flat window.
    pub raw_risk: Option<f64>,
    /// Filled and clipped to `[0, 1]`.
    pub clipped_risk: f64,
    /// Centered moving average of `clipped_risk`.
    pub smoothed_risk: f64,
}

/// Risk index over a full price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSeries {
    pub params: RiskParams,
    pub rows: Vec<RiskRow>,
    /// Rows whose raw value was undefined before filling.
    pub undefined_count: usize,
    /// True when at least one row took the neutral 0.5 fallback.
    pub used_fallback: bool,
}

impl RiskSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&RiskRow> {
        self.rows.last()
    }
}

/// Presentation bands for the risk index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    pub fn from_value(risk: f64) -> Self {
        if risk < 0.2 {
            RiskLevel::VeryLow
        } else if risk < 0.4 {
            RiskLevel::Low
        } else if risk < 0.6 {
            RiskLevel::Medium
        } else if risk < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }

    /// `[lower, upper)` bounds of the band.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            RiskLevel::VeryLow => (0.0, 0.2),
            RiskLevel::Low => (0.2, 0.4),
            RiskLevel::Medium => (0.4, 0.6),
            RiskLevel::High => (0.6, 0.8),
            RiskLevel::VeryHigh => (0.8, 1.0),
        }
    }
}

/// Where the price history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// CryptoCompare daily history (network).
    #[value(name = "cryptocompare")]
    CryptoCompare,
    /// Local CSV file with `date,close` columns.
    Csv,
    /// Deterministic synthetic series (offline).
    Sample,
}

/// Price source settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: PriceSource,
    pub csv_path: Option<PathBuf>,
    pub symbol: String,
    pub currency: String,
    pub from: NaiveDate,
    /// Last date to fetch; `None` means today.
    pub to: Option<NaiveDate>,
    pub seed: u64,
    /// Length of the synthetic series; `None` spans `from..=to`.
    pub days: Option<usize>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub source: SourceConfig,
    pub preset: CyclePreset,
    /// Custom anchors (JSON) replacing the preset's cycles.
    pub anchors_path: Option<PathBuf>,
    pub outlier: OutlierParams,
    pub risk: RiskParams,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export: Option<PathBuf>,
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn from_points_sorts_and_keeps_last_duplicate() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 3), 30.0),
            PricePoint::new(d(2024, 1, 1), 10.0),
            PricePoint::new(d(2024, 1, 3), 31.0),
            PricePoint::new(d(2024, 1, 2), 20.0),
        ]);

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(series.last().unwrap().close, 31.0);
    }

    #[test]
    fn from_points_drops_unusable_closes() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 1), 0.0),
            PricePoint::new(d(2024, 1, 2), -3.0),
            PricePoint::new(d(2024, 1, 3), f64::NAN),
            PricePoint::new(d(2024, 1, 4), f64::INFINITY),
            PricePoint::new(d(2024, 1, 5), 5.0),
        ]);

        assert_eq!(series.len(), 1);
        assert_eq!(series.first().unwrap().date, d(2024, 1, 5));
    }

    #[test]
    fn slice_is_closed_interval() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 1), 1.0),
            PricePoint::new(d(2024, 1, 2), 2.0),
            PricePoint::new(d(2024, 1, 4), 4.0),
            PricePoint::new(d(2024, 1, 5), 5.0),
        ]);

        let s = series.slice(d(2024, 1, 2), d(2024, 1, 4));
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].close, 2.0);
        assert_eq!(s[1].close, 4.0);

        assert!(series.slice(d(2024, 1, 6), d(2024, 1, 9)).is_empty());
        assert!(series.slice(d(2024, 1, 5), d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn risk_params_are_clamped() {
        let p = RiskParams {
            window: 0,
            min_periods: 10,
            smoothing_window: 0,
        }
        .normalized();
        assert_eq!(p.window, 1);
        assert_eq!(p.min_periods, 1);
        assert_eq!(p.smoothing_window, 1);
    }

    #[test]
    fn risk_levels_follow_bands() {
        assert_eq!(RiskLevel::from_value(0.0), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_value(0.2), RiskLevel::Low);
        assert_eq!(RiskLevel::from_value(0.59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_value(0.79), RiskLevel::High);
        assert_eq!(RiskLevel::from_value(1.0), RiskLevel::VeryHigh);
    }
}
