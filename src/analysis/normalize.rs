//! Cycle normalization: anchor-relative trajectories on a day-offset axis.
//!
//! Steps for one `AnchorSpec`:
//! 1. resolve start and end dates to observations that exist
//! 2. slice the closed interval `[start, end]`
//! 3. re-index rows to offsets `0..n-1` (observations, not calendar days)
//! 4. `raw_ratio = close / anchor_close`
//! 5. repair outliers in the ratio series (the anchor row itself is exempt)

use rayon::prelude::*;

use crate::analysis::resolve::resolve;
use crate::analysis::smooth::{repair, settled_mask};
use crate::domain::{AnchorEnd, AnchorSpec, OutlierParams, PriceSeries, Trajectory, TrajectoryRow};
use crate::error::AnalysisError;

/// Result of normalizing one anchor inside a batch.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub anchor: AnchorSpec,
    pub result: Result<Trajectory, AnalysisError>,
}

/// Normalize one cycle with the default outlier settings.
pub fn normalize(series: &PriceSeries, anchor: &AnchorSpec) -> Result<Trajectory, AnalysisError> {
    normalize_with(series, anchor, OutlierParams::default())
}

pub fn normalize_with(
    series: &PriceSeries,
    anchor: &AnchorSpec,
    params: OutlierParams,
) -> Result<Trajectory, AnalysisError> {
    let start = resolve(series, anchor.start)?;
    let end = match anchor.end {
        AnchorEnd::Date(date) => resolve(series, date)?,
        AnchorEnd::SeriesEnd => series.last().ok_or(AnalysisError::EmptySeries)?.date,
    };

    if start > end {
        return Err(AnalysisError::InvalidRange { start, end });
    }

    let slice = series.slice(start, end);
    let Some(anchor_point) = slice.first() else {
        return Err(AnalysisError::EmptyRange { start, end });
    };
    let anchor_close = anchor_point.close;

    let raw: Vec<f64> = slice.iter().map(|p| p.close / anchor_close).collect();

    // The anchor row defines the ratio; it is never repaired.
    let mask = settled_mask(&raw, params, &[0]);
    let cleaned = repair(&raw, &mask);

    let rows = slice
        .iter()
        .zip(raw.iter().zip(cleaned.iter()))
        .enumerate()
        .map(|(day_offset, (p, (&raw_ratio, &cleaned_ratio)))| TrajectoryRow {
            day_offset,
            date: p.date,
            close: p.close,
            raw_ratio,
            cleaned_ratio,
        })
        .collect();

    let repaired = mask
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect();

    let trajectory = Trajectory {
        label: anchor.label.clone(),
        requested_start: anchor.start,
        start,
        end,
        anchor_close,
        rows,
        repaired,
    };

    if let Some(summary) = trajectory.summary() {
        log::info!(
            "{}: anchor {} @ {:.2} -> ratio {:.4} ({:.2}) after {} days, {} repaired",
            summary.label,
            summary.anchor_date,
            summary.anchor_close,
            summary.final_ratio,
            summary.end_close,
            summary.last_offset,
            trajectory.repaired.len(),
        );
    }

    Ok(trajectory)
}

/// Normalize every anchor against the same series.
///
/// Cycles are independent and run in parallel; outcomes keep input order and a
/// failing cycle does not affect the others.
pub fn normalize_all(series: &PriceSeries, anchors: &[AnchorSpec], params: OutlierParams) -> Vec<CycleOutcome> {
    anchors
        .par_iter()
        .map(|anchor| CycleOutcome {
            anchor: anchor.clone(),
            result: normalize_with(series, anchor, params),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(rows: &[(NaiveDate, f64)]) -> PriceSeries {
        PriceSeries::from_points(rows.iter().map(|&(dt, c)| PricePoint::new(dt, c)).collect())
    }

    #[test]
    fn unlisted_anchor_uses_the_resolved_price() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 4), 200.0),
            (d(2024, 1, 5), 300.0),
            (d(2024, 1, 6), 100.0),
        ]);
        // Jan 3 is closer to Jan 4 than to Jan 1.
        let anchor = AnchorSpec::to_series_end("c", d(2024, 1, 3));
        let t = normalize(&s, &anchor).unwrap();

        assert_eq!(t.start, d(2024, 1, 4));
        assert_eq!(t.requested_start, d(2024, 1, 3));
        assert_eq!(t.anchor_close, 200.0);
        assert_eq!(t.rows[0].raw_ratio, 1.0);
        assert_eq!(t.rows[0].cleaned_ratio, 1.0);
        assert_eq!(t.rows[1].raw_ratio, 1.5);
        assert_eq!(t.rows[2].raw_ratio, 0.5);
    }

    #[test]
    fn offsets_count_observations_across_gaps() {
        let s = series(&[
            (d(2024, 1, 1), 10.0),
            (d(2024, 1, 2), 11.0),
            (d(2024, 1, 10), 12.0),
            (d(2024, 2, 1), 13.0),
        ]);
        let t = normalize(&s, &AnchorSpec::until("c", d(2024, 1, 1), d(2024, 2, 1))).unwrap();

        let offsets: Vec<usize> = t.rows.iter().map(|r| r.day_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
        assert_eq!(t.end, d(2024, 2, 1));
    }

    #[test]
    fn end_date_is_resolved_and_inclusive() {
        let s = series(&[
            (d(2024, 1, 1), 10.0),
            (d(2024, 1, 2), 20.0),
            (d(2024, 1, 3), 30.0),
            (d(2024, 1, 9), 40.0),
        ]);
        // Jan 4 resolves to Jan 3.
        let t = normalize(&s, &AnchorSpec::until("c", d(2024, 1, 2), d(2024, 1, 4))).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.last().unwrap().date, d(2024, 1, 3));
        assert_eq!(t.last().unwrap().raw_ratio, 1.5);
    }

    #[test]
    fn start_after_end_is_invalid() {
        let s = series(&[(d(2024, 1, 1), 1.0), (d(2024, 1, 2), 2.0), (d(2024, 1, 3), 3.0)]);

        let err = normalize(&s, &AnchorSpec::until("c", d(2024, 1, 3), d(2024, 1, 1))).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidRange {
                start: d(2024, 1, 3),
                end: d(2024, 1, 1)
            }
        );

        // A start past the data resolves to the last row, after a mid-series end.
        let err = normalize(&s, &AnchorSpec::until("c", d(2025, 1, 1), d(2024, 1, 2))).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRange { .. }));
    }

    #[test]
    fn empty_series_is_reported() {
        let err = normalize(&PriceSeries::default(), &AnchorSpec::to_series_end("c", d(2024, 1, 1))).unwrap_err();
        assert_eq!(err, AnalysisError::EmptySeries);
    }

    #[test]
    fn single_row_cycle_is_valid() {
        let s = series(&[(d(2024, 1, 1), 1.0), (d(2024, 1, 2), 2.0)]);
        let t = normalize(&s, &AnchorSpec::to_series_end("c", d(2024, 1, 2))).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].cleaned_ratio, 1.0);
    }

    #[test]
    fn anchor_row_is_never_repaired() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 150.0),
            (d(2024, 1, 3), 160.0),
            (d(2024, 1, 4), 170.0),
        ]);
        // A zero threshold flags every point that differs from its local median.
        let params = OutlierParams { window: 5, threshold: 0.0 };
        let t = normalize_with(&s, &AnchorSpec::to_series_end("c", d(2024, 1, 1)), params).unwrap();

        assert_eq!(t.rows[0].cleaned_ratio, 1.0);
        assert!(!t.repaired.contains(&0));
    }

    #[test]
    fn spike_inside_a_cycle_is_flattened() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 110.0),
            (d(2024, 1, 3), 300.0),
            (d(2024, 1, 4), 130.0),
            (d(2024, 1, 5), 140.0),
        ]);
        let params = OutlierParams { window: 5, threshold: 2.0 };
        let t = normalize_with(&s, &AnchorSpec::to_series_end("c", d(2024, 1, 1)), params).unwrap();

        assert_eq!(t.repaired, vec![2]);
        assert_eq!(t.rows[2].raw_ratio, 3.0);
        let cleaned = t.rows[2].cleaned_ratio;
        assert!(cleaned > 1.1 && cleaned < 1.3, "got {cleaned}");
        assert_eq!(t.rows[0].cleaned_ratio, 1.0);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let s = series(&[
            (d(2024, 1, 1), 1.0),
            (d(2024, 1, 2), 2.0),
            (d(2024, 1, 3), 4.0),
        ]);
        let anchors = vec![
            AnchorSpec::to_series_end("a", d(2024, 1, 1)),
            AnchorSpec::until("bad", d(2024, 1, 3), d(2024, 1, 1)),
            AnchorSpec::to_series_end("c", d(2024, 1, 2)),
        ];

        let out = normalize_all(&s, &anchors, OutlierParams::default());
        let labels: Vec<&str> = out.iter().map(|o| o.anchor.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "bad", "c"]);
        assert!(out[0].result.is_ok());
        assert!(out[1].result.is_err());
        let c = out[2].result.as_ref().unwrap();
        assert_eq!(c.rows[1].raw_ratio, 2.0);
    }

    #[test]
    fn summary_reports_the_last_row() {
        let s = series(&[
            (d(2024, 1, 1), 100.0),
            (d(2024, 1, 2), 50.0),
            (d(2024, 1, 3), 80.0),
        ]);
        let t = normalize(&s, &AnchorSpec::to_series_end("c", d(2024, 1, 1))).unwrap();
        let summary = t.summary().unwrap();

        assert_eq!(summary.last_offset, 2);
        assert_eq!(summary.end_close, 80.0);
        assert!((summary.change_pct - (-20.0)).abs() < 1e-9);
        assert_eq!(summary.trough_offset, 1);
        assert_eq!(summary.peak_offset, 0);
    }
}
