//! Rolling-window statistics.
//!
//! Two window shapes are used by the analysis:
//!
//! - **centered** windows (outlier detection, risk smoothing): the window for
//!   position `i` spans `window / 2` points to the left and the remainder to the
//!   right. Near the ends it is truncated to the points that exist, so every
//!   position has at least one observation ("minimum observations = 1").
//! - **trailing** windows (risk envelope): the last `window` observations up to
//!   and including `i`, defined only once `min_periods` observations exist.

use std::collections::VecDeque;
use std::ops::Range;

/// Index range of the centered window around `i` in a sequence of length `n`.
pub fn centered_bounds(i: usize, n: usize, window: usize) -> Range<usize> {
    let window = window.max(1);
    let left = window / 2;
    let right = window - 1 - left;
    let lo = i.saturating_sub(left);
    let hi = (i + right + 1).min(n);
    lo..hi
}

/// Median of a non-empty slice (mean of the two middle values for even lengths).
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). `None` below two observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

pub fn centered_median(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| median(&values[centered_bounds(i, n, window)]))
        .collect()
}

pub fn centered_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    (0..n)
        .map(|i| sample_std(&values[centered_bounds(i, n, window)]))
        .collect()
}

pub fn centered_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| mean(&values[centered_bounds(i, n, window)]))
        .collect()
}

/// Trailing `(min, max)` over the last `window` values.
///
/// Uses monotonic deques, so the whole pass is linear in `values.len()`.
pub fn trailing_min_max(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<(f64, f64)>> {
    let window = window.max(1);
    let min_periods = min_periods.clamp(1, window);

    let mut mins: VecDeque<usize> = VecDeque::new();
    let mut maxs: VecDeque<usize> = VecDeque::new();
    let mut out = Vec::with_capacity(values.len());

    for (i, &v) in values.iter().enumerate() {
        while mins.back().is_some_and(|&j| values[j] >= v) {
            mins.pop_back();
        }
        mins.push_back(i);
        while maxs.back().is_some_and(|&j| values[j] <= v) {
            maxs.pop_back();
        }
        maxs.push_back(i);

        let lo = (i + 1).saturating_sub(window);
        while mins.front().is_some_and(|&j| j < lo) {
            mins.pop_front();
        }
        while maxs.front().is_some_and(|&j| j < lo) {
            maxs.pop_front();
        }

        let count = i + 1 - lo;
        if count < min_periods {
            out.push(None);
            continue;
        }
        match (mins.front(), maxs.front()) {
            (Some(&a), Some(&b)) => out.push(Some((values[a], values[b]))),
            _ => out.push(None),
        }
    }

    out
}
