//! Outlier detection and repair for ratio series.
//!
//! A point is flagged when it sits more than `threshold` rolling standard
//! deviations away from the rolling median of its centered window. Flagged
//! points are replaced by linear interpolation between the nearest unflagged
//! neighbors.
//!
//! One detect-then-repair pass can leave a point that the repaired series
//! would flag again, so cleaning twice would move it. `settled_mask` adds such
//! points to the mask and repairs the original values again until the repaired
//! series raises no new flag. The mask only grows, so this takes at most
//! `values.len()` rounds, and cleaning the cleaned series changes nothing
//! beyond float rounding.
//!
//! A window whose standard deviation is zero (constant values) or undefined
//! (one observation) never flags its center point.
//!
//! Note on the default (`window = 5`, `threshold = 3.0`): inside five points the
//! distance from the median is bounded by about `2.68` sample standard
//! deviations, so the default filter leaves every series unchanged. Lower the
//! threshold to make it bite.

use crate::domain::OutlierParams;
use crate::math::{centered_median, centered_std, fill_masked};

/// Clean `values` with the default window and threshold.
pub fn clean(values: &[f64]) -> Vec<f64> {
    clean_with(values, OutlierParams::default())
}

pub fn clean_with(values: &[f64], params: OutlierParams) -> Vec<f64> {
    let mask = settled_mask(values, params, &[]);
    repair(values, &mask)
}

/// Outlier mask whose repair is stable under another cleaning pass.
///
/// Positions listed in `exempt` are never masked.
pub fn settled_mask(values: &[f64], params: OutlierParams, exempt: &[usize]) -> Vec<bool> {
    let mut mask = detect(values, params);
    for &i in exempt {
        if let Some(m) = mask.get_mut(i) {
            *m = false;
        }
    }

    loop {
        if !mask.iter().any(|&m| m) {
            return mask;
        }
        let repaired = repair(values, &mask);
        let mut grew = false;
        for (i, flagged) in detect(&repaired, params).into_iter().enumerate() {
            if flagged && !mask[i] && !exempt.contains(&i) {
                mask[i] = true;
                grew = true;
            }
        }
        if !grew {
            return mask;
        }
    }
}

/// Outlier mask: `true` where the value fails the rolling median test.
pub fn detect(values: &[f64], params: OutlierParams) -> Vec<bool> {
    let medians = centered_median(values, params.window);
    let stds = centered_std(values, params.window);

    values
        .iter()
        .zip(medians)
        .zip(stds)
        .map(|((&v, median), std)| match std {
            Some(s) if s > 0.0 => (v - median).abs() > params.threshold * s,
            _ => false,
        })
        .collect()
}

/// Replace masked values by interpolation against unmasked neighbors.
pub fn repair(values: &[f64], mask: &[bool]) -> Vec<f64> {
    if !mask.iter().any(|&m| m) {
        return values.to_vec();
    }
    fill_masked(values, mask)
}
