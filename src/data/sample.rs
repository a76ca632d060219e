//! Synthetic daily price history for offline runs.
//!
//! A geometric random walk with a slow four-year swing in the drift (so the
//! cycle presets have something to show) and rare one-day spikes that exercise
//! the outlier filter. The same seed always yields the same series.

use std::f64::consts::TAU;

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{PricePoint, PriceSeries};
use crate::error::AppError;

/// Length of one synthetic boom/bust swing, in days.
const SWING_DAYS: f64 = 1461.0;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    pub start_price: f64,
    /// Daily log-return volatility.
    pub daily_vol: f64,
    /// Peak-to-trough amplitude of the swing, in log units.
    pub swing_amplitude: f64,
    /// Probability that a given day is a one-day spike.
    pub spike_prob: f64,
    /// Spike size, in multiples of `daily_vol`.
    pub spike_k: f64,
}

impl SampleSpec {
    pub fn new(start: NaiveDate, days: usize, seed: u64) -> Self {
        Self {
            start,
            days,
            seed,
            start_price: 5.0,
            daily_vol: 0.035,
            swing_amplitude: 1.6,
            spike_prob: 0.004,
            spike_k: 12.0,
        }
    }
}

pub fn generate_series(spec: &SampleSpec) -> Result<PriceSeries, AppError> {
    if spec.days == 0 {
        return Err(AppError::new(2, "Sample length must be > 0 days."));
    }
    if !(spec.start_price.is_finite() && spec.start_price > 0.0) {
        return Err(AppError::new(2, "Sample start price must be positive."));
    }
    if !(spec.daily_vol.is_finite() && spec.daily_vol >= 0.0 && spec.swing_amplitude.is_finite()) {
        return Err(AppError::new(2, "Invalid sample volatility settings."));
    }
    if !(0.0..1.0).contains(&spec.spike_prob) || !(spec.spike_k.is_finite() && spec.spike_k > 0.0) {
        return Err(AppError::new(2, "Invalid sample spike settings."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, spec.daily_vol)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    // Slow secular growth on top of the swing.
    let trend = 0.0012;
    let mut log_walk = spec.start_price.ln();
    let mut points = Vec::with_capacity(spec.days);

    for day in 0..spec.days {
        let t = day as f64;
        let swing = 0.5 * spec.swing_amplitude * (TAU * t / SWING_DAYS).sin();
        if day > 0 {
            log_walk += trend + normal.sample(&mut rng);
        }

        let spike = sample_spike(&mut rng, spec.spike_prob, spec.spike_k * spec.daily_vol);
        let close = (log_walk + swing + spike).exp();

        let date = spec
            .start
            .checked_add_signed(Duration::days(day as i64))
            .ok_or_else(|| AppError::new(2, "Sample range overflows the calendar."))?;
        points.push(PricePoint::new(date, close));
    }

    Ok(PriceSeries::from_points(points))
}

// Spikes touch a single day; the walk itself is unaffected.
fn sample_spike(rng: &mut StdRng, prob: f64, size: f64) -> f64 {
    let roll: f64 = rng.r#gen();
    if roll < prob * 0.5 {
        size
    } else if roll < prob {
        -size
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2012, 1, 1).unwrap()
    }

    #[test]
    fn same_seed_same_series() {
        let a = generate_series(&SampleSpec::new(start(), 500, 7)).unwrap();
        let b = generate_series(&SampleSpec::new(start(), 500, 7)).unwrap();
        let c = generate_series(&SampleSpec::new(start(), 500, 8)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn consecutive_positive_days() {
        let s = generate_series(&SampleSpec::new(start(), 3000, 1)).unwrap();

        assert_eq!(s.len(), 3000);
        assert_eq!(s.first().unwrap().date, start());
        assert_eq!(s.last().unwrap().date, start() + Duration::days(2999));
        assert!(s.points().iter().all(|p| p.close.is_finite() && p.close > 0.0));
    }

    #[test]
    fn noise_free_series_follows_the_trend() {
        let mut spec = SampleSpec::new(start(), 2000, 3);
        spec.daily_vol = 0.0;
        spec.swing_amplitude = 0.0;
        spec.spike_k = 1.0;
        // Zero volatility means zero spike size too.
        let flat = generate_series(&spec).unwrap();
        let first = flat.first().unwrap().close;
        let grown = flat.last().unwrap().close / first;
        assert!((grown - (0.0012_f64 * 1999.0).exp()).abs() < 1e-6);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert_eq!(generate_series(&SampleSpec::new(start(), 0, 1)).unwrap_err().exit_code(), 2);

        let mut spec = SampleSpec::new(start(), 10, 1);
        spec.spike_prob = 1.5;
        assert_eq!(generate_series(&spec).unwrap_err().exit_code(), 2);
    }
}
