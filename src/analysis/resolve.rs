//! Nearest-date resolution.
//!
//! Requested anchor dates (a peak, a halving) often fall on days the source
//! has no observation for. They are mapped to the closest date that exists.
//! On an exact midpoint between two observations the earlier date wins.

use chrono::NaiveDate;

use crate::domain::PriceSeries;
use crate::error::AnalysisError;

/// Resolve `requested` to the closest date present in `series`.
pub fn resolve(series: &PriceSeries, requested: NaiveDate) -> Result<NaiveDate, AnalysisError> {
    let idx = resolve_index(series, requested)?;
    series
        .get(idx)
        .map(|p| p.date)
        .ok_or(AnalysisError::EmptySeries)
}

/// Row index of the date `resolve` would return.
pub fn resolve_index(series: &PriceSeries, requested: NaiveDate) -> Result<usize, AnalysisError> {
    let points = series.points();
    if points.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }

    // First row at or after `requested`.
    let after = points.partition_point(|p| p.date < requested);
    if after < points.len() && points[after].date == requested {
        return Ok(after);
    }

    let before = after.checked_sub(1);
    let after = (after < points.len()).then_some(after);

    match (before, after) {
        (Some(b), Some(a)) => {
            let gap_before = (requested - points[b].date).num_days();
            let gap_after = (points[a].date - requested).num_days();
            Ok(if gap_before <= gap_after { b } else { a })
        }
        (Some(b), None) => Ok(b),
        (None, Some(a)) => Ok(a),
        (None, None) => Err(AnalysisError::EmptySeries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(dates: &[NaiveDate]) -> PriceSeries {
        PriceSeries::from_points(dates.iter().map(|&dt| PricePoint::new(dt, 1.0)).collect())
    }

    #[test]
    fn exact_match_returns_itself() {
        let s = series(&[d(2024, 1, 1), d(2024, 1, 5), d(2024, 1, 9)]);
        assert_eq!(resolve(&s, d(2024, 1, 5)).unwrap(), d(2024, 1, 5));
    }

    #[test]
    fn picks_the_closer_neighbor() {
        let s = series(&[d(2024, 1, 1), d(2024, 1, 5), d(2024, 1, 9)]);
        assert_eq!(resolve(&s, d(2024, 1, 2)).unwrap(), d(2024, 1, 1));
        assert_eq!(resolve(&s, d(2024, 1, 4)).unwrap(), d(2024, 1, 5));
    }

    #[test]
    fn midpoint_prefers_earlier_date() {
        let s = series(&[d(2024, 1, 1), d(2024, 1, 5)]);
        // Jan 3 is two days from both neighbors.
        assert_eq!(resolve(&s, d(2024, 1, 3)).unwrap(), d(2024, 1, 1));
    }

    #[test]
    fn outside_the_series_clamps_to_the_ends() {
        let s = series(&[d(2024, 1, 1), d(2024, 1, 5)]);
        assert_eq!(resolve(&s, d(2020, 1, 1)).unwrap(), d(2024, 1, 1));
        assert_eq!(resolve(&s, d(2030, 1, 1)).unwrap(), d(2024, 1, 5));
    }

    #[test]
    fn empty_series_is_an_error() {
        let s = PriceSeries::default();
        assert_eq!(resolve(&s, d(2024, 1, 1)), Err(AnalysisError::EmptySeries));
    }

    #[test]
    fn resolved_date_is_a_member_with_no_closer_date() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = d(2020, 1, 1);

        for _ in 0..50 {
            let n = rng.gen_range(1..40);
            let dates: Vec<NaiveDate> = (0..n)
                .map(|_| base + chrono::Duration::days(rng.gen_range(0..400)))
                .collect();
            let s = series(&dates);

            for _ in 0..20 {
                let requested = base + chrono::Duration::days(rng.gen_range(-30..430));
                let got = resolve(&s, requested).unwrap();
                assert!(s.index_of(got).is_some());

                let best = (got - requested).num_days().abs();
                for p in s.points() {
                    let dist = (p.date - requested).num_days().abs();
                    assert!(dist >= best);
                    if dist == best {
                        assert!(got <= p.date, "tie must resolve to the earlier date");
                    }
                }
            }
        }
    }
}
