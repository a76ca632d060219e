//! Formatted terminal output.
//!
//! Formatting stays here so the analysis code stays clean and output changes
//! are localized.

use crate::domain::{PriceSeries, RiskLevel, RiskParams};
use crate::report::{CycleLine, EventNames, RiskOverview};

/// Coverage header shared by every report.
pub fn format_series_header(source: &str, series: &PriceSeries) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== cyc - {source} ===\n"));
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => {
            out.push_str(&format!("Data available from {} to {}\n", first.date, last.date));
            out.push_str(&format!("Total days: {}\n", series.len()));
        }
        _ => out.push_str("No data.\n"),
    }
    out
}

/// One block per cycle: anchor, end figures, and repairs.
pub fn format_cycle_report(lines: &[CycleLine], names: EventNames) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", names.title));

    for line in lines {
        out.push_str(&format!("\n{}\n", line.label));
        match &line.outcome {
            Ok(detail) => {
                let s = &detail.summary;
                let moved = if s.anchor_date == line.requested_start {
                    String::new()
                } else {
                    format!(" (requested {})", line.requested_start)
                };
                out.push_str(&format!(
                    "  {}: {} on {}{moved}\n",
                    names.anchor,
                    fmt_money(s.anchor_close),
                    s.anchor_date
                ));
                out.push_str(&format!(
                    "  {}: {} ({}) after {} days, on {}\n",
                    names.end,
                    fmt_money(s.end_close),
                    fmt_pct(s.change_pct),
                    s.last_offset,
                    s.end_date
                ));
                out.push_str(&format!(
                    "  Range: low {:.3}x at day {}, high {:.3}x at day {}\n",
                    s.trough_ratio, s.trough_offset, s.peak_ratio, s.peak_offset
                ));
                if detail.repaired > 0 {
                    out.push_str(&format!("  Outliers repaired: {}\n", detail.repaired));
                }
            }
            Err(reason) => out.push_str(&format!("  skipped: {reason}\n")),
        }
    }

    out
}

pub fn format_risk_report(overview: &RiskOverview, params: RiskParams) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nRisk index (window {}d, min {}d, smoothing {}d)\n",
        params.window, params.min_periods, params.smoothing_window
    ));
    out.push_str(&format!("Date range: {} to {}\n", overview.first_date, overview.last_date));
    out.push_str(&format!(
        "Price range: {} - {}\n",
        fmt_money(overview.price_min),
        fmt_money(overview.price_max)
    ));
    out.push_str(&format!(
        "Risk range: {:.3} - {:.3}\n",
        overview.risk_min, overview.risk_max
    ));
    out.push_str(&format!("Current price: {}\n", fmt_money(overview.current_close)));
    out.push_str(&format!(
        "Current risk: {:.3} ({})\n",
        overview.current_risk,
        overview.current_level.display_name()
    ));

    let total: usize = overview.days_per_level.iter().sum();
    out.push_str("\nDays per band:\n");
    for (level, days) in RiskLevel::ALL.iter().zip(overview.days_per_level) {
        let (lo, hi) = level.bounds();
        let share = if total == 0 { 0.0 } else { days as f64 * 100.0 / total as f64 };
        out.push_str(&format!(
            "  {:<10} [{lo:.1}, {hi:.1})  {days:>6}  {share:>5.1}%\n",
            level.display_name()
        ));
    }

    if overview.undefined_count > 0 {
        out.push_str(&format!(
            "\nWarm-up/flat days filled: {}{}\n",
            overview.undefined_count,
            if overview.used_fallback { " (some at neutral 0.5)" } else { "" }
        ));
    }

    out
}

/// `$1,234.56`; sub-dollar prices keep more precision.
pub fn fmt_money(v: f64) -> String {
    if !v.is_finite() {
        return format!("${v}");
    }
    if v.abs() < 1.0 {
        return format!("${v:.4}");
    }

    let cents = format!("{:.2}", v.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

fn fmt_pct(v: f64) -> String {
    format!("{v:+.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalize_all;
    use crate::domain::{AnchorSpec, CyclePreset, OutlierParams, PricePoint};
    use crate::report::cycle_lines;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn money_has_thousands_separators() {
        assert_eq!(fmt_money(69_044.77), "$69,044.77");
        assert_eq!(fmt_money(1_151.0), "$1,151.00");
        assert_eq!(fmt_money(999.5), "$999.50");
        assert_eq!(fmt_money(0.0495), "$0.0495");
        assert_eq!(fmt_money(-1234.0), "-$1,234.00");
    }

    #[test]
    fn cycle_report_uses_event_names() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2021, 11, 8), 67_000.0),
            PricePoint::new(d(2021, 11, 10), 64_000.0),
            PricePoint::new(d(2022, 11, 21), 15_800.0),
        ]);
        let anchors = vec![
            AnchorSpec::until("Cycle 3 (2021)", d(2021, 11, 9), d(2022, 11, 21)),
            AnchorSpec::until("Broken", d(2022, 11, 21), d(2021, 11, 8)),
        ];
        let lines = cycle_lines(&normalize_all(&series, &anchors, OutlierParams::default()));
        let text = format_cycle_report(&lines, EventNames::for_preset(Some(CyclePreset::Ath)));

        assert!(text.contains("ROI from ATH"));
        // Nov 9 is equidistant from Nov 8 and Nov 10; the earlier day wins.
        assert!(text.contains("ATH: $67,000.00 on 2021-11-08 (requested 2021-11-09)"));
        assert!(text.contains("Bottom: $15,800.00 (-76.4%) after 2 days"));
        assert!(text.contains("Broken\n  skipped: Invalid range"));
    }

    #[test]
    fn header_reports_coverage() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 1), 1.0),
            PricePoint::new(d(2024, 1, 5), 2.0),
        ]);
        let text = format_series_header("BTC/USD", &series);
        assert!(text.contains("Data available from 2024-01-01 to 2024-01-05"));
        assert!(text.contains("Total days: 2"));
    }
}
