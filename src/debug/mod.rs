//! Debug bundle writer for inspecting inputs, anchor resolution and repairs.
//!
//! Bundles are markdown files under `debug/`, one per invocation.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::PathBuf;

use chrono::Local;

use crate::app::pipeline::{CycleRun, LoadedSeries};
use crate::domain::{AnalysisConfig, AnchorEnd, PriceSeries, RiskSeries};
use crate::error::AppError;
use crate::report::risk_overview;

/// Repaired rows listed per cycle before truncating.
const MAX_REPAIRS_LISTED: usize = 20;

pub fn write_debug_bundle(
    config: &AnalysisConfig,
    loaded: &LoadedSeries,
    cycles: Option<&CycleRun>,
    risk: Option<&RiskSeries>,
) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("cyc_debug_{}_{ts}.md", config.source.symbol.to_ascii_lowercase()));

    let text = render_bundle(config, loaded, cycles, risk);
    std::fs::write(&path, text).map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;
    Ok(path)
}

fn render_bundle(
    config: &AnalysisConfig,
    loaded: &LoadedSeries,
    cycles: Option<&CycleRun>,
    risk: Option<&RiskSeries>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# cyc debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- source: {}", loaded.label);
    write_coverage(&mut out, &loaded.series, loaded.skipped_rows);

    let _ = writeln!(out, "\n## Settings");
    let _ = writeln!(
        out,
        "- outlier: window={}, threshold={}",
        config.outlier.window, config.outlier.threshold
    );
    let _ = writeln!(
        out,
        "- risk: window={}, min_periods={}, smoothing={}",
        config.risk.window, config.risk.min_periods, config.risk.smoothing_window
    );

    if let Some(run) = cycles {
        write_cycles(&mut out, run);
    }
    if let Some(risk) = risk {
        write_risk(&mut out, risk);
    }
    out
}

fn write_coverage(out: &mut String, series: &PriceSeries, skipped_rows: usize) {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        let _ = writeln!(out, "- coverage: empty");
        return;
    };
    let span = (last.date - first.date).num_days() + 1;
    let _ = writeln!(out, "- coverage: {} .. {} ({} rows, {span} calendar days)", first.date, last.date, series.len());

    let gaps: Vec<(chrono::NaiveDate, i64)> = series
        .points()
        .windows(2)
        .map(|w| (w[0].date, (w[1].date - w[0].date).num_days()))
        .filter(|&(_, days)| days > 1)
        .collect();
    match gaps.iter().max_by_key(|&&(_, days)| days) {
        Some(&(after, days)) => {
            let _ = writeln!(out, "- gaps: {} (largest {days} days after {after})", gaps.len());
        }
        None => {
            let _ = writeln!(out, "- gaps: none");
        }
    }
    if skipped_rows > 0 {
        let _ = writeln!(out, "- skipped input rows: {skipped_rows}");
    }
}

fn write_cycles(out: &mut String, run: &CycleRun) {
    let title = run.preset.map_or("custom anchors", |p| p.display_name());
    let _ = writeln!(out, "\n## Cycles ({title})");
    let _ = writeln!(out, "| label | requested start | resolved start | requested end | resolved end | rows | repaired | status |");
    let _ = writeln!(out, "| - | - | - | - | - | - | - | - |");

    for o in &run.outcomes {
        let requested_end = match o.anchor.end {
            AnchorEnd::Date(d) => d.to_string(),
            AnchorEnd::SeriesEnd => "series end".to_string(),
        };
        match &o.result {
            Ok(t) => {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {requested_end} | {} | {} | {} | ok |",
                    o.anchor.label,
                    o.anchor.start,
                    t.start,
                    t.end,
                    t.len(),
                    t.repaired.len()
                );
            }
            Err(e) => {
                let _ = writeln!(
                    out,
                    "| {} | {} | - | {requested_end} | - | 0 | 0 | {e} |",
                    o.anchor.label, o.anchor.start
                );
            }
        }
    }

    for t in run.trajectories().into_iter().filter(|t| !t.repaired.is_empty()) {
        let _ = writeln!(out, "\n### Repairs: {}", t.label);
        let _ = writeln!(out, "| offset | date | raw_ratio | cleaned_ratio |");
        let _ = writeln!(out, "| - | - | - | - |");
        for &offset in t.repaired.iter().take(MAX_REPAIRS_LISTED) {
            if let Some(row) = t.rows.get(offset) {
                let _ = writeln!(
                    out,
                    "| {} | {} | {:.6} | {:.6} |",
                    row.day_offset, row.date, row.raw_ratio, row.cleaned_ratio
                );
            }
        }
        if t.repaired.len() > MAX_REPAIRS_LISTED {
            let _ = writeln!(out, "\n({} more)", t.repaired.len() - MAX_REPAIRS_LISTED);
        }
    }
}

fn write_risk(out: &mut String, risk: &RiskSeries) {
    let _ = writeln!(out, "\n## Risk index");
    let first_defined = risk.rows.iter().position(|r| r.raw_risk.is_some());
    match first_defined {
        Some(idx) => {
            let _ = writeln!(
                out,
                "- warm-up: {idx} rows back-filled from {} ({:.4})",
                risk.rows[idx].date, risk.rows[idx].clipped_risk
            );
        }
        None => {
            let _ = writeln!(out, "- warm-up: no defined value; every row is neutral");
        }
    }
    let _ = writeln!(out, "- undefined before filling: {}", risk.undefined_count);
    let _ = writeln!(out, "- neutral fallback used: {}", risk.used_fallback);

    if let Some(o) = risk_overview(risk) {
        let _ = writeln!(out, "- smoothed range: {:.4} .. {:.4}", o.risk_min, o.risk_max);
        let _ = writeln!(
            out,
            "- latest: {} close {:.4} risk {:.4} ({})",
            o.last_date,
            o.current_close,
            o.current_risk,
            o.current_level.display_name()
        );
    }
}
