//! Export trajectories and risk series to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{RiskSeries, Trajectory};
use crate::error::AppError;

/// Write every trajectory as long-format rows (one row per cycle day).
pub fn write_trajectories_csv(path: &Path, trajectories: &[&Trajectory]) -> Result<(), AppError> {
    let mut out = create(path)?;

    writeln!(out, "label,day_offset,date,close,raw_ratio,cleaned_ratio").map_err(write_err)?;
    for t in trajectories {
        let label = csv_field(&t.label);
        for row in &t.rows {
            writeln!(
                out,
                "{},{},{},{:.8},{:.10},{:.10}",
                label, row.day_offset, row.date, row.close, row.raw_ratio, row.cleaned_ratio,
            )
            .map_err(write_err)?;
        }
    }

    out.flush().map_err(write_err)
}

/// Write the risk series; `raw_risk` is empty where the envelope was undefined.
pub fn write_risk_csv(path: &Path, risk: &RiskSeries) -> Result<(), AppError> {
    let mut out = create(path)?;

    writeln!(out, "date,close,raw_risk,risk,smoothed_risk").map_err(write_err)?;
    for row in &risk.rows {
        writeln!(
            out,
            "{},{:.8},{},{:.6},{:.6}",
            row.date,
            row.close,
            row.raw_risk.map(|v| format!("{v:.6}")).unwrap_or_default(),
            row.clipped_risk,
            row.smoothed_risk,
        )
        .map_err(write_err)?;
    }

    out.flush().map_err(write_err)
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_err(e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write export CSV: {e}"))
}

/// Quote a field when it would break the row.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{normalize, risk_index};
    use crate::domain::{AnchorSpec, PricePoint, PriceSeries, RiskParams};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series() -> PriceSeries {
        PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 1), 100.0),
            PricePoint::new(d(2024, 1, 2), 150.0),
            PricePoint::new(d(2024, 1, 3), 120.0),
        ])
    }

    fn tmp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cyc-export-{}-{name}", std::process::id()))
    }

    #[test]
    fn trajectories_csv_has_one_row_per_day() {
        let t = normalize(&series(), &AnchorSpec::to_series_end("Cycle, A", d(2024, 1, 1))).unwrap();
        let path = tmp_path("traj.csv");
        write_trajectories_csv(&path, &[&t]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "label,day_offset,date,close,raw_ratio,cleaned_ratio");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("\"Cycle, A\",1,2024-01-02,150.00000000,1.5000000000"));
    }

    #[test]
    fn risk_csv_leaves_undefined_raw_empty() {
        let r = risk_index(&series(), RiskParams::default()).unwrap();
        let path = tmp_path("risk.csv");
        write_risk_csv(&path, &r).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let first = text.lines().nth(1).unwrap();
        assert!(first.starts_with("2024-01-01,100.00000000,,"), "got {first}");
    }
}
