//! Shared pipeline used by both CLI and TUI front-ends.
//!
//! price source -> `PriceSeries` -> cycle normalization (per anchor) + risk index
//!
//! The front-ends only deal with presentation (printing vs widgets).

use chrono::Local;

use crate::analysis::{CycleOutcome, normalize_all, risk_index};
use crate::data::{HistodayClient, SampleSpec, generate_series};
use crate::domain::{AnalysisConfig, AnchorSpec, CyclePreset, PriceSeries, PriceSource, RiskSeries, SourceConfig, Trajectory};
use crate::error::AppError;
use crate::io::{load_anchors_json, load_price_csv};

/// A loaded price history plus a short description of where it came from.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: PriceSeries,
    pub label: String,
    /// Rows skipped while reading (CSV only).
    pub skipped_rows: usize,
}

/// Cycle normalization output for one anchor collection.
#[derive(Debug, Clone)]
pub struct CycleRun {
    /// `None` when custom anchors were used.
    pub preset: Option<CyclePreset>,
    pub outcomes: Vec<CycleOutcome>,
}

impl CycleRun {
    /// Successfully normalized cycles, in anchor order.
    pub fn trajectories(&self) -> Vec<&Trajectory> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Everything the TUI and the debug bundle show.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub cycles: CycleRun,
    pub risk: RiskSeries,
}

pub fn load_series(source: &SourceConfig) -> Result<LoadedSeries, AppError> {
    let to = source.to.unwrap_or_else(|| Local::now().date_naive());
    if source.from > to {
        return Err(AppError::new(2, format!("--from {} is after --to {to}.", source.from)));
    }

    let loaded = match source.kind {
        PriceSource::CryptoCompare => {
            let client = HistodayClient::from_env();
            LoadedSeries {
                series: client.fetch_daily(&source.symbol, &source.currency, source.from, to)?,
                label: format!("{}/{} (CryptoCompare)", source.symbol, source.currency),
                skipped_rows: 0,
            }
        }
        PriceSource::Csv => {
            let path = source
                .csv_path
                .as_deref()
                .ok_or_else(|| AppError::new(2, "`--source csv` requires `--csv <file.csv>`."))?;
            let ingest = load_price_csv(path)?;
            LoadedSeries {
                label: path.display().to_string(),
                skipped_rows: ingest.row_errors.len(),
                series: ingest.series,
            }
        }
        PriceSource::Sample => {
            let span = (to - source.from).num_days() + 1;
            let days = source.days.unwrap_or(usize::try_from(span).unwrap_or(0));
            let spec = SampleSpec::new(source.from, days, source.seed);
            LoadedSeries {
                series: generate_series(&spec)?,
                label: format!("synthetic sample (seed {})", source.seed),
                skipped_rows: 0,
            }
        }
    };

    log::info!("loaded {} days from {}", loaded.series.len(), loaded.label);
    Ok(loaded)
}

/// The anchors to analyze: the custom file when given, else the preset.
pub fn select_anchors(config: &AnalysisConfig) -> Result<(Option<CyclePreset>, Vec<AnchorSpec>), AppError> {
    match &config.anchors_path {
        Some(path) => Ok((None, load_anchors_json(path)?)),
        None => Ok((Some(config.preset), config.preset.anchors())),
    }
}

pub fn run_cycles(config: &AnalysisConfig, series: &PriceSeries) -> Result<CycleRun, AppError> {
    let (preset, anchors) = select_anchors(config)?;
    run_cycles_with_anchors(config, series, preset, &anchors)
}

/// Normalize an explicit anchor list (the TUI switches presets without re-reading files).
pub fn run_cycles_with_anchors(
    config: &AnalysisConfig,
    series: &PriceSeries,
    preset: Option<CyclePreset>,
    anchors: &[AnchorSpec],
) -> Result<CycleRun, AppError> {
    if series.is_empty() {
        return Err(AppError::new(3, "Price series is empty."));
    }
    let outcomes = normalize_all(series, anchors, config.outlier);
    for o in &outcomes {
        if let Err(e) = &o.result {
            log::warn!("{}: {e}", o.anchor.label);
        }
    }
    Ok(CycleRun { preset, outcomes })
}

pub fn run_risk(config: &AnalysisConfig, series: &PriceSeries) -> Result<RiskSeries, AppError> {
    let risk = risk_index(series, config.risk)?;
    if risk.used_fallback {
        log::warn!("risk index: some days had no defined envelope and use the neutral 0.5");
    }
    Ok(risk)
}

pub fn run_all(config: &AnalysisConfig, series: &PriceSeries) -> Result<RunOutput, AppError> {
    Ok(RunOutput {
        cycles: run_cycles(config, series)?,
        risk: run_risk(config, series)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OutlierParams, RiskParams};
    use chrono::NaiveDate;

    fn sample_config(preset: CyclePreset) -> AnalysisConfig {
        AnalysisConfig {
            source: SourceConfig {
                kind: PriceSource::Sample,
                csv_path: None,
                symbol: "BTC".to_string(),
                currency: "USD".to_string(),
                from: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
                to: Some(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
                seed: 42,
                days: None,
            },
            preset,
            anchors_path: None,
            outlier: OutlierParams::default(),
            risk: RiskParams::default(),
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export: None,
            debug: false,
        }
    }

    #[test]
    fn sample_source_covers_the_requested_span() {
        let config = sample_config(CyclePreset::Ath);
        let loaded = load_series(&config.source).unwrap();

        assert_eq!(loaded.series.first().unwrap().date, config.source.from);
        assert_eq!(loaded.series.last().unwrap().date, config.source.to.unwrap());
        assert!(loaded.label.contains("seed 42"));
    }

    #[test]
    fn every_preset_normalizes_on_the_sample() {
        for preset in CyclePreset::ALL {
            let config = sample_config(preset);
            let series = load_series(&config.source).unwrap().series;
            let run = run_all(&config, &series).unwrap();

            assert_eq!(run.cycles.preset, Some(preset));
            assert_eq!(run.cycles.failures(), 0, "{preset:?}");
            for t in run.cycles.trajectories() {
                assert_eq!(t.rows[0].cleaned_ratio, 1.0);
            }
            assert_eq!(run.risk.len(), series.len());
        }
    }

    #[test]
    fn csv_source_without_path_is_an_input_error() {
        let mut config = sample_config(CyclePreset::Ath);
        config.source.kind = PriceSource::Csv;
        assert_eq!(load_series(&config.source).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut config = sample_config(CyclePreset::Ath);
        config.source.to = Some(NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
        assert_eq!(load_series(&config.source).unwrap_err().exit_code(), 2);
    }
}
