//! Command-line parsing for the cycle ROI / risk index tool.
//!
//! Argument parsing and command dispatch stay separate from the analysis code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{CyclePreset, PriceSource};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cyc", version, about = "Cycle ROI normalization and rolling risk index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize market cycles to anchor-relative ROI and report them.
    Cycles(CycleArgs),
    /// Compute the rolling risk index over the full history.
    Risk(RiskArgs),
    /// Launch the interactive TUI (cycles and risk views).
    Tui(TuiArgs),
}

/// Where the daily price history comes from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Price source.
    #[arg(long, value_enum, default_value_t = PriceSource::CryptoCompare)]
    pub source: PriceSource,

    /// Price CSV (`date,close`); implies `--source csv`.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Asset symbol (CryptoCompare `fsym`).
    #[arg(long, default_value = "BTC")]
    pub symbol: String,

    /// Quote currency (CryptoCompare `tsym`).
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// First date to fetch (YYYY-MM-DD).
    #[arg(long, default_value = "2010-07-17")]
    pub from: NaiveDate,

    /// Last date to fetch (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Seed for `--source sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Length of the `--source sample` series in days; defaults to `--from..--to`.
    #[arg(long)]
    pub days: Option<usize>,
}

/// Outlier filter settings for cycle ratios.
#[derive(Debug, Args, Clone)]
pub struct OutlierArgs {
    /// Centered window (observations) for the rolling median/std test.
    #[arg(long, default_value_t = 5)]
    pub outlier_window: usize,

    /// Flag points further than this many rolling standard deviations from the median.
    #[arg(long, default_value_t = 3.0)]
    pub outlier_threshold: f64,
}

/// Risk index settings.
#[derive(Debug, Args, Clone)]
pub struct RiskWindowArgs {
    /// Trailing min/max window (observations).
    #[arg(long, default_value_t = 730)]
    pub window: usize,

    /// Observations required before the envelope is defined.
    #[arg(long, default_value_t = 180)]
    pub min_periods: usize,

    /// Centered smoothing window (observations).
    #[arg(long, default_value_t = 7)]
    pub smoothing: usize,
}

/// Terminal and file output options.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write a markdown debug bundle under `debug/`.
    #[arg(long)]
    pub debug: bool,
}

/// Options for `cyc cycles`.
#[derive(Debug, Args, Clone)]
pub struct CycleArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Built-in cycle collection.
    #[arg(short = 'p', long, value_enum, default_value_t = CyclePreset::Ath)]
    pub preset: CyclePreset,

    /// JSON file of custom anchors; replaces the preset's cycles.
    #[arg(long, value_name = "JSON")]
    pub anchors: Option<PathBuf>,

    /// Plot raw ratios instead of cleaned ones.
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub outlier: OutlierArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options for `cyc risk`.
#[derive(Debug, Args, Clone)]
pub struct RiskArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub risk: RiskWindowArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options for `cyc tui`.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Initial cycle collection.
    #[arg(short = 'p', long, value_enum, default_value_t = CyclePreset::Ath)]
    pub preset: CyclePreset,

    /// JSON file of custom anchors; replaces the preset's cycles.
    #[arg(long, value_name = "JSON")]
    pub anchors: Option<PathBuf>,

    #[command(flatten)]
    pub outlier: OutlierArgs,

    #[command(flatten)]
    pub risk: RiskWindowArgs,
}
