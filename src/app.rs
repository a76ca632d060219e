//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments into an `AnalysisConfig`
//! - loads the price history
//! - runs cycle normalization and/or the risk index
//! - prints reports/plots and writes optional exports

use clap::Parser;

use crate::cli::picker::prompt_for_price_csv;
use crate::cli::{Command, OutlierArgs, OutputArgs, RiskWindowArgs, SourceArgs};
use crate::domain::{AnalysisConfig, CyclePreset, OutlierParams, PriceSource, RiskParams, SourceConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `cyc` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // `cyc` and `cyc --source sample` behave like `cyc tui ...`. Clap requires a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    let config = analysis_config_from_args(&cli.command)?;

    match cli.command {
        Command::Cycles(args) => handle_cycles(&config, !args.raw),
        Command::Risk(_) => handle_risk(&config),
        Command::Tui(_) => crate::tui::run(config),
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // A second init (tests, embedding) is harmless.
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

fn handle_cycles(config: &AnalysisConfig, cleaned: bool) -> Result<(), AppError> {
    let loaded = pipeline::load_series(&config.source)?;
    let run = pipeline::run_cycles(config, &loaded.series)?;

    println!("{}", crate::report::format_series_header(&loaded.label, &loaded.series));
    let lines = crate::report::cycle_lines(&run.outcomes);
    let names = crate::report::EventNames::for_preset(run.preset);
    println!("{}", crate::report::format_cycle_report(&lines, names));

    let trajectories = run.trajectories();
    if config.plot && !trajectories.is_empty() {
        let plot = crate::plot::render_cycles_plot(&trajectories, config.plot_width, config.plot_height, cleaned);
        println!("{plot}");
    }

    if let Some(path) = &config.export {
        crate::io::write_trajectories_csv(path, &trajectories)?;
        println!("Exported {} cycles to {}", trajectories.len(), path.display());
    }
    if config.debug {
        let path = crate::debug::write_debug_bundle(config, &loaded, Some(&run), None)?;
        println!("Debug bundle written to {}", path.display());
    }

    Ok(())
}

fn handle_risk(config: &AnalysisConfig) -> Result<(), AppError> {
    let loaded = pipeline::load_series(&config.source)?;
    let risk = pipeline::run_risk(config, &loaded.series)?;

    println!("{}", crate::report::format_series_header(&loaded.label, &loaded.series));
    if let Some(overview) = crate::report::risk_overview(&risk) {
        println!("{}", crate::report::format_risk_report(&overview, risk.params));
    }

    if config.plot {
        println!("{}", crate::plot::render_risk_plot(&risk, config.plot_width, config.plot_height));
    }

    if let Some(path) = &config.export {
        crate::io::write_risk_csv(path, &risk)?;
        println!("Exported {} days to {}", risk.len(), path.display());
    }
    if config.debug {
        let path = crate::debug::write_debug_bundle(config, &loaded, None, Some(&risk))?;
        println!("Debug bundle written to {}", path.display());
    }

    Ok(())
}

/// Fold CLI arguments into one validated `AnalysisConfig`.
///
/// `--source csv` without `--csv` prompts for a file.
pub fn analysis_config_from_args(command: &Command) -> Result<AnalysisConfig, AppError> {
    let (source, preset, anchors, outlier, risk, output) = match command {
        Command::Cycles(a) => (
            &a.source,
            a.preset,
            a.anchors.clone(),
            Some(&a.outlier),
            None,
            Some(&a.output),
        ),
        Command::Risk(a) => (&a.source, CyclePreset::Ath, None, None, Some(&a.risk), Some(&a.output)),
        Command::Tui(a) => (
            &a.source,
            a.preset,
            a.anchors.clone(),
            Some(&a.outlier),
            Some(&a.risk),
            None,
        ),
    };

    let mut config = AnalysisConfig {
        source: source_config(source)?,
        preset,
        anchors_path: anchors,
        outlier: outlier.map(outlier_params).transpose()?.unwrap_or_default(),
        risk: risk.map(risk_params).transpose()?.unwrap_or_default(),
        plot: false,
        plot_width: 100,
        plot_height: 25,
        export: None,
        debug: false,
    };
    if let Some(out) = output {
        apply_output(&mut config, out);
    }
    Ok(config)
}

fn source_config(args: &SourceArgs) -> Result<SourceConfig, AppError> {
    let kind = if args.csv.is_some() { PriceSource::Csv } else { args.source };
    let csv_path = match (&args.csv, kind) {
        (Some(path), _) => Some(path.clone()),
        (None, PriceSource::Csv) => Some(prompt_for_price_csv()?),
        (None, _) => None,
    };

    if let Some(to) = args.to {
        if args.from > to {
            return Err(AppError::new(2, format!("--from {} is after --to {to}.", args.from)));
        }
    }
    if args.days == Some(0) {
        return Err(AppError::new(2, "--days must be > 0."));
    }

    Ok(SourceConfig {
        kind,
        csv_path,
        symbol: args.symbol.trim().to_ascii_uppercase(),
        currency: args.currency.trim().to_ascii_uppercase(),
        from: args.from,
        to: args.to,
        seed: args.seed,
        days: args.days,
    })
}

fn outlier_params(args: &OutlierArgs) -> Result<OutlierParams, AppError> {
    if args.outlier_window == 0 {
        return Err(AppError::new(2, "--outlier-window must be > 0."));
    }
    if !(args.outlier_threshold.is_finite() && args.outlier_threshold >= 0.0) {
        return Err(AppError::new(2, "--outlier-threshold must be a finite value >= 0."));
    }
    Ok(OutlierParams {
        window: args.outlier_window,
        threshold: args.outlier_threshold,
    })
}

fn risk_params(args: &RiskWindowArgs) -> Result<RiskParams, AppError> {
    if args.window == 0 || args.smoothing == 0 {
        return Err(AppError::new(2, "--window and --smoothing must be > 0."));
    }
    if args.min_periods > args.window {
        log::warn!(
            "--min-periods {} exceeds --window {}; using {}",
            args.min_periods,
            args.window,
            args.window
        );
    }
    Ok(RiskParams {
        window: args.window,
        min_periods: args.min_periods,
        smoothing_window: args.smoothing,
    }
    .normalized())
}

fn apply_output(config: &mut AnalysisConfig, args: &OutputArgs) {
    config.plot = args.plot && !args.no_plot;
    config.plot_width = args.width;
    config.plot_height = args.height;
    config.export = args.export.clone();
    config.debug = args.debug;
}

/// Rewrite argv so `cyc` defaults to `cyc tui`.
///
/// Rules:
/// - `cyc`                        -> `cyc tui`
/// - `cyc --source sample ...`    -> `cyc tui --source sample ...`
/// - `cyc --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "cycles" | "risk" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs_the_tui() {
        assert_eq!(rewrite_args(argv(&["cyc"])), argv(&["cyc", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["cyc", "--source", "sample"])),
            argv(&["cyc", "tui", "--source", "sample"])
        );
        assert_eq!(rewrite_args(argv(&["cyc", "--help"])), argv(&["cyc", "--help"]));
        assert_eq!(rewrite_args(argv(&["cyc", "risk"])), argv(&["cyc", "risk"]));
    }

    #[test]
    fn cycle_flags_fold_into_the_config() {
        let cli = Cli::parse_from([
            "cyc",
            "cycles",
            "--source",
            "sample",
            "--preset",
            "halving",
            "--outlier-threshold",
            "2",
            "--no-plot",
            "--symbol",
            "eth",
        ]);
        let config = analysis_config_from_args(&cli.command).unwrap();

        assert_eq!(config.source.kind, PriceSource::Sample);
        assert_eq!(config.source.symbol, "ETH");
        assert_eq!(config.preset, CyclePreset::Halving);
        assert_eq!(config.outlier.threshold, 2.0);
        assert_eq!(config.risk, RiskParams::default());
        assert!(!config.plot);
    }

    #[test]
    fn csv_flag_implies_the_csv_source() {
        let cli = Cli::parse_from(["cyc", "risk", "--csv", "prices.csv", "--min-periods", "5000"]);
        let config = analysis_config_from_args(&cli.command).unwrap();

        assert_eq!(config.source.kind, PriceSource::Csv);
        assert_eq!(config.risk.min_periods, 730);
        assert!(config.plot);
    }

    #[test]
    fn invalid_settings_are_usage_errors() {
        let cli = Cli::parse_from(["cyc", "cycles", "--source", "sample", "--outlier-window", "0"]);
        assert_eq!(analysis_config_from_args(&cli.command).unwrap_err().exit_code(), 2);

        let cli = Cli::parse_from(["cyc", "risk", "--source", "sample", "--from", "2020-01-01", "--to", "2019-01-01"]);
        assert_eq!(analysis_config_from_args(&cli.command).unwrap_err().exit_code(), 2);
    }
}
