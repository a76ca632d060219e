//! Ratatui-based terminal UI.
//!
//! Two views over one loaded price history: normalized cycle trajectories and
//! the rolling risk index. A settings panel adjusts the preset, outlier filter
//! and risk windows; results are recomputed in place without reloading data.

use std::io;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{
    CycleRun, LoadedSeries, RunOutput, load_series, run_cycles_with_anchors, run_risk,
};
use crate::domain::{AnalysisConfig, AnchorSpec, CyclePreset, PriceSeries, PriceSource, RiskLevel, RiskSeries};
use crate::error::AppError;
use crate::io::load_anchors_json;
use crate::report::risk_overview;

mod chart;

use chart::{ChartLine, LinesChart};

/// Number of rows in the settings panel.
const FIELD_COUNT: usize = 5;

const CYCLE_PALETTE: [RGBColor; 6] = [
    RGBColor(239, 68, 68),
    RGBColor(234, 179, 8),
    RGBColor(34, 197, 94),
    RGBColor(59, 130, 246),
    RGBColor(168, 85, 247),
    RGBColor(236, 72, 153),
];

const RISK_GUIDES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Start the TUI.
pub fn run(config: AnalysisConfig) -> Result<(), AppError> {
    // Load before entering raw mode so fetch and parse errors print normally.
    let loaded = load_series(&config.source)?;
    let custom = config.anchors_path.as_deref().map(load_anchors_json).transpose()?;
    let mut app = App::new(config, loaded, custom)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Restores the terminal (raw mode, alternate screen) and the log level on exit.
struct TerminalGuard {
    log_level: log::LevelFilter,
}

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        // Log lines on stderr would tear the alternate screen; the status line replaces them.
        let log_level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        Ok(Self { log_level })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        log::set_max_level(self.log_level);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Cycles,
    Risk,
}

impl View {
    fn toggle(self) -> Self {
        match self {
            View::Cycles => View::Risk,
            View::Risk => View::Cycles,
        }
    }
}

struct App {
    config: AnalysisConfig,
    loaded: LoadedSeries,
    /// Anchors from `--anchors`; dropped once the user picks a preset.
    custom: Option<Vec<AnchorSpec>>,
    view: View,
    cleaned: bool,
    selected_field: usize,
    status: String,
    run: RunOutput,
}

impl App {
    fn new(config: AnalysisConfig, loaded: LoadedSeries, custom: Option<Vec<AnchorSpec>>) -> Result<Self, AppError> {
        let run = RunOutput {
            cycles: compute_cycles(&config, &loaded.series, custom.as_deref())?,
            risk: run_risk(&config, &loaded.series)?,
        };
        let mut app = Self {
            config,
            loaded,
            custom,
            view: View::Cycles,
            cleaned: true,
            selected_field: 0,
            status: String::new(),
            run,
        };
        app.status = app.cycles_status();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab => {
                self.view = self.view.toggle();
                self.status = match self.view {
                    View::Cycles => self.cycles_status(),
                    View::Risk => self.risk_status(),
                };
            }
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1)?,
            KeyCode::Right => self.adjust_field(1)?,
            KeyCode::Char('p') => self.set_preset(self.config.preset.next())?,
            KeyCode::Char('c') => {
                self.cleaned = !self.cleaned;
                self.status = format!("ratios: {}", if self.cleaned { "cleaned" } else { "raw" });
            }
            KeyCode::Char('r') => self.reload()?,
            KeyCode::Char('d') => {
                match crate::debug::write_debug_bundle(
                    &self.config,
                    &self.loaded,
                    Some(&self.run.cycles),
                    Some(&self.run.risk),
                ) {
                    Ok(path) => {
                        self.status = format!("Wrote debug bundle: {}", path.display());
                    }
                    Err(err) => {
                        self.status = format!("Debug write failed: {err}");
                    }
                }
            }
            _ => {}
        }

        Ok(false)
    }

    fn adjust_field(&mut self, delta: i32) -> Result<(), AppError> {
        let up = delta >= 0;
        match self.selected_field {
            0 => {
                let preset = if up { self.config.preset.next() } else { prev_preset(self.config.preset) };
                self.set_preset(preset)?;
            }
            1 => {
                let t = self.config.outlier.threshold + if up { 0.25 } else { -0.25 };
                self.config.outlier.threshold = t.max(0.0);
                self.recompute_cycles()?;
                self.status = format!("outlier threshold: {:.2}σ | {}", self.config.outlier.threshold, self.cycles_status());
            }
            2 => {
                let w = self.config.outlier.window;
                self.config.outlier.window = if up { w + 2 } else { w.saturating_sub(2).max(1) };
                self.recompute_cycles()?;
                self.status = format!("outlier window: {} | {}", self.config.outlier.window, self.cycles_status());
            }
            3 => {
                let w = self.config.risk.window;
                self.config.risk.window = if up { w + 30 } else { w.saturating_sub(30).max(30) };
                self.config.risk = self.config.risk.normalized();
                self.recompute_risk()?;
                self.status = format!("risk window: {} days | {}", self.config.risk.window, self.risk_status());
            }
            4 => {
                let w = self.config.risk.smoothing_window;
                self.config.risk.smoothing_window = if up { w + 2 } else { w.saturating_sub(2).max(1) };
                self.recompute_risk()?;
                self.status = format!("smoothing: {} days | {}", self.config.risk.smoothing_window, self.risk_status());
            }
            _ => {}
        }
        Ok(())
    }

    fn set_preset(&mut self, preset: CyclePreset) -> Result<(), AppError> {
        let had_custom = self.custom.take().is_some();
        self.config.preset = preset;
        self.recompute_cycles()?;
        self.status = if had_custom {
            format!("custom anchors replaced by {} | {}", preset.display_name(), self.cycles_status())
        } else {
            format!("{} | {}", preset.display_name(), self.cycles_status())
        };
        Ok(())
    }

    /// Reload the price history; a sample source draws a fresh seed.
    fn reload(&mut self) -> Result<(), AppError> {
        if self.config.source.kind == PriceSource::Sample {
            self.config.source.seed = self.config.source.seed.wrapping_add(1);
        }
        match load_series(&self.config.source) {
            Ok(loaded) => {
                self.loaded = loaded;
                self.recompute_cycles()?;
                self.recompute_risk()?;
                self.status = format!("Reloaded {} days from {}", self.loaded.series.len(), self.loaded.label);
            }
            Err(err) => {
                self.status = format!("Reload failed: {err}");
            }
        }
        Ok(())
    }

    fn recompute_cycles(&mut self) -> Result<(), AppError> {
        self.run.cycles = compute_cycles(&self.config, &self.loaded.series, self.custom.as_deref())?;
        Ok(())
    }

    fn recompute_risk(&mut self) -> Result<(), AppError> {
        self.run.risk = run_risk(&self.config, &self.loaded.series)?;
        Ok(())
    }

    fn cycles_status(&self) -> String {
        let total = self.run.cycles.outcomes.len();
        let failed = self.run.cycles.failures();
        if failed == 0 {
            format!("{total} cycles normalized")
        } else {
            format!("{} of {total} cycles normalized, {failed} skipped", total - failed)
        }
    }

    fn risk_status(&self) -> String {
        match self.run.risk.latest() {
            Some(row) => format!(
                "risk {:.3} ({}) on {}",
                row.smoothed_risk,
                RiskLevel::from_value(row.smoothed_risk).display_name(),
                row.date
            ),
            None => "no risk data".to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("cyc", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {}", self.loaded.label)),
        ]));

        let series = &self.loaded.series;
        let coverage = match (series.first(), series.last()) {
            (Some(first), Some(last)) => format!("{} .. {} ({} days)", first.date, last.date, series.len()),
            _ => "-".to_string(),
        };
        let view = match self.view {
            View::Cycles => "cycles",
            View::Risk => "risk",
        };
        lines.push(Line::from(Span::styled(
            format!(
                "view: {view} | anchors: {} | ratios: {} | data: {coverage}",
                self.anchors_name(),
                if self.cleaned { "cleaned" } else { "raw" },
            ),
            Style::default().fg(Color::Gray),
        )));

        let detail = match self.view {
            View::Cycles => {
                let repaired: usize = self.run.cycles.trajectories().iter().map(|t| t.repaired.len()).sum();
                format!("{} | {repaired} repaired rows", self.cycles_status())
            }
            View::Risk => self.risk_status(),
        };
        lines.push(Line::from(Span::styled(detail, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn anchors_name(&self) -> &'static str {
        if self.custom.is_some() { "custom" } else { self.config.preset.display_name() }
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(FIELD_COUNT as u16 + 2)])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(38)])
            .split(rows[0]);

        self.draw_chart(frame, cols[0]);
        match self.view {
            View::Cycles => self.draw_cycle_legend(frame, cols[1]),
            View::Risk => self.draw_risk_panel(frame, cols[1]),
        }
        self.draw_settings(frame, rows[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match self.view {
            View::Cycles => "ROI from anchor",
            View::Risk => "Risk index",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = match self.view {
            View::Cycles => cycle_chart(&self.run.cycles, self.cleaned),
            View::Risk => risk_chart(&self.run.risk),
        };
        if data.lines.is_empty() {
            let msg = Paragraph::new("No cycles to draw.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let (chart_rect, insets) = chart_layout(inner);
        let widget = LinesChart {
            lines: &data.lines,
            guides: &data.guides,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: data.axes.x_label,
            y_label: data.axes.y_label,
            fmt_x: data.axes.fmt_x,
            fmt_y: data.axes.fmt_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &data);
        }
    }

    fn draw_cycle_legend(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        let mut color_idx = 0usize;
        for o in &self.run.cycles.outcomes {
            match &o.result {
                Ok(t) => {
                    let color = to_tui_color(CYCLE_PALETTE[color_idx % CYCLE_PALETTE.len()]);
                    color_idx += 1;
                    lines.push(Line::from(vec![
                        Span::styled("■ ", Style::default().fg(color)),
                        Span::styled(o.anchor.label.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    ]));
                    if let Some(s) = t.summary() {
                        lines.push(Line::from(Span::styled(
                            format!("  now {:.2}x at day {}", s.final_ratio, s.last_offset),
                            Style::default().fg(Color::Gray),
                        )));
                        lines.push(Line::from(Span::styled(
                            format!("  low {:.2}x at day {}", s.trough_ratio, s.trough_offset),
                            Style::default().fg(Color::Gray),
                        )));
                    }
                }
                Err(e) => {
                    lines.push(Line::from(vec![
                        Span::styled("× ", Style::default().fg(Color::DarkGray)),
                        Span::styled(o.anchor.label.clone(), Style::default().fg(Color::DarkGray)),
                    ]));
                    lines.push(Line::from(Span::styled(format!("  {e}"), Style::default().fg(Color::DarkGray))));
                }
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Cycles").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_risk_panel(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        if let Some(o) = risk_overview(&self.run.risk) {
            let level_style = Style::default().fg(to_tui_color(level_color(o.current_level)));
            lines.push(Line::from(vec![
                Span::raw("now "),
                Span::styled(
                    format!("{:.3} {}", o.current_risk, o.current_level.display_name()),
                    level_style.add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(Line::from(Span::styled(
                format!("close {:.2} on {}", o.current_close, o.last_date),
                Style::default().fg(Color::Gray),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("days per level", Style::default().fg(Color::Gray))));
            for (level, days) in RiskLevel::ALL.iter().zip(o.days_per_level) {
                let (lo, hi) = level.bounds();
                lines.push(Line::from(vec![
                    Span::styled("■ ", Style::default().fg(to_tui_color(level_color(*level)))),
                    Span::raw(format!("{:<9} {lo:.1}-{hi:.1} {days:>6}", level.display_name())),
                ]));
            }
            if o.undefined_count > 0 {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("{} warm-up days back-filled", o.undefined_count),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Risk").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let anchors = match &self.custom {
            Some(a) => format!("custom ({} cycles)", a.len()),
            None => self.config.preset.display_name().to_string(),
        };
        let items = vec![
            ListItem::new(format!("Anchors: {anchors}")),
            ListItem::new(format!("Outlier threshold: {:.2}σ", self.config.outlier.threshold)),
            ListItem::new(format!("Outlier window: {}", self.config.outlier.window)),
            ListItem::new(format!(
                "Risk window: {} (min {})",
                self.config.risk.window, self.config.risk.min_periods
            )),
            ListItem::new(format!("Risk smoothing: {}", self.config.risk.smoothing_window)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab view  ↑/↓ select  ←/→ adjust  p preset  c raw/clean  r reload  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn compute_cycles(
    config: &AnalysisConfig,
    series: &PriceSeries,
    custom: Option<&[AnchorSpec]>,
) -> Result<CycleRun, AppError> {
    match custom {
        Some(anchors) => run_cycles_with_anchors(config, series, None, anchors),
        None => run_cycles_with_anchors(config, series, Some(config.preset), &config.preset.anchors()),
    }
}

fn prev_preset(cur: CyclePreset) -> CyclePreset {
    let idx = CyclePreset::ALL.iter().position(|&p| p == cur).unwrap_or(0);
    CyclePreset::ALL[(idx + CyclePreset::ALL.len() - 1) % CyclePreset::ALL.len()]
}

fn level_color(level: RiskLevel) -> RGBColor {
    match level {
        RiskLevel::VeryLow => RGBColor(34, 197, 94),
        RiskLevel::Low => RGBColor(132, 204, 22),
        RiskLevel::Medium => RGBColor(234, 179, 8),
        RiskLevel::High => RGBColor(249, 115, 22),
        RiskLevel::VeryHigh => RGBColor(239, 68, 68),
    }
}

fn to_tui_color(c: RGBColor) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

#[derive(Debug, Clone, Copy)]
struct AxisSpec {
    x_label: &'static str,
    y_label: &'static str,
    fmt_x: fn(f64) -> String,
    fmt_y: fn(f64) -> String,
}

const CYCLE_AXES: AxisSpec = AxisSpec {
    x_label: "days from anchor",
    y_label: "x anchor",
    fmt_x: fmt_axis_day,
    fmt_y: fmt_axis_ratio,
};

const RISK_AXES: AxisSpec = AxisSpec {
    x_label: "year",
    y_label: "risk",
    fmt_x: fmt_axis_year,
    fmt_y: fmt_axis_risk,
};

/// Everything the chart widget and the tick overlay need for one view.
struct ChartData {
    lines: Vec<ChartLine>,
    guides: Vec<f64>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    axes: AxisSpec,
}

/// One line per normalized cycle, ratio against day offset.
fn cycle_chart(run: &CycleRun, cleaned: bool) -> ChartData {
    let lines: Vec<ChartLine> = run
        .trajectories()
        .iter()
        .enumerate()
        .map(|(i, t)| ChartLine {
            points: t
                .rows
                .iter()
                .map(|r| (r.day_offset as f64, if cleaned { r.cleaned_ratio } else { r.raw_ratio }))
                .collect(),
            color: CYCLE_PALETTE[i % CYCLE_PALETTE.len()],
        })
        .collect();

    let x_max = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|&(x, _)| x))
        .fold(0.0_f64, f64::max)
        .max(1.0);

    // The anchor level always stays in view.
    let (mut y_min, mut y_max) = (1.0_f64, 1.0_f64);
    for &(_, y) in lines.iter().flat_map(|l| l.points.iter()) {
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(0.05);

    ChartData {
        lines,
        guides: vec![1.0],
        x_bounds: [0.0, x_max],
        y_bounds: [(y_min - pad).max(0.0), y_max + pad],
        axes: CYCLE_AXES,
    }
}

/// Clipped risk dimmed underneath, smoothed risk colored by band.
fn risk_chart(risk: &RiskSeries) -> ChartData {
    let clipped: Vec<(f64, f64)> = risk.rows.iter().map(|r| (year_fraction(r.date), r.clipped_risk)).collect();
    let smoothed: Vec<(f64, f64)> = risk.rows.iter().map(|r| (year_fraction(r.date), r.smoothed_risk)).collect();

    let x_bounds = match (clipped.first(), clipped.last()) {
        (Some(&(x0, _)), Some(&(x1, _))) if x1 > x0 => [x0, x1],
        (Some(&(x0, _)), _) => [x0, x0 + 1.0],
        _ => [0.0, 1.0],
    };

    let mut lines = Vec::new();
    if !clipped.is_empty() {
        lines.push(ChartLine {
            points: clipped,
            color: RGBColor(90, 90, 90),
        });
    }
    for (level, points) in band_segments(&smoothed) {
        lines.push(ChartLine {
            points,
            color: level_color(level),
        });
    }

    ChartData {
        lines,
        guides: RISK_GUIDES.to_vec(),
        x_bounds,
        y_bounds: [0.0, 1.0],
        axes: RISK_AXES,
    }
}

/// Split a risk line into runs of constant band.
///
/// Each run after the first starts at the previous run's last point so the
/// drawn line stays continuous.
fn band_segments(points: &[(f64, f64)]) -> Vec<(RiskLevel, Vec<(f64, f64)>)> {
    let mut out: Vec<(RiskLevel, Vec<(f64, f64)>)> = Vec::new();
    for &(x, y) in points {
        let level = RiskLevel::from_value(y);
        if let Some((current, seg)) = out.last_mut() {
            if *current == level {
                seg.push((x, y));
                continue;
            }
        }
        let bridge = out.last().and_then(|(_, seg)| seg.last().copied());
        out.push((level, bridge.into_iter().chain([(x, y)]).collect()));
    }
    out
}

/// Calendar date as a fractional year (2024-07-02 is about 2024.5).
fn year_fraction(date: NaiveDate) -> f64 {
    let year = date.year();
    let days_in_year = NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |d| d.ordinal());
    year as f64 + date.ordinal0() as f64 / days_in_year as f64
}

fn fmt_axis_day(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_ratio(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_axis_year(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_risk(v: f64) -> String {
    format!("{v:.1}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(frame: &mut ratatui::Frame<'_>, inner: Rect, chart: Rect, insets: AxisInsets, data: &ChartData) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = data.x_bounds;
    let [y0, y1] = data.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = (data.axes.fmt_x)(x0 + u * (x1 - x0));
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = (data.axes.fmt_y)(y0 + u * (y1 - y0));
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(data.axes.x_label)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(data.axes.y_label).style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OutlierParams, RiskParams, SourceConfig};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_app() -> App {
        let config = AnalysisConfig {
            source: SourceConfig {
                kind: PriceSource::Sample,
                csv_path: None,
                symbol: "BTC".to_string(),
                currency: "USD".to_string(),
                from: d(2012, 1, 1),
                to: Some(d(2025, 12, 31)),
                seed: 7,
                days: None,
            },
            preset: CyclePreset::Ath,
            anchors_path: None,
            outlier: OutlierParams::default(),
            risk: RiskParams::default(),
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export: None,
            debug: false,
        };
        let loaded = load_series(&config.source).unwrap();
        App::new(config, loaded, None).unwrap()
    }

    #[test]
    fn keys_switch_view_preset_and_ratio_mode() {
        let mut app = sample_app();
        assert_eq!(app.view, View::Cycles);

        assert!(!app.handle_key(KeyCode::Tab).unwrap());
        assert_eq!(app.view, View::Risk);
        assert!(app.status.starts_with("risk "));

        app.handle_key(KeyCode::Char('p')).unwrap();
        assert_eq!(app.config.preset, CyclePreset::Ath.next());
        assert_eq!(app.run.cycles.preset, Some(CyclePreset::Ath.next()));

        app.handle_key(KeyCode::Char('c')).unwrap();
        assert!(!app.cleaned);

        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn settings_adjust_and_recompute() {
        let mut app = sample_app();

        app.selected_field = 1;
        app.handle_key(KeyCode::Left).unwrap();
        assert_eq!(app.config.outlier.threshold, 2.75);

        app.handle_key(KeyCode::Down).unwrap();
        app.handle_key(KeyCode::Down).unwrap();
        app.handle_key(KeyCode::Right).unwrap();
        assert_eq!(app.config.risk.window, 760);
        assert_eq!(app.run.risk.params.window, 760);

        app.handle_key(KeyCode::Down).unwrap();
        app.handle_key(KeyCode::Down).unwrap();
        assert_eq!(app.selected_field, FIELD_COUNT - 1);
    }

    #[test]
    fn picking_a_preset_drops_custom_anchors() {
        let mut app = sample_app();
        app.custom = Some(vec![AnchorSpec::to_series_end("Mine", d(2020, 3, 12))]);
        app.recompute_cycles().unwrap();
        assert_eq!(app.run.cycles.preset, None);
        assert_eq!(app.run.cycles.outcomes.len(), 1);

        app.selected_field = 0;
        app.handle_key(KeyCode::Left).unwrap();
        assert!(app.custom.is_none());
        assert_eq!(app.config.preset, prev_preset(CyclePreset::Ath));
        assert!(app.status.starts_with("custom anchors replaced"));
    }

    #[test]
    fn cycle_chart_keeps_anchor_level_in_view() {
        let app = sample_app();
        let data = cycle_chart(&app.run.cycles, true);

        assert_eq!(data.lines.len(), app.run.cycles.trajectories().len());
        assert!(data.y_bounds[0] < 1.0 && data.y_bounds[1] > 1.0);
        assert_eq!(data.x_bounds[0], 0.0);
        for line in &data.lines {
            assert_eq!(line.points[0], (0.0, 1.0));
        }
    }

    #[test]
    fn band_segments_bridge_level_changes() {
        let segs = band_segments(&[(0.0, 0.1), (1.0, 0.15), (2.0, 0.5), (3.0, 0.55), (4.0, 0.9)]);

        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].0, RiskLevel::VeryLow);
        assert_eq!(segs[0].1.len(), 2);
        assert_eq!(segs[1].0, RiskLevel::Medium);
        assert_eq!(segs[1].1, vec![(1.0, 0.15), (2.0, 0.5), (3.0, 0.55)]);
        assert_eq!(segs[2].1, vec![(3.0, 0.55), (4.0, 0.9)]);
        assert!(band_segments(&[]).is_empty());
    }

    #[test]
    fn year_fraction_tracks_the_calendar() {
        assert_eq!(year_fraction(d(2023, 1, 1)), 2023.0);
        assert!((year_fraction(d(2024, 7, 2)) - 2024.5).abs() < 0.01);
        assert!(year_fraction(d(2024, 12, 31)) < 2025.0);
    }
}
