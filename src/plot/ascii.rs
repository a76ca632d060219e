//! ASCII plotting for terminal output.
//!
//! Fixed-size character grids, kept deterministic for golden tests.
//!
//! Plot elements:
//! - one glyph per cycle (`1`, `2`, ...) in the trajectory plot
//! - `*` for the smoothed risk line
//! - `.` guide lines (ratio `1.0`; risk band boundaries) drawn behind the data

use crate::domain::{RiskLevel, RiskSeries, Trajectory};

const GLYPHS: &[char] = &['1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F'];
const GUIDE: char = '.';
const RISK_GUIDES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Overlay cycle trajectories on a shared day-offset axis.
///
/// `cleaned` selects `cleaned_ratio` over `raw_ratio`.
pub fn render_cycles_plot(trajectories: &[&Trajectory], width: usize, height: usize, cleaned: bool) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let series: Vec<Vec<(f64, f64)>> = trajectories
        .iter()
        .map(|t| {
            t.rows
                .iter()
                .map(|r| {
                    let ratio = if cleaned { r.cleaned_ratio } else { r.raw_ratio };
                    (r.day_offset as f64, ratio)
                })
                .collect()
        })
        .collect();

    let x_max = series
        .iter()
        .flat_map(|s| s.iter().map(|&(x, _)| x))
        .fold(0.0, f64::max);
    let (x_min, x_max) = (0.0, x_max.max(1.0));
    let (y_min, y_max) = y_range(series.iter().flatten().map(|&(_, y)| y)).unwrap_or((0.0, 2.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (i, points) in series.iter().enumerate() {
        draw_series(&mut grid, points, glyph(i), (x_min, x_max), (y_min, y_max));
    }
    draw_guide(&mut grid, 1.0, y_min, y_max);

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: day=[{x_min:.0}, {x_max:.0}] | ratio=[{y_min:.3}, {y_max:.3}] ({})\n",
        if cleaned { "cleaned" } else { "raw" }
    ));
    push_grid(&mut out, grid);
    for (i, t) in trajectories.iter().enumerate() {
        out.push_str(&format!("  {} {}\n", glyph(i), t.label));
    }
    out
}

/// Smoothed risk over calendar time, with band boundaries as guides.
pub fn render_risk_plot(risk: &RiskSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some(first) = risk.rows.first() else {
        return "Plot: no data\n".to_string();
    };
    let points: Vec<(f64, f64)> = risk
        .rows
        .iter()
        .map(|r| ((r.date - first.date).num_days() as f64, r.smoothed_risk))
        .collect();
    let span = points.last().map_or(0.0, |&(x, _)| x);
    let x_range = (0.0, span.max(1.0));

    let mut grid = vec![vec![' '; width]; height];
    draw_series(&mut grid, &points, '*', x_range, (0.0, 1.0));
    for level in RISK_GUIDES {
        draw_guide(&mut grid, level, 0.0, 1.0);
    }

    let mut out = String::new();
    let last = risk.rows.last().unwrap_or(first);
    out.push_str(&format!(
        "Plot: {} .. {} | risk=[0, 1] | guides at 0.2 0.4 0.6 0.8\n",
        first.date, last.date
    ));
    push_grid(&mut out, grid);
    out.push_str(&format!(
        "  now {:.3} ({})\n",
        last.smoothed_risk,
        RiskLevel::from_value(last.smoothed_risk).display_name()
    ));
    out
}

fn glyph(i: usize) -> char {
    GLYPHS[i % GLYPHS.len()]
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_y.is_finite() && max_y.is_finite() {
        Some(nonempty_range(min_y, max_y))
    } else {
        None
    }
}

fn nonempty_range(min: f64, max: f64) -> (f64, f64) {
    if max > min { (min, max) } else { (min - 0.5, min + 0.5) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive points; earlier series keep the cells they took.
fn draw_series(grid: &mut [Vec<char>], points: &[(f64, f64)], ch: char, x: (f64, f64), y: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(usize, usize)> = None;
    for &(px, py) in points {
        if !py.is_finite() {
            continue;
        }
        let cx = map_x(px, x.0, x.1, width);
        let cy = map_y(py, y.0, y.1, height);
        if prev == Some((cx, cy)) {
            continue;
        }
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None if grid[cy][cx] == ' ' => grid[cy][cx] = ch,
            None => {}
        }
        prev = Some((cx, cy));
    }
}

fn draw_guide(grid: &mut [Vec<char>], level: f64, y_min: f64, y_max: f64) {
    if level < y_min || level > y_max {
        return;
    }
    let row = map_y(level, y_min, y_max, grid.len());
    for cell in grid[row].iter_mut().filter(|c| **c == ' ') {
        *cell = GUIDE;
    }
}

/// Integer line drawing (Bresenham-ish); only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
