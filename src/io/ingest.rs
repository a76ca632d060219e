//! CSV ingest for daily price history.
//!
//! Accepted schema (header names are case-insensitive, a UTF-8 BOM is ignored):
//!
//! - a date column: `date` (calendar date) or `time` / `timestamp` (unix seconds)
//! - a price column: `close`, `price` or `adj_close`
//!
//! Bad rows are skipped and reported with their line number; duplicate dates
//! keep the later row.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use csv::StringRecord;

use crate::domain::{PricePoint, PriceSeries};
use crate::error::AppError;

const DATE_COLUMNS: [&str; 1] = ["date"];
const TIME_COLUMNS: [&str; 2] = ["time", "timestamp"];
const CLOSE_COLUMNS: [&str; 4] = ["close", "price", "adj_close", "adj close"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the cleaned series plus bookkeeping for reports.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: PriceSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows that parsed, before duplicate dates collapsed.
    pub rows_used: usize,
}

impl IngestedSeries {
    pub fn duplicates(&self) -> usize {
        self.rows_used - self.series.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum DateColumn {
    Date(usize),
    UnixSeconds(usize),
}

pub fn load_price_csv(path: &Path) -> Result<IngestedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_price_csv(file)
}

pub fn read_price_csv<R: Read>(input: R) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_col = find_column(&header_map, &DATE_COLUMNS)
        .map(DateColumn::Date)
        .or_else(|| find_column(&header_map, &TIME_COLUMNS).map(DateColumn::UnixSeconds))
        .ok_or_else(|| AppError::new(2, "Missing required column: `date` (or `time`)"))?;
    let close_col = find_column(&header_map, &CLOSE_COLUMNS)
        .ok_or_else(|| AppError::new(2, "Missing required column: `close` (or `price`)"))?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, date_col, close_col));
        match parsed {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        log::warn!("skipped {} of {rows_read} CSV rows", row_errors.len());
        for err in row_errors.iter().take(5) {
            log::warn!("  line {}: {}", err.line, err.message);
        }
    }

    let rows_used = points.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid price rows in CSV."));
    }

    Ok(IngestedSeries {
        series: PriceSeries::from_points(points),
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| header_map.get(*name).copied())
}

fn parse_row(record: &StringRecord, date_col: DateColumn, close_col: usize) -> Result<PricePoint, String> {
    let date = match date_col {
        DateColumn::Date(idx) => parse_date(get_required(record, idx, "date")?)?,
        DateColumn::UnixSeconds(idx) => parse_unix_date(get_required(record, idx, "time")?)?,
    };

    let raw = get_required(record, close_col, "close")?;
    let close = raw
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| format!("Invalid close '{raw}'."))?;
    if !(close.is_finite() && close > 0.0) {
        return Err(format!("Close must be positive, got {close}."));
    }

    Ok(PricePoint::new(date, close))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO first; a couple of common day-first exports are tolerated. A trailing
    // time component (`2024-01-01 00:00:00`) is ignored.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    let day = s.split([' ', 'T']).next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(day, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

fn parse_unix_date(s: &str) -> Result<NaiveDate, String> {
    let secs = s
        .parse::<i64>()
        .map_err(|_| format!("Invalid unix time '{s}'."))?;
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| format!("Unix time out of range: {secs}"))
}
