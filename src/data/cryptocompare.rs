//! CryptoCompare daily history (`histoday`) integration.

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{PricePoint, PriceSeries};
use crate::error::AppError;

const BASE_URL: &str = "https://min-api.cryptocompare.com/data/v2/histoday";
/// Maximum rows per request accepted by the endpoint.
const PAGE_LIMIT: i64 = 2000;
const SECONDS_PER_DAY: i64 = 86_400;

pub struct HistodayClient {
    client: Client,
    api_key: Option<String>,
}

impl HistodayClient {
    /// Build a client; `CRYPTOCOMPARE_API_KEY` (environment or `.env`) is optional.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("CRYPTOCOMPARE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Fetch daily closes for `symbol` quoted in `currency` over `[from, to]`.
    pub fn fetch_daily(
        &self,
        symbol: &str,
        currency: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, AppError> {
        if from > to {
            return Err(AppError::new(2, format!("Start date {from} is after end date {to}.")));
        }

        let mut bars = Vec::new();
        for to_ts in page_ends(unix_seconds(from), unix_seconds(to)) {
            log::debug!("histoday {symbol}/{currency}: page ending {to_ts}");
            match self.fetch_page(symbol, currency, to_ts)? {
                Page::Bars(page) => bars.extend(page),
                Page::Stop(message) => {
                    log::warn!("histoday {symbol}/{currency}: stopped paging ({message})");
                    break;
                }
            }
        }

        let fetched = bars.len();
        let points = bars_to_points(bars, from, to);
        if points.is_empty() {
            return Err(AppError::new(
                4,
                format!("No observations returned for {symbol}/{currency}."),
            ));
        }

        let series = PriceSeries::from_points(points);
        log::debug!(
            "histoday {symbol}/{currency}: {fetched} rows fetched, {} days kept",
            series.len()
        );
        Ok(series)
    }

    fn fetch_page(&self, symbol: &str, currency: &str, to_ts: i64) -> Result<Page, AppError> {
        let mut req = self.client.get(BASE_URL).query(&[
            ("fsym", symbol),
            ("tsym", currency),
            ("limit", &PAGE_LIMIT.to_string()),
            ("toTs", &to_ts.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("api_key", key.as_str())]);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::new(4, format!("CryptoCompare request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("CryptoCompare request failed with status {}.", resp.status()),
            ));
        }

        let body: HistodayResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse CryptoCompare response: {e}")))?;

        if body.response != "Success" {
            let message = if body.message.is_empty() {
                body.response
            } else {
                body.message
            };
            return Ok(Page::Stop(message));
        }
        Ok(Page::Bars(body.data.map(|d| d.data).unwrap_or_default()))
    }
}

enum Page {
    Bars(Vec<HistodayBar>),
    Stop(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistodayResponse {
    response: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<HistodayData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistodayData {
    #[serde(default)]
    data: Vec<HistodayBar>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct HistodayBar {
    time: i64,
    close: f64,
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// `toTs` values for each request: 2000-day steps from `from_ts`, capped at `to_ts`.
fn page_ends(from_ts: i64, to_ts: i64) -> Vec<i64> {
    let step = PAGE_LIMIT * SECONDS_PER_DAY;
    let mut out = Vec::new();
    let mut current = from_ts;
    while current < to_ts {
        out.push((current + step).min(to_ts));
        current += step;
    }
    if out.is_empty() {
        out.push(to_ts);
    }
    out
}

/// Keep positive closes inside `[from, to]`, in arrival order.
///
/// The endpoint pads days before the asset traded with zero closes.
fn bars_to_points(bars: Vec<HistodayBar>, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
    bars.into_iter()
        .filter(|bar| bar.close.is_finite() && bar.close > 0.0)
        .filter_map(|bar| {
            let date = DateTime::from_timestamp(bar.time, 0)?.date_naive();
            (from..=to).contains(&date).then(|| PricePoint::new(date, bar.close))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn pages_step_by_two_thousand_days() {
        let from = unix_seconds(d(2012, 1, 1));
        let to = unix_seconds(d(2025, 1, 1));
        let ends = page_ends(from, to);

        assert_eq!(ends.len(), 3);
        assert_eq!(ends[0], from + 2000 * SECONDS_PER_DAY);
        assert_eq!(ends[1], from + 4000 * SECONDS_PER_DAY);
        assert_eq!(*ends.last().unwrap(), to);
    }

    #[test]
    fn single_day_range_still_requests_once() {
        let ts = unix_seconds(d(2024, 3, 1));
        assert_eq!(page_ends(ts, ts), vec![ts]);
    }

    #[test]
    fn zero_closes_and_out_of_range_days_are_dropped() {
        let day = |date: NaiveDate, close: f64| HistodayBar {
            time: unix_seconds(date),
            close,
        };
        let bars = vec![
            day(d(2010, 7, 16), 0.05),
            day(d(2010, 7, 17), 0.0),
            day(d(2010, 7, 18), 0.09),
            day(d(2010, 7, 19), 0.08),
            day(d(2010, 7, 25), 0.07),
        ];
        let points = bars_to_points(bars, d(2010, 7, 17), d(2010, 7, 20));
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2010, 7, 18), d(2010, 7, 19)]);
    }

    #[test]
    fn overlapping_pages_keep_the_later_row() {
        let bar = |close: f64| HistodayBar {
            time: unix_seconds(d(2020, 1, 1)),
            close,
        };
        let points = bars_to_points(vec![bar(7000.0), bar(7200.0)], d(2019, 1, 1), d(2021, 1, 1));
        let series = PriceSeries::from_points(points);
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().unwrap().close, 7200.0);
    }

    #[test]
    fn error_payload_parses_without_rows() {
        let json = r#"{"Response":"Error","Message":"rate limit","HasWarning":false,"Type":2,"Data":{}}"#;
        let body: HistodayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.response, "Error");
        assert_eq!(body.message, "rate limit");
        assert!(body.data.unwrap().data.is_empty());
    }

    #[test]
    fn success_payload_parses_rows() {
        let json = r#"{"Response":"Success","Message":"","Data":{"Aggregated":false,"TimeFrom":1,"TimeTo":2,
            "Data":[{"time":1704067200,"high":1,"low":1,"open":1,"close":42283.58,"volumefrom":0,"volumeto":0}]}}"#;
        let body: HistodayResponse = serde_json::from_str(json).unwrap();
        let rows = body.data.unwrap().data;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time, 1_704_067_200);
        assert!((rows[0].close - 42283.58).abs() < 1e-9);
    }
}
