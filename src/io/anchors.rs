//! Custom cycle anchors from a JSON file.
//!
//! ```json
//! [
//!   { "label": "Cycle 3 (2021)", "start": "2021-11-08", "end": "2022-11-21" },
//!   { "label": "Current", "start": "2025-10-06", "end": null }
//! ]
//! ```
//!
//! A missing or `null` `end` runs the cycle to the last observation.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{AnchorEnd, AnchorSpec};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnchorEntry {
    label: String,
    start: NaiveDate,
    #[serde(default)]
    end: Option<NaiveDate>,
}

pub fn load_anchors_json(path: &Path) -> Result<Vec<AnchorSpec>, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read anchors file '{}': {e}", path.display())))?;
    parse_anchors(&text)
        .map_err(|e| AppError::new(2, format!("Invalid anchors file '{}': {e}", path.display())))
}

pub fn parse_anchors(text: &str) -> Result<Vec<AnchorSpec>, String> {
    let entries: Vec<AnchorEntry> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if entries.is_empty() {
        return Err("no anchors listed".to_string());
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry.label.trim();
            if label.is_empty() {
                return Err(format!("anchor #{} has an empty label", i + 1));
            }
            let end = entry.end.map_or(AnchorEnd::SeriesEnd, AnchorEnd::Date);
            Ok(AnchorSpec::new(label, entry.start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_open_ends() {
        let anchors = parse_anchors(
            r#"[
                {"label": "A", "start": "2021-11-08", "end": "2022-11-21"},
                {"label": "B", "start": "2025-10-06", "end": null},
                {"label": "C", "start": "2024-04-19"}
            ]"#,
        )
        .unwrap();

        assert_eq!(anchors.len(), 3);
        assert_eq!(
            anchors[0].end,
            AnchorEnd::Date(NaiveDate::from_ymd_opt(2022, 11, 21).unwrap())
        );
        assert_eq!(anchors[1].end, AnchorEnd::SeriesEnd);
        assert_eq!(anchors[2].end, AnchorEnd::SeriesEnd);
    }

    #[test]
    fn rejects_empty_lists_and_labels() {
        assert!(parse_anchors("[]").is_err());
        assert!(parse_anchors(r#"[{"label": " ", "start": "2021-01-01"}]"#).is_err());
        assert!(parse_anchors(r#"[{"label": "x", "start": "01/01/2021"}]"#).is_err());
        assert!(parse_anchors(r#"[{"label": "x", "begin": "2021-01-01"}]"#).is_err());
    }
}
