//! Built-in cycle collections.
//!
//! Each preset is a list of `AnchorSpec`s plus the wording used when
//! reporting its anchor and end events.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::AnchorSpec;

/// Named anchor collections for BTC market cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CyclePreset {
    /// All-time high to cycle bottom.
    Ath,
    /// Cycle bottom to the next all-time high.
    Bottom,
    /// Halving to the next halving.
    Halving,
}

impl CyclePreset {
    pub const ALL: [CyclePreset; 3] = [CyclePreset::Ath, CyclePreset::Bottom, CyclePreset::Halving];

    pub fn display_name(self) -> &'static str {
        match self {
            CyclePreset::Ath => "ROI from ATH",
            CyclePreset::Bottom => "ROI Bottom -> ATH",
            CyclePreset::Halving => "ROI from Halving to Halving",
        }
    }

    /// Event at offset 0.
    pub fn anchor_event(self) -> &'static str {
        match self {
            CyclePreset::Ath => "ATH",
            CyclePreset::Bottom => "Bottom",
            CyclePreset::Halving => "Halving",
        }
    }

    /// Event at the last offset.
    pub fn end_event(self) -> &'static str {
        match self {
            CyclePreset::Ath => "Bottom",
            CyclePreset::Bottom => "Peak",
            CyclePreset::Halving => "Cycle end",
        }
    }

    pub fn next(self) -> Self {
        match self {
            CyclePreset::Ath => CyclePreset::Bottom,
            CyclePreset::Bottom => CyclePreset::Halving,
            CyclePreset::Halving => CyclePreset::Ath,
        }
    }

    /// Earliest date any anchor in the preset needs.
    pub fn earliest_start(self) -> NaiveDate {
        self.anchors()
            .iter()
            .map(|a| a.start)
            .min()
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn anchors(self) -> Vec<AnchorSpec> {
        match self {
            CyclePreset::Ath => vec![
                AnchorSpec::until("Cycle 1 (2013)", ymd(2013, 11, 29), ymd(2015, 1, 14)),
                AnchorSpec::until("Cycle 2 (2017)", ymd(2017, 12, 17), ymd(2018, 12, 15)),
                AnchorSpec::until("Cycle 3 (2021)", ymd(2021, 11, 8), ymd(2022, 11, 21)),
                AnchorSpec::to_series_end("Cycle 4 (2025)", ymd(2025, 10, 6)),
            ],
            CyclePreset::Bottom => vec![
                AnchorSpec::until("Cycle 1 (2015)", ymd(2015, 1, 14), ymd(2017, 12, 17)),
                AnchorSpec::until("Cycle 2 (2018)", ymd(2018, 12, 16), ymd(2021, 11, 8)),
                AnchorSpec::until("Cycle 3 (2022)", ymd(2022, 11, 9), ymd(2025, 10, 6)),
            ],
            CyclePreset::Halving => vec![
                AnchorSpec::until("Halving 1-2", ymd(2012, 11, 28), ymd(2016, 7, 9)),
                AnchorSpec::until("Halving 2-3", ymd(2016, 7, 9), ymd(2020, 5, 11)),
                AnchorSpec::until("Halving 3-4", ymd(2020, 5, 11), ymd(2024, 4, 19)),
                AnchorSpec::to_series_end("Halving 4-5", ymd(2024, 4, 19)),
            ],
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnchorEnd;

    #[test]
    fn presets_have_ordered_anchors() {
        for preset in CyclePreset::ALL {
            let anchors = preset.anchors();
            assert!(!anchors.is_empty());
            for a in &anchors {
                assert_ne!(a.start, NaiveDate::MIN);
                if let AnchorEnd::Date(end) = a.end {
                    assert!(a.start < end, "{}: {} !< {end}", a.label, a.start);
                }
            }
        }
    }

    #[test]
    fn halving_starts_earliest() {
        assert_eq!(
            CyclePreset::Halving.earliest_start(),
            NaiveDate::from_ymd_opt(2012, 11, 28).unwrap()
        );
        assert_eq!(CyclePreset::Halving.next(), CyclePreset::Ath);
    }
}
