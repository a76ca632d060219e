//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - price inputs (`PricePoint`, `PriceSeries`) and cycle definitions (`AnchorSpec`)
//! - analysis outputs (`Trajectory`, `RiskSeries`)
//! - built-in cycle collections (`CyclePreset`)
//! - run configuration (`AnalysisConfig`)

pub mod preset;
pub mod types;

pub use preset::*;
pub use types::*;
