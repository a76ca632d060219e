//! Analysis core.
//!
//! Responsibilities:
//!
//! - resolve requested dates to available observations
//! - repair localized outliers in ratio series
//! - normalize cycles to anchor-relative trajectories (parallel over anchors)
//! - compute the rolling risk index
//!
//! Everything here is pure: inputs are borrowed, outputs are fresh values.

pub mod normalize;
pub mod resolve;
pub mod risk;
pub mod smooth;

pub use normalize::*;
pub use resolve::*;
pub use risk::*;
pub use smooth::*;
