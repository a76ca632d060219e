//! Price history sources.
//!
//! - CryptoCompare daily history over HTTP (`cryptocompare`)
//! - deterministic synthetic series for offline runs (`sample`)

pub mod cryptocompare;
pub mod sample;

pub use cryptocompare::*;
pub use sample::*;
