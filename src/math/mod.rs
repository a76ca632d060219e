//! Numeric utilities: rolling-window statistics and gap filling.

pub mod interp;
pub mod rolling;

pub use interp::*;
pub use rolling::*;
