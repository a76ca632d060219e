//! `cycle-roi` library crate.
//!
//! The binary (`cyc`) is a thin wrapper around this library so that:
//!
//! - cycle normalization and the risk index are testable without spawning processes
//! - the CLI and the TUI share one pipeline (`app::pipeline`)

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
