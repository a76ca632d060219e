//! Input/output helpers.
//!
//! - price CSV ingest + validation (`ingest`)
//! - custom anchors JSON (`anchors`)
//! - trajectory and risk CSV exports (`export`)

pub mod anchors;
pub mod export;
pub mod ingest;

pub use anchors::*;
pub use export::*;
pub use ingest::*;
