//! Input/output helpers.
//!
//! - reference dataset CSV ingest + column statistics (`ingest`)
//! - submission exports (CSV rows / JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
