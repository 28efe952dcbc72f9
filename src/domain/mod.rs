//! Domain types used throughout the flow.
//!
//! This module defines:
//!
//! - the feature schema (`Feature`, `FeatureKind`)
//! - categorical enumerations built from the reference data (`CategoryDomain`)
//! - the assembled feature row (`InputRecord`) and model output (`Prediction`)

pub mod types;

pub use types::*;
