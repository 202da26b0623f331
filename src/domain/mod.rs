//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated flux observations (`FluxSeries`, `FluxSample`)
//! - experiment inputs (`Geometry`, `Conditions`)
//! - fit outputs (`PermeationFit`, `PropertyErrors`)
//! - sweep configuration (`FailurePolicy`, `ErrorQuantity`, `SimDimension`)

pub mod types;

pub use types::*;
