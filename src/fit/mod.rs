//! Permeation curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - seed the search from reference correlations
//! - grid-search diffusivity with a closed-form permeability solve per
//!   candidate (parallel)
//! - refine the best candidate with damped Gauss–Newton
//! - quantify fitted properties against the reference

pub mod fitter;

pub use fitter::*;
