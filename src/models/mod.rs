//! Closed-form permeation model.
//!
//! The fitter relies on two primitive operations:
//! - evaluate the downstream flux at a given time (for residuals/plots)
//! - evaluate the steady-scale basis `flux / permeability` (for the linear
//!   sub-problem of the grid search)
//!
//! Both are implemented here.

pub mod flux;

pub use flux::*;
