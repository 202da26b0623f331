//! Mathematical utilities: linear least squares and log-spaced grids.

pub mod grid;
pub mod ols;

pub use grid::*;
pub use ols::*;
