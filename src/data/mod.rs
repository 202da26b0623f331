//! Synthetic flux-series generation.

pub mod synth;

pub use synth::*;
