//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and sweeps
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One observed flux sample.
///
/// `flux` is a surface-averaged permeation flux (amount · m⁻² · s⁻¹). The sign
/// of the raw simulation output encodes direction, not magnitude; the fitter
/// works with `|flux|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluxSample {
    pub time_s: f64,
    pub flux: f64,
}

/// An ordered flux transient, validated at construction:
///
/// - all values finite
/// - times non-negative and strictly increasing
///
/// Length is *not* constrained here; the fitter enforces its own minimum so a
/// too-short series fails at fit time with the dedicated error kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxSeries {
    samples: Vec<FluxSample>,
}

impl FluxSeries {
    pub fn new(samples: Vec<FluxSample>) -> Result<Self, AppError> {
        for (i, s) in samples.iter().enumerate() {
            if !(s.time_s.is_finite() && s.flux.is_finite()) {
                return Err(AppError::invalid_input(format!(
                    "Non-finite flux sample at index {i}."
                )));
            }
            if s.time_s < 0.0 {
                return Err(AppError::invalid_input(format!(
                    "Negative time at index {i} (t = {} s).",
                    s.time_s
                )));
            }
        }
        for w in samples.windows(2) {
            if w[1].time_s <= w[0].time_s {
                return Err(AppError::invalid_input(format!(
                    "Times must be strictly increasing (t = {} s followed by {} s).",
                    w[0].time_s, w[1].time_s
                )));
            }
        }
        Ok(Self { samples })
    }

    pub fn from_pairs(times_s: &[f64], flux: &[f64]) -> Result<Self, AppError> {
        if times_s.len() != flux.len() {
            return Err(AppError::invalid_input(format!(
                "Time and flux lengths differ ({} vs {}).",
                times_s.len(),
                flux.len()
            )));
        }
        let samples = times_s
            .iter()
            .zip(flux.iter())
            .map(|(&time_s, &flux)| FluxSample { time_s, flux })
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[FluxSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_s).collect()
    }

    /// Flux magnitudes, as used by the fit objective.
    pub fn abs_flux(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.flux.abs()).collect()
    }

    pub fn max_abs_flux(&self) -> f64 {
        self.samples.iter().map(|s| s.flux.abs()).fold(0.0, f64::max)
    }

    /// Last observed flux magnitude (≈ steady state for a long transient).
    pub fn final_abs_flux(&self) -> Option<f64> {
        self.samples.last().map(|s| s.flux.abs())
    }
}

/// Fixed experiment geometry and driving pressure.
///
/// Both are held constant during fitting (they are known precisely from the
/// experiment setup and are deliberately *not* fit parameters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Salt layer thickness [m].
    pub thickness_m: f64,
    /// Upstream driving pressure [Pa].
    pub p_up_pa: f64,
}

/// Experiment conditions relevant to the reference correlations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Absolute temperature [K].
    pub temperature_k: f64,
}

/// Recovered effective transport coefficients plus fit diagnostics.
///
/// Solubility is *derived*, never fit: permeability and solubility are not
/// independent (permeability = diffusivity × solubility), so fitting all
/// three would be degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermeationFit {
    /// Effective permeability [amount · m⁻¹ · s⁻¹ · Pa⁻¹].
    pub permeability: f64,
    /// Effective diffusivity [m² · s⁻¹].
    pub diffusivity: f64,
    /// Sum of squared flux residuals.
    pub sse: f64,
    /// Root mean squared flux residual.
    pub rmse: f64,
    /// Refinement iterations actually used.
    pub iterations: usize,
}

impl PermeationFit {
    /// Derived effective solubility [amount · m⁻³ · Pa⁻¹].
    pub fn solubility(&self) -> f64 {
        self.permeability / self.diffusivity
    }
}

/// Signed relative errors of the fitted properties against the reference
/// correlations, in percent.
///
/// Positive means the fitted value underestimates the reference; the same
/// reference-relative convention applies to all three quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyErrors {
    pub diffusivity_pct: f64,
    pub solubility_pct: f64,
    pub permeability_pct: f64,
}

impl PropertyErrors {
    pub fn get(&self, quantity: ErrorQuantity) -> f64 {
        match quantity {
            ErrorQuantity::Diffusivity => self.diffusivity_pct,
            ErrorQuantity::Solubility => self.solubility_pct,
            ErrorQuantity::Permeability => self.permeability_pct,
        }
    }
}

/// Which error surface to export/plot from a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorQuantity {
    Diffusivity,
    Solubility,
    Permeability,
}

impl ErrorQuantity {
    pub const ALL: [ErrorQuantity; 3] = [
        ErrorQuantity::Diffusivity,
        ErrorQuantity::Solubility,
        ErrorQuantity::Permeability,
    ];

    /// Human-readable label for plot captions and summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            ErrorQuantity::Diffusivity => "Diffusivity",
            ErrorQuantity::Solubility => "Solubility",
            ErrorQuantity::Permeability => "Permeability",
        }
    }
}

/// How the sweep driver reacts to a per-point fit failure.
///
/// The reference workflow had no explicit handling here; we make the policy a
/// caller decision instead of silently swallowing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole sweep with the first failing point's error.
    Fail,
    /// Mark the point missing, record the failure, and continue.
    Skip,
}

/// Which simulation variant a sweep directory tree is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SimDimension {
    #[serde(rename = "1d")]
    #[value(name = "1d")]
    OneD,
    #[serde(rename = "2d")]
    #[value(name = "2d")]
    TwoD,
}

impl SimDimension {
    /// Subdirectory name used by the simulation output layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            SimDimension::OneD => "1d",
            SimDimension::TwoD => "2d",
        }
    }
}
