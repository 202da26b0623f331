//! Low-level fitting routines for the permeation transient.
//!
//! Given an observed flux series and fixed geometry/pressure, we recover the
//! two free parameters (permeability, diffusivity) of the closed-form
//! downstream-flux model:
//!
//! - the model is linear in permeability at fixed diffusivity, so we run a
//!   deterministic log-spaced grid search over diffusivity, solving the best
//!   permeability per candidate by least squares and keeping the lowest SSE
//! - the winning candidate seeds a damped Gauss–Newton refinement in
//!   log-parameter space, which polishes both parameters to solver tolerance
//!   and keeps them structurally positive
//!
//! Geometry and pressure are closed over, not fit: they are known precisely,
//! and fitting them would only invite overfitting. Solubility is never a
//! third parameter: it is the quotient permeability/diffusivity by
//! definition, and fitting it independently would make the problem
//! non-identifiable.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{Conditions, FluxSeries, Geometry, PermeationFit, PropertyErrors};
use crate::error::AppError;
use crate::material::PropertyReference;
use crate::math::{log_space, solve_least_squares};
use crate::models::{downstream_flux, flux_ratio, dimensionless_time};

/// Free parameters of the fit.
const FREE_PARAMS: usize = 2;

/// Relative step used for the diffusivity column of the Jacobian
/// (central difference in ln D).
const JAC_LN_STEP: f64 = 1e-6;

/// Damping bounds for the refinement.
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Fitting options that control the search and refinement.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Decades searched either side of the seed diffusivity.
    pub grid_decades: f64,
    /// Number of diffusivity candidates in the grid.
    pub grid_steps: usize,
    /// Damped Gauss–Newton iteration budget.
    pub max_iterations: usize,
    /// Convergence threshold on the log-parameter step size.
    pub step_tol: f64,
    /// Convergence threshold on relative SSE improvement per accepted step.
    pub sse_rel_tol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            grid_decades: 2.0,
            grid_steps: 61,
            max_iterations: 60,
            step_tol: 1e-10,
            sse_rel_tol: 1e-12,
        }
    }
}

/// Initial guess for the two free parameters.
///
/// Seeding from the reference correlations anchors the solver near the
/// physically expected regime, which keeps the grid window meaningful and
/// reduces the risk of converging to a non-physical local minimum.
#[derive(Debug, Clone, Copy)]
pub struct PropertySeed {
    pub permeability: f64,
    pub diffusivity: f64,
}

impl PropertySeed {
    pub fn from_reference(reference: &dyn PropertyReference, conditions: Conditions) -> Self {
        let d = reference.diffusivity(conditions.temperature_k);
        let s = reference.solubility(conditions.temperature_k);
        Self {
            permeability: d * s,
            diffusivity: d,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    permeability: f64,
    diffusivity: f64,
    sse: f64,
}

/// Fit the permeation model to an observed flux transient.
///
/// Returns the recovered coefficients and fit diagnostics, or:
/// - `InvalidInput` for non-positive geometry/pressure, a non-physical seed,
///   or a degenerate (identically zero) series
/// - `InsufficientData` for fewer observations than free parameters
/// - `Convergence` when no grid candidate is solvable or the refinement does
///   not meet tolerance within its budget
pub fn fit_permeation(
    series: &FluxSeries,
    geometry: Geometry,
    seed: PropertySeed,
    opts: &FitOptions,
) -> Result<PermeationFit, AppError> {
    if !(geometry.thickness_m.is_finite() && geometry.thickness_m > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Thickness must be > 0 (got {} m).",
            geometry.thickness_m
        )));
    }
    if !(geometry.p_up_pa.is_finite() && geometry.p_up_pa > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Upstream pressure must be > 0 (got {} Pa).",
            geometry.p_up_pa
        )));
    }
    if series.len() < FREE_PARAMS {
        return Err(AppError::insufficient_data(format!(
            "Need at least {FREE_PARAMS} flux samples to fit {FREE_PARAMS} parameters (got {}).",
            series.len()
        )));
    }
    let peak = series.max_abs_flux();
    if !(peak.is_finite() && peak > 0.0) {
        return Err(AppError::invalid_input(
            "Flux series is identically zero; the transient carries no information to fit.",
        ));
    }
    if !(seed.permeability.is_finite()
        && seed.permeability > 0.0
        && seed.diffusivity.is_finite()
        && seed.diffusivity > 0.0)
    {
        return Err(AppError::invalid_input(
            "Reference seed produced non-physical (non-positive) properties.",
        ));
    }

    let times = series.times();
    let y = series.abs_flux();

    let best = best_grid_candidate(&times, &y, geometry, seed, opts)?;
    refine(&times, &y, geometry, best, opts)
}

/// Fit and report errors against the reference correlations in one call.
pub fn fit_against_reference(
    series: &FluxSeries,
    geometry: Geometry,
    conditions: Conditions,
    reference: &dyn PropertyReference,
    opts: &FitOptions,
) -> Result<(PermeationFit, PropertyErrors), AppError> {
    if !(conditions.temperature_k.is_finite() && conditions.temperature_k > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Temperature must be > 0 K (got {} K).",
            conditions.temperature_k
        )));
    }

    let seed = PropertySeed::from_reference(reference, conditions);
    let fit = fit_permeation(series, geometry, seed, opts)?;
    let errors = property_errors(&fit, reference, conditions)?;
    Ok((fit, errors))
}

/// Signed relative errors of the fitted properties against the reference, in
/// percent: `(reference − fitted) / reference × 100` for all three
/// quantities. Positive means the fit underestimates the reference.
pub fn property_errors(
    fit: &PermeationFit,
    reference: &dyn PropertyReference,
    conditions: Conditions,
) -> Result<PropertyErrors, AppError> {
    let ref_d = reference.diffusivity(conditions.temperature_k);
    let ref_s = reference.solubility(conditions.temperature_k);
    let ref_perm = reference.permeability(conditions.temperature_k);
    if !(ref_d.is_finite() && ref_d > 0.0 && ref_s.is_finite() && ref_s > 0.0) {
        return Err(AppError::invalid_input(
            "Reference correlation returned non-physical properties.",
        ));
    }

    let rel = |reference: f64, fitted: f64| (reference - fitted) / reference * 100.0;
    Ok(PropertyErrors {
        diffusivity_pct: rel(ref_d, fit.diffusivity),
        solubility_pct: rel(ref_s, fit.solubility()),
        permeability_pct: rel(ref_perm, fit.permeability),
    })
}

fn best_grid_candidate(
    times: &[f64],
    y: &[f64],
    geometry: Geometry,
    seed: PropertySeed,
    opts: &FitOptions,
) -> Result<Candidate, AppError> {
    let span = 10f64.powf(opts.grid_decades);
    let d_grid = log_space(seed.diffusivity / span, seed.diffusivity * span, opts.grid_steps)?;

    // Evaluate each diffusivity candidate independently (parallel).
    let candidates: Vec<Candidate> = d_grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &d)| evaluate_candidate(idx, d, times, y, geometry))
        .collect();

    let Some(&first) = candidates.first() else {
        return Err(AppError::convergence(
            "No solvable diffusivity candidate in the search window; \
             the flux series may be degenerate or the seed pathological.",
        ));
    };

    // Deterministic selection: minimum SSE, ties broken by grid index.
    let mut best = first;
    for &c in &candidates[1..] {
        if c.sse < best.sse || (c.sse == best.sse && c.idx < best.idx) {
            best = c;
        }
    }
    Ok(best)
}

fn evaluate_candidate(
    idx: usize,
    diffusivity: f64,
    times: &[f64],
    y: &[f64],
    geometry: Geometry,
) -> Option<Candidate> {
    let n = times.len();

    // Basis g(t) = J(t)/Φ; the best permeability is a one-column solve.
    let scale = geometry.p_up_pa / geometry.thickness_m;
    let g: Vec<f64> = times
        .iter()
        .map(|&t| scale * flux_ratio(dimensionless_time(t, geometry.thickness_m, diffusivity)))
        .collect();

    if g.iter().all(|&v| v == 0.0) {
        // No breakthrough anywhere in the observation window.
        return None;
    }

    let x = DMatrix::from_iterator(n, 1, g.iter().copied());
    let yv = DVector::from_row_slice(y);
    let beta = solve_least_squares(&x, &yv)?;
    let permeability = beta[0];
    if !(permeability.is_finite() && permeability > 0.0) {
        return None;
    }

    let sse: f64 = g
        .iter()
        .zip(y.iter())
        .map(|(&gi, &yi)| {
            let r = yi - permeability * gi;
            r * r
        })
        .sum();

    if sse.is_finite() {
        Some(Candidate {
            idx,
            permeability,
            diffusivity,
            sse,
        })
    } else {
        None
    }
}

fn refine(
    times: &[f64],
    y: &[f64],
    geometry: Geometry,
    start: Candidate,
    opts: &FitOptions,
) -> Result<PermeationFit, AppError> {
    let n = times.len();
    let sse_at = |theta: &[f64; 2]| -> f64 {
        let (perm, d) = (theta[0].exp(), theta[1].exp());
        times
            .iter()
            .zip(y.iter())
            .map(|(&t, &yi)| {
                let r = yi - downstream_flux(t, geometry.p_up_pa, geometry.thickness_m, perm, d);
                r * r
            })
            .sum()
    };

    let mut theta = [start.permeability.ln(), start.diffusivity.ln()];
    let mut sse = start.sse;
    let mut lambda = 1e-3;
    let mut converged = false;
    let mut iterations = 0usize;

    for iter in 0..opts.max_iterations {
        iterations = iter + 1;
        let (perm, d) = (theta[0].exp(), theta[1].exp());

        // Model values and Jacobian columns in log-parameter space:
        // ∂J/∂lnΦ = J exactly (the model is proportional to Φ);
        // ∂J/∂lnD by central difference.
        let mut a = DMatrix::<f64>::zeros(n + FREE_PARAMS, FREE_PARAMS);
        let mut b = DVector::<f64>::zeros(n + FREE_PARAMS);
        for i in 0..n {
            let t = times[i];
            let ji = downstream_flux(t, geometry.p_up_pa, geometry.thickness_m, perm, d);
            let j_hi = downstream_flux(
                t,
                geometry.p_up_pa,
                geometry.thickness_m,
                perm,
                d * JAC_LN_STEP.exp(),
            );
            let j_lo = downstream_flux(
                t,
                geometry.p_up_pa,
                geometry.thickness_m,
                perm,
                d * (-JAC_LN_STEP).exp(),
            );
            a[(i, 0)] = ji;
            a[(i, 1)] = (j_hi - j_lo) / (2.0 * JAC_LN_STEP);
            b[i] = y[i] - ji;
        }
        // Marquardt-scaled damping rows: λ is relative to each column's
        // curvature, so the step stays meaningful across flux magnitudes.
        for j in 0..FREE_PARAMS {
            let col_sq: f64 = (0..n).map(|i| a[(i, j)] * a[(i, j)]).sum();
            a[(n + j, j)] = (lambda * col_sq).sqrt();
        }

        let Some(delta) = solve_least_squares(&a, &b) else {
            lambda = (lambda * 10.0).min(LAMBDA_MAX);
            continue;
        };

        let theta_new = [theta[0] + delta[0], theta[1] + delta[1]];
        let sse_new = sse_at(&theta_new);

        if sse_new.is_finite() && sse_new <= sse {
            let step = delta[0].abs().max(delta[1].abs());
            let improvement = (sse - sse_new) / sse.max(f64::MIN_POSITIVE);
            theta = theta_new;
            sse = sse_new;
            lambda = (lambda * 0.25).max(LAMBDA_MIN);
            if step < opts.step_tol || improvement < opts.sse_rel_tol {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }
    }

    if !converged {
        return Err(AppError::convergence(format!(
            "Refinement did not converge within {} iterations (SSE = {sse:.6e}).",
            opts.max_iterations
        )));
    }

    Ok(PermeationFit {
        permeability: theta[0].exp(),
        diffusivity: theta[1].exp(),
        sse,
        rmse: (sse / n as f64).sqrt(),
        iterations,
    })
}
