//! Transient downstream flux through a slab under Henry's-law dissolution.
//!
//! With upstream pressure `P`, thickness `L`, permeability `Φ` and
//! diffusivity `D`, the downstream flux is
//!
//! ```text
//! J(t) = (Φ·P/L) · f(τ),   τ = D·t/L²
//! f(τ) = 1 + 2 Σ_{n≥1} (−1)^n exp(−n²π²τ)
//! ```
//!
//! Numerical notes:
//! - The series above alternates and converges slowly as `τ → 0` (its partial
//!   sums oscillate between 0 and 1 at `τ = 0`). Below a crossover we use the
//!   theta-transformed dual, which converges in a couple of terms there:
//!
//! ```text
//! f(τ) = (2/√(πτ)) Σ_{n≥0} exp(−(2n+1)²/(4τ))
//! ```
//!
//! - Both branches agree to machine precision near the crossover; limits are
//!   `f → 0` as `τ → 0` and `f → 1` as `τ → ∞`.

/// Dimensionless time below which the theta-transformed series is used.
const SMALL_TAU: f64 = 0.3;

/// Relative truncation tolerance for both series.
const SERIES_EPS: f64 = 1e-15;

/// Hard cap on series terms; both branches are well inside this for any
/// representable `τ`.
const MAX_TERMS: usize = 256;

/// Instantaneous downstream flux `J(t)` [amount·m⁻²·s⁻¹].
///
/// Returns 0 for `t ≤ 0` (no breakthrough before the transient starts).
pub fn downstream_flux(
    t_s: f64,
    p_up_pa: f64,
    thickness_m: f64,
    permeability: f64,
    diffusivity: f64,
) -> f64 {
    let j_ss = steady_state_flux(p_up_pa, thickness_m, permeability);
    j_ss * flux_ratio(dimensionless_time(t_s, thickness_m, diffusivity))
}

/// Steady-state flux `Φ·P/L`.
pub fn steady_state_flux(p_up_pa: f64, thickness_m: f64, permeability: f64) -> f64 {
    permeability * p_up_pa / thickness_m
}

/// `τ = D·t/L²`.
pub fn dimensionless_time(t_s: f64, thickness_m: f64, diffusivity: f64) -> f64 {
    diffusivity * t_s / (thickness_m * thickness_m)
}

/// Normalized breakthrough curve `f(τ) = J/J_ss ∈ [0, 1]`.
pub fn flux_ratio(tau: f64) -> f64 {
    if tau <= 0.0 {
        return 0.0;
    }
    if tau < SMALL_TAU {
        flux_ratio_small_tau(tau)
    } else {
        flux_ratio_large_tau(tau)
    }
}

fn flux_ratio_small_tau(tau: f64) -> f64 {
    // (2/√(πτ)) Σ exp(−(2n+1)²/(4τ)); every term positive, fast decay.
    let mut sum = 0.0;
    for n in 0..MAX_TERMS {
        let k = (2 * n + 1) as f64;
        let term = (-k * k / (4.0 * tau)).exp();
        sum += term;
        if term < SERIES_EPS * sum.max(f64::MIN_POSITIVE) {
            break;
        }
    }
    2.0 / (std::f64::consts::PI * tau).sqrt() * sum
}

fn flux_ratio_large_tau(tau: f64) -> f64 {
    // 1 + 2 Σ (−1)^n exp(−n²π²τ); terms decay geometrically for τ ≥ SMALL_TAU.
    let pi2_tau = std::f64::consts::PI * std::f64::consts::PI * tau;
    let mut sum = 0.0;
    let mut sign = -1.0;
    for n in 1..=MAX_TERMS {
        let nf = n as f64;
        let term = (-nf * nf * pi2_tau).exp();
        sum += sign * term;
        sign = -sign;
        if term < SERIES_EPS {
            break;
        }
    }
    (1.0 + 2.0 * sum).max(0.0)
}
