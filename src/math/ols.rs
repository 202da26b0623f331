//! Linear least squares solver.
//!
//! Two sub-problems in the fit reduce to small linear regressions:
//!
//! - per diffusivity candidate, the flux model is linear in permeability, so
//!   the best steady-scale coefficient is a one-column least-squares solve
//! - each damped Gauss–Newton step solves the augmented system
//!   `[J; √λ·I] δ = [r; 0]`
//!
//! Implementation choices:
//! - We use SVD to solve robustly even when the design matrix is tall (many
//!   flux samples, 1–2 columns). Nalgebra's `QR::solve` targets square
//!   systems.
//! - Parameter dimension is tiny, so SVD cost is negligible next to the
//!   series evaluations.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Early-transient rows are all ~0 flux, which can leave the design matrix
    // near rank-deficient; try progressively looser tolerances before giving
    // up on a candidate.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
