//! Formatted run summaries.

use crate::domain::{Conditions, ErrorQuantity, Geometry, PermeationFit, PropertyErrors};
use crate::material::PropertyReference;
use crate::sweep::SweepResult;

/// Format the full fit summary (inputs + recovered properties + errors).
pub fn format_fit_summary(
    geometry: Geometry,
    conditions: Conditions,
    n_points: usize,
    fit: &PermeationFit,
    errors: &PropertyErrors,
    reference: &dyn PropertyReference,
    reference_name: &str,
) -> String {
    let t = conditions.temperature_k;
    let mut out = String::new();

    out.push_str("=== permfit - Permeation Transient Fit ===\n");
    out.push_str(&format!(
        "Geometry: L = {:.3} mm | P_up = {:.1} Pa | T = {:.1} K\n",
        geometry.thickness_m * 1000.0,
        geometry.p_up_pa,
        t,
    ));
    out.push_str(&format!(
        "Samples: n={} | SSE={:.4e} | RMSE={:.4e} | iterations={}\n",
        n_points, fit.sse, fit.rmse, fit.iterations
    ));
    out.push_str(&format!("Reference: {reference_name}\n"));

    out.push_str("\nProperties (fitted vs reference):\n");
    let rows = [
        (
            ErrorQuantity::Diffusivity,
            "m²/s",
            fit.diffusivity,
            reference.diffusivity(t),
        ),
        (
            ErrorQuantity::Solubility,
            "mol/m³/Pa",
            fit.solubility(),
            reference.solubility(t),
        ),
        (
            ErrorQuantity::Permeability,
            "mol/m/s/Pa",
            fit.permeability,
            reference.permeability(t),
        ),
    ];
    for (quantity, unit, fitted, reference_value) in rows {
        out.push_str(&format!(
            "  {:<13} {:>12.4e} vs {:>12.4e} {:<10} error {:+8.3}%\n",
            quantity.display_name(),
            fitted,
            reference_value,
            unit,
            errors.get(quantity),
        ));
    }

    out
}

/// Format the sweep outcome: coverage, failures, and the worst cell per
/// quantity.
pub fn format_sweep_summary(result: &SweepResult) -> String {
    let mut out = String::new();

    out.push_str("=== permfit - Geometry Sweep ===\n");
    out.push_str(&format!(
        "Grid: {} thicknesses x {} diameters | fitted {}/{} points\n",
        result.grid.thicknesses_m.len(),
        result.grid.diameters_m.len(),
        result.fitted_count(),
        result.grid.cell_count(),
    ));

    for quantity in ErrorQuantity::ALL {
        if let Some((thickness_m, diameter_m, value)) = worst_cell(result, quantity) {
            out.push_str(&format!(
                "Worst {:<13} error: {:+8.3}% at L = {:.2} mm, d = {:.2} mm\n",
                quantity.display_name(),
                value,
                thickness_m * 1000.0,
                diameter_m * 1000.0,
            ));
        }
    }

    if !result.failures.is_empty() {
        out.push_str(&format!("\nSkipped points ({}):\n", result.failures.len()));
        for f in &result.failures {
            out.push_str(&format!(
                "  L = {:.2} mm, d = {:.2} mm: {}\n",
                f.thickness_m * 1000.0,
                f.diameter_m * 1000.0,
                f.message,
            ));
        }
    }

    out
}

fn worst_cell(result: &SweepResult, quantity: ErrorQuantity) -> Option<(f64, f64, f64)> {
    let mut worst: Option<(f64, f64, f64)> = None;
    for (di, row) in result.cells.iter().enumerate() {
        for (ti, cell) in row.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let value = cell.errors.get(quantity);
            if worst.is_none_or(|(_, _, w)| value.abs() > w.abs()) {
                worst = Some((
                    result.grid.thicknesses_m[ti],
                    result.grid.diameters_m[di],
                    value,
                ));
            }
        }
    }
    worst
}
