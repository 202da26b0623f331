//! Parameter-sweep orchestration.
//!
//! The driver walks a (thickness × diameter) grid, pulls each point's
//! observed flux series from an injected [`FluxSource`], runs one independent
//! fit per point, and collects the three property-error percentages into a
//! result grid for export and contour-style rendering.
//!
//! Each grid point is a pure, order-insensitive computation, so cells are
//! evaluated in parallel and collected positionally; there is no shared
//! mutable accumulator. Per-point failures are handled by an explicit
//! [`FailurePolicy`](crate::domain::FailurePolicy) instead of being silently
//! swallowed.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Conditions, ErrorQuantity, FailurePolicy, FluxSeries, Geometry, PermeationFit, PropertyErrors,
};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_against_reference};
use crate::material::PropertyReference;
use crate::math::lin_space;

/// Supplies the observed flux series for one grid point.
///
/// Implementations are injected by the caller; the bundled one reads the
/// simulation output directory layout (see `io::ingest`).
pub trait FluxSource: Sync {
    fn flux_series(&self, thickness_m: f64, diameter_m: f64) -> Result<FluxSeries, AppError>;
}

/// The sweep axes. Diameter only affects which series is sourced (and its
/// per-area normalization); the fit itself depends on thickness and pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub thicknesses_m: Vec<f64>,
    pub diameters_m: Vec<f64>,
}

impl SweepGrid {
    /// Build inclusive linear axes, e.g. the reference workflow's
    /// 2–15 mm × 20–100 mm window.
    pub fn linspace(
        thickness_range_m: (f64, f64),
        thickness_steps: usize,
        diameter_range_m: (f64, f64),
        diameter_steps: usize,
    ) -> Result<Self, AppError> {
        Ok(Self {
            thicknesses_m: lin_space(thickness_range_m.0, thickness_range_m.1, thickness_steps)?,
            diameters_m: lin_space(diameter_range_m.0, diameter_range_m.1, diameter_steps)?,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.thicknesses_m.len() * self.diameters_m.len()
    }
}

/// Successful fit output for one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepCell {
    pub fit: PermeationFit,
    pub errors: PropertyErrors,
}

/// A recorded per-point failure (only under `FailurePolicy::Skip`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub thickness_m: f64,
    pub diameter_m: f64,
    pub message: String,
}

/// Sweep output: `cells[di][ti]` is indexed diameter-major to match the
/// (thickness on x, diameter on y) orientation of the error maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub grid: SweepGrid,
    pub cells: Vec<Vec<Option<SweepCell>>>,
    pub failures: Vec<SweepFailure>,
}

impl SweepResult {
    /// One error surface, same orientation as `cells`; `None` marks a
    /// skipped point.
    pub fn error_surface(&self, quantity: ErrorQuantity) -> Vec<Vec<Option<f64>>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.map(|c| c.errors.get(quantity)))
                    .collect()
            })
            .collect()
    }

    pub fn fitted_count(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }
}

/// Run one fit per grid point.
///
/// Under `FailurePolicy::Fail`, the first failing point (in deterministic
/// row-major order) aborts the sweep with its error. Under `Skip`, failed
/// points become `None` cells and are recorded in `failures`.
pub fn run_sweep(
    source: &dyn FluxSource,
    grid: &SweepGrid,
    conditions: Conditions,
    p_up_pa: f64,
    reference: &(dyn PropertyReference + Sync),
    opts: &FitOptions,
    policy: FailurePolicy,
) -> Result<SweepResult, AppError> {
    if grid.thicknesses_m.is_empty() || grid.diameters_m.is_empty() {
        return Err(AppError::invalid_input("Sweep grid has an empty axis."));
    }

    let points: Vec<(usize, usize)> = (0..grid.diameters_m.len())
        .flat_map(|di| (0..grid.thicknesses_m.len()).map(move |ti| (di, ti)))
        .collect();

    let outcomes: Vec<((usize, usize), Result<SweepCell, AppError>)> = points
        .par_iter()
        .map(|&(di, ti)| {
            let thickness_m = grid.thicknesses_m[ti];
            let diameter_m = grid.diameters_m[di];
            let outcome = fit_point(
                source,
                thickness_m,
                diameter_m,
                conditions,
                p_up_pa,
                reference,
                opts,
            );
            ((di, ti), outcome)
        })
        .collect();

    let mut cells =
        vec![vec![None; grid.thicknesses_m.len()]; grid.diameters_m.len()];
    let mut failures = Vec::new();

    // Outcomes are scanned in row-major order, so `Fail` surfaces the same
    // error regardless of scheduling.
    for ((di, ti), outcome) in outcomes {
        match outcome {
            Ok(cell) => cells[di][ti] = Some(cell),
            Err(e) => match policy {
                FailurePolicy::Fail => return Err(e),
                FailurePolicy::Skip => failures.push(SweepFailure {
                    thickness_m: grid.thicknesses_m[ti],
                    diameter_m: grid.diameters_m[di],
                    message: e.to_string(),
                }),
            },
        }
    }

    Ok(SweepResult {
        grid: grid.clone(),
        cells,
        failures,
    })
}

fn fit_point(
    source: &dyn FluxSource,
    thickness_m: f64,
    diameter_m: f64,
    conditions: Conditions,
    p_up_pa: f64,
    reference: &dyn PropertyReference,
    opts: &FitOptions,
) -> Result<SweepCell, AppError> {
    let series = source.flux_series(thickness_m, diameter_m)?;
    let geometry = Geometry {
        thickness_m,
        p_up_pa,
    };
    let (fit, errors) = fit_against_reference(&series, geometry, conditions, reference, opts)?;
    Ok(SweepCell { fit, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{ArrheniusProperty, ArrheniusReference};
    use crate::models::downstream_flux;

    /// Generates each point's series from the reference model itself, except
    /// for one poisoned cell.
    struct SyntheticSource {
        reference: ArrheniusReference,
        temperature_k: f64,
        p_up_pa: f64,
        poison: Option<(f64, f64)>,
    }

    impl FluxSource for SyntheticSource {
        fn flux_series(&self, thickness_m: f64, diameter_m: f64) -> Result<FluxSeries, AppError> {
            if let Some((tl, td)) = self.poison {
                if (thickness_m - tl).abs() < 1e-12 && (diameter_m - td).abs() < 1e-12 {
                    // Degenerate output for this cell.
                    let times: Vec<f64> = (0..10).map(|i| i as f64 * 100.0).collect();
                    return FluxSeries::from_pairs(&times, &vec![0.0; 10]);
                }
            }
            let d = self.reference.diffusivity.value(self.temperature_k);
            let s = self.reference.solubility.value(self.temperature_k);
            let times: Vec<f64> = (0..=60).map(|i| i as f64 * 1000.0).collect();
            let flux: Vec<f64> = times
                .iter()
                .map(|&t| downstream_flux(t, self.p_up_pa, thickness_m, d * s, d))
                .collect();
            FluxSeries::from_pairs(&times, &flux)
        }
    }

    fn reference() -> ArrheniusReference {
        ArrheniusReference {
            name: "test salt",
            diffusivity: ArrheniusProperty {
                pre_exp: 9.3e-7,
                act_energy_j_mol: 42_000.0,
            },
            solubility: ArrheniusProperty {
                pre_exp: 7.9e-2,
                act_energy_j_mol: 35_000.0,
            },
        }
    }

    #[test]
    fn sweep_collects_near_zero_errors_for_exact_model_data() {
        let reference = reference();
        let source = SyntheticSource {
            reference,
            temperature_k: 800.0,
            p_up_pa: 1000.0,
            poison: None,
        };
        let grid = SweepGrid::linspace((2e-3, 6e-3), 3, (20e-3, 40e-3), 2).unwrap();
        let result = run_sweep(
            &source,
            &grid,
            Conditions { temperature_k: 800.0 },
            1000.0,
            &reference,
            &FitOptions::default(),
            FailurePolicy::Fail,
        )
        .unwrap();

        assert_eq!(result.fitted_count(), grid.cell_count());
        assert!(result.failures.is_empty());
        for row in result.error_surface(ErrorQuantity::Permeability) {
            for v in row {
                assert!(v.unwrap().abs() < 0.1);
            }
        }
    }

    #[test]
    fn skip_policy_records_failure_and_keeps_other_cells() {
        let reference = reference();
        let poison = (2e-3, 20e-3);
        let source = SyntheticSource {
            reference,
            temperature_k: 800.0,
            p_up_pa: 1000.0,
            poison: Some(poison),
        };
        let grid = SweepGrid::linspace((2e-3, 6e-3), 3, (20e-3, 40e-3), 2).unwrap();
        let result = run_sweep(
            &source,
            &grid,
            Conditions { temperature_k: 800.0 },
            1000.0,
            &reference,
            &FitOptions::default(),
            FailurePolicy::Skip,
        )
        .unwrap();

        assert_eq!(result.fitted_count(), grid.cell_count() - 1);
        assert_eq!(result.failures.len(), 1);
        assert!((result.failures[0].thickness_m - poison.0).abs() < 1e-12);
        assert!(result.cells[0][0].is_none());
        assert!(result.cells[1][2].is_some());
    }

    #[test]
    fn fail_policy_surfaces_the_error() {
        let reference = reference();
        let source = SyntheticSource {
            reference,
            temperature_k: 800.0,
            p_up_pa: 1000.0,
            poison: Some((2e-3, 20e-3)),
        };
        let grid = SweepGrid::linspace((2e-3, 6e-3), 3, (20e-3, 40e-3), 2).unwrap();
        let err = run_sweep(
            &source,
            &grid,
            Conditions { temperature_k: 800.0 },
            1000.0,
            &reference,
            &FitOptions::default(),
            FailurePolicy::Fail,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
