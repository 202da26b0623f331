//! Export fit and sweep results.
//!
//! - per-point sweep errors to CSV (easy to consume in spreadsheets or
//!   downstream scripts)
//! - a single fit report to JSON (re-loadable for later plotting or
//!   comparisons)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Conditions, Geometry, PermeationFit, PropertyErrors};
use crate::error::AppError;
use crate::sweep::SweepResult;

/// A saved fit report (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub geometry: Geometry,
    pub conditions: Conditions,
    pub reference: String,
    pub fit: PermeationFit,
    /// Derived, recorded for convenience; always `fit.permeability / fit.diffusivity`.
    pub solubility: f64,
    pub errors: PropertyErrors,
}

impl FitReportFile {
    pub fn new(
        geometry: Geometry,
        conditions: Conditions,
        reference: impl Into<String>,
        fit: PermeationFit,
        errors: PropertyErrors,
    ) -> Self {
        Self {
            tool: concat!("permfit v", env!("CARGO_PKG_VERSION")).to_string(),
            geometry,
            conditions,
            reference: reference.into(),
            fit,
            solubility: fit.solubility(),
            errors,
        }
    }
}

/// Write a fit report to JSON.
pub fn write_fit_json(path: &Path, report: &FitReportFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create report '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::io(format!("Failed to write report '{}': {e}", path.display())))
}

/// Read a fit report back from JSON.
pub fn read_fit_json(path: &Path) -> Result<FitReportFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open report '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::io(format!("Failed to parse report '{}': {e}", path.display())))
}

/// Write a flux series using the simulation CSV schema, so generated series
/// round-trip through `io::ingest`.
pub fn write_flux_csv(
    path: &Path,
    series: &crate::domain::FluxSeries,
    time_column: &str,
    flux_column: &str,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create flux CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "{time_column},{flux_column}")
        .map_err(|e| AppError::io(format!("Failed to write flux CSV header: {e}")))?;
    for s in series.samples() {
        writeln!(file, "{},{:e}", s.time_s, s.flux)
            .map_err(|e| AppError::io(format!("Failed to write flux CSV row: {e}")))?;
    }
    Ok(())
}

/// Write the per-point sweep errors to CSV, one row per grid cell.
///
/// Skipped cells keep their axis values with empty error fields, so the grid
/// shape survives a round trip through spreadsheets.
pub fn write_sweep_csv(path: &Path, result: &SweepResult) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create sweep CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "thickness_mm,diameter_mm,diffusivity_error_pct,solubility_error_pct,permeability_error_pct"
    )
    .map_err(|e| AppError::io(format!("Failed to write sweep CSV header: {e}")))?;

    for (di, diameter_m) in result.grid.diameters_m.iter().enumerate() {
        for (ti, thickness_m) in result.grid.thicknesses_m.iter().enumerate() {
            let row = match &result.cells[di][ti] {
                Some(cell) => format!(
                    "{:.4},{:.4},{:.6},{:.6},{:.6}",
                    thickness_m * 1000.0,
                    diameter_m * 1000.0,
                    cell.errors.diffusivity_pct,
                    cell.errors.solubility_pct,
                    cell.errors.permeability_pct,
                ),
                None => format!(
                    "{:.4},{:.4},,,",
                    thickness_m * 1000.0,
                    diameter_m * 1000.0
                ),
            };
            writeln!(file, "{row}")
                .map_err(|e| AppError::io(format!("Failed to write sweep CSV row: {e}")))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{SweepCell, SweepGrid};

    fn sample_report() -> FitReportFile {
        FitReportFile::new(
            Geometry {
                thickness_m: 0.005,
                p_up_pa: 1000.0,
            },
            Conditions { temperature_k: 800.0 },
            "FLiBe (Calderoni 2008)",
            PermeationFit {
                permeability: 1e-10,
                diffusivity: 5e-9,
                sse: 1e-24,
                rmse: 1e-13,
                iterations: 7,
            },
            PropertyErrors {
                diffusivity_pct: 1.5,
                solubility_pct: -2.0,
                permeability_pct: -0.5,
            },
        )
    }

    #[test]
    fn fit_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        let report = sample_report();
        write_fit_json(&path, &report).unwrap();
        let loaded = read_fit_json(&path).unwrap();
        assert_eq!(loaded.fit, report.fit);
        assert_eq!(loaded.solubility, report.fit.solubility());
        assert_eq!(loaded.errors, report.errors);
    }

    #[test]
    fn flux_csv_round_trips_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synthetic.csv");

        let series =
            crate::domain::FluxSeries::from_pairs(&[0.0, 100.0, 200.0], &[0.0, 1.5e-7, 2.5e-7])
                .unwrap();
        write_flux_csv(&path, &series, "ts", "solute_flux_surface_3").unwrap();

        let loaded = crate::io::load_flux_csv(&path, &crate::io::IngestConfig::default()).unwrap();
        assert_eq!(loaded.series, series);
    }

    #[test]
    fn sweep_csv_includes_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.csv");

        let grid = SweepGrid {
            thicknesses_m: vec![0.002, 0.004],
            diameters_m: vec![0.02],
        };
        let cell = SweepCell {
            fit: sample_report().fit,
            errors: sample_report().errors,
        };
        let result = SweepResult {
            grid,
            cells: vec![vec![Some(cell), None]],
            failures: vec![],
        };

        write_sweep_csv(&path, &result).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2.0000,20.0000,"));
        assert_eq!(lines[2], "4.0000,20.0000,,,");
    }
}
