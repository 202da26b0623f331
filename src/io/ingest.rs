//! CSV ingest and normalization.
//!
//! This module turns a simulation `derived_quantities.csv` into a validated
//! [`FluxSeries`] safe to fit.
//!
//! Design goals:
//! - **Strict schema** for the required columns (clear errors, usage exit code)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden normalization)
//! - **Separation of concerns**: no fitting logic here
//!
//! The raw flux column is a surface-integrated rate (amount/s); dividing by
//! the relevant surface area yields the per-area flux the 1D model works in.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{FluxSample, FluxSeries, SimDimension};
use crate::error::AppError;
use crate::sweep::FluxSource;

/// Default column names written by the upstream simulation tool.
pub const DEFAULT_TIME_COLUMN: &str = "ts";
pub const DEFAULT_FLUX_COLUMN: &str = "solute_flux_surface_3";

/// How to read one simulation CSV.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub time_column: String,
    pub flux_column: String,
    /// Divide the raw surface-integrated flux by this area [m²] to obtain a
    /// per-area flux. `None` leaves values as stored.
    pub area_m2: Option<f64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            flux_column: DEFAULT_FLUX_COLUMN.to_string(),
            area_m2: None,
        }
    }
}

/// Area of the permeating disc face, `π (d/2)²`.
pub fn permeating_area_m2(diameter_m: f64) -> f64 {
    PI * (diameter_m / 2.0) * (diameter_m / 2.0)
}

/// Area of the cylinder side wall, `π d L` (for lateral-surface readings).
pub fn lateral_area_m2(diameter_m: f64, thickness_m: f64) -> f64 {
    PI * diameter_m * thickness_m
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: validated series + row errors + counts.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: FluxSeries,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load one simulation CSV into a flux series.
pub fn load_flux_csv(path: &Path, config: &IngestConfig) -> Result<IngestedSeries, AppError> {
    if let Some(area) = config.area_m2 {
        if !(area.is_finite() && area > 0.0) {
            return Err(AppError::invalid_input(format!(
                "Normalization area must be > 0 (got {area} m²)."
            )));
        }
    }

    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid_input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let time_idx = *header_map.get(&normalize_header_name(&config.time_column)).ok_or_else(|| {
        AppError::invalid_input(format!(
            "Missing required column `{}` in '{}'.",
            config.time_column,
            path.display()
        ))
    })?;
    let flux_idx = *header_map.get(&normalize_header_name(&config.flux_column)).ok_or_else(|| {
        AppError::invalid_input(format!(
            "Missing required column `{}` in '{}'.",
            config.flux_column,
            path.display()
        ))
    })?;

    let scale = config.area_m2.map(|a| 1.0 / a).unwrap_or(1.0);

    let mut samples = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row, and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, time_idx, flux_idx) {
            Ok((time_s, raw_flux)) => samples.push(FluxSample {
                time_s,
                flux: raw_flux * scale,
            }),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = samples.len();
    if rows_used == 0 {
        return Err(AppError::invalid_input(format!(
            "No valid rows in '{}' ({} rows read, {} row errors).",
            path.display(),
            rows_read,
            row_errors.len()
        )));
    }

    let series = FluxSeries::new(samples)?;
    Ok(IngestedSeries {
        series,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn parse_row(
    record: &StringRecord,
    time_idx: usize,
    flux_idx: usize,
) -> Result<(f64, f64), String> {
    let time_s = parse_f64(record, time_idx, "time")?;
    let flux = parse_f64(record, flux_idx, "flux")?;
    Ok((time_s, flux))
}

fn parse_f64(record: &StringRecord, idx: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing {what} value."))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid {what} value '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite {what} value '{raw}'."))
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Reads sweep-point series from the simulation output directory layout:
///
/// ```text
/// <root>/<L·1000>mm_thick_<d·1000>mm_wide/<1d|2d>/derived_quantities.csv
/// ```
///
/// with millimetre values formatted to two decimals, e.g.
/// `5.00mm_thick_40.00mm_wide/2d/derived_quantities.csv`. The raw flux is
/// normalized by the permeating disc area of the point's diameter.
#[derive(Debug, Clone)]
pub struct CsvFluxSource {
    pub root: PathBuf,
    pub dimension: SimDimension,
    pub time_column: String,
    pub flux_column: String,
}

impl CsvFluxSource {
    pub fn new(root: PathBuf, dimension: SimDimension) -> Self {
        Self {
            root,
            dimension,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            flux_column: DEFAULT_FLUX_COLUMN.to_string(),
        }
    }

    pub fn point_path(&self, thickness_m: f64, diameter_m: f64) -> PathBuf {
        self.root
            .join(format!(
                "{:.2}mm_thick_{:.2}mm_wide",
                thickness_m * 1000.0,
                diameter_m * 1000.0
            ))
            .join(self.dimension.dir_name())
            .join("derived_quantities.csv")
    }
}

impl FluxSource for CsvFluxSource {
    fn flux_series(&self, thickness_m: f64, diameter_m: f64) -> Result<FluxSeries, AppError> {
        let config = IngestConfig {
            time_column: self.time_column.clone(),
            flux_column: self.flux_column.clone(),
            area_m2: Some(permeating_area_m2(diameter_m)),
        };
        let ingested = load_flux_csv(&self.point_path(thickness_m, diameter_m), &config)?;
        Ok(ingested.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_normalizes_flux() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "dq.csv",
            "ts,solute_flux_surface_3\n0.0,0.0\n100.0,-2.0\n200.0,-4.0\n",
        );

        let config = IngestConfig {
            area_m2: Some(2.0),
            ..IngestConfig::default()
        };
        let out = load_flux_csv(&path, &config).unwrap();
        assert_eq!(out.rows_used, 3);
        assert!(out.row_errors.is_empty());
        // Raw -4.0 over 2 m² → per-area -2.0; magnitude taken downstream.
        assert!((out.series.samples()[2].flux + 2.0).abs() < 1e-12);
    }

    #[test]
    fn strips_bom_and_accepts_header_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "dq.csv",
            "\u{feff}TS,Solute_Flux_Surface_3\n0.0,1.0\n10.0,2.0\n",
        );
        let out = load_flux_csv(&path, &IngestConfig::default()).unwrap();
        assert_eq!(out.series.len(), 2);
    }

    #[test]
    fn bad_rows_are_collected_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "dq.csv",
            "ts,solute_flux_surface_3\n0.0,1.0\nnot-a-number,2.0\n20.0,\n30.0,4.0\n",
        );
        let out = load_flux_csv(&path, &IngestConfig::default()).unwrap();
        assert_eq!(out.rows_read, 4);
        assert_eq!(out.rows_used, 2);
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 3);
        assert_eq!(out.row_errors[1].line, 4);
    }

    #[test]
    fn missing_column_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "dq.csv", "ts,other\n0.0,1.0\n");
        let err = load_flux_csv(&path, &IngestConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn source_resolves_reference_layout_path() {
        let source = CsvFluxSource::new(PathBuf::from("/data"), SimDimension::TwoD);
        let path = source.point_path(0.005, 0.04);
        assert_eq!(
            path,
            PathBuf::from("/data/5.00mm_thick_40.00mm_wide/2d/derived_quantities.csv")
        );
    }

    #[test]
    fn areas_match_cylinder_geometry() {
        let d = 0.04;
        let l = 0.005;
        assert!((permeating_area_m2(d) - PI * 0.02 * 0.02).abs() < 1e-15);
        assert!((lateral_area_m2(d, l) - PI * 0.04 * 0.005).abs() < 1e-15);
    }
}
