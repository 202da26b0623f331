//! Shared "fit pipeline" logic used by the `fit` command (and tests).
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> validation -> fit -> property errors
//!
//! The CLI layer can then focus on presentation (printing, plotting, export).

use std::path::Path;

use crate::domain::{Conditions, Geometry, PermeationFit, PropertyErrors};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_against_reference};
use crate::io::{IngestConfig, IngestedSeries, load_flux_csv};
use crate::material::PropertyReference;

/// All computed outputs of a single `permfit fit` run.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub ingested: IngestedSeries,
    pub fit: PermeationFit,
    pub errors: PropertyErrors,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(
    csv: &Path,
    ingest: &IngestConfig,
    geometry: Geometry,
    conditions: Conditions,
    reference: &dyn PropertyReference,
    options: &FitOptions,
) -> Result<FitOutput, AppError> {
    let ingested = load_flux_csv(csv, ingest)?;
    let (fit, errors) =
        fit_against_reference(&ingested.series, geometry, conditions, reference, options)?;
    Ok(FitOutput {
        ingested,
        fit,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthSpec, generate_flux_series};
    use crate::io::write_flux_csv;
    use crate::material::PropertyReference;

    struct FixedReference {
        d: f64,
        s: f64,
    }

    impl PropertyReference for FixedReference {
        fn diffusivity(&self, _temperature_k: f64) -> f64 {
            self.d
        }
        fn solubility(&self, _temperature_k: f64) -> f64 {
            self.s
        }
    }

    #[test]
    fn pipeline_round_trips_a_synthetic_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("dq.csv");

        let geometry = Geometry {
            thickness_m: 0.005,
            p_up_pa: 1000.0,
        };
        let series = generate_flux_series(&SynthSpec {
            geometry,
            permeability: 1e-10,
            diffusivity: 5e-9,
            t_end_s: 10_000.0,
            steps: 101,
            noise_rel: 0.0,
            seed: 7,
        })
        .unwrap();
        write_flux_csv(&csv, &series, "ts", "solute_flux_surface_3").unwrap();

        let reference = FixedReference { d: 5e-9, s: 0.02 };
        let output = run_fit(
            &csv,
            &IngestConfig::default(),
            geometry,
            Conditions { temperature_k: 800.0 },
            &reference,
            &FitOptions::default(),
        )
        .unwrap();

        assert_eq!(output.ingested.rows_used, 101);
        assert!((output.fit.permeability / 1e-10 - 1.0).abs() < 0.01);
        assert!((output.fit.diffusivity / 5e-9 - 1.0).abs() < 0.01);
        assert!(output.errors.permeability_pct.abs() < 0.1);
    }
}
