//! Command-line parsing for the permeation comparison toolkit.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{FailurePolicy, SimDimension};
use crate::fit::FitOptions;
use crate::io::{DEFAULT_FLUX_COLUMN, DEFAULT_TIME_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "permfit", version, about = "Permeation transient fitter and FEM comparison toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the analytical model to one flux CSV and report property errors.
    Fit(FitArgs),
    /// Overlay two flux CSVs (e.g. 1D vs 2D simulation outputs).
    Compare(CompareArgs),
    /// Fit every point of a (thickness x diameter) simulation grid.
    Sweep(SweepArgs),
    /// Generate a synthetic flux CSV from the analytical model.
    Synth(SynthArgs),
}

/// Options shared by every command that reads simulation CSVs.
#[derive(Debug, Parser, Clone)]
pub struct ColumnArgs {
    /// Time column name.
    #[arg(long, default_value = DEFAULT_TIME_COLUMN)]
    pub time_column: String,

    /// Flux column name.
    #[arg(long, default_value = DEFAULT_FLUX_COLUMN)]
    pub flux_column: String,
}

/// Options that tune the fit search and refinement.
#[derive(Debug, Parser, Clone)]
pub struct TuningArgs {
    /// Decades searched either side of the seed diffusivity.
    #[arg(long, default_value_t = 2.0)]
    pub grid_decades: f64,

    /// Number of diffusivity candidates in the grid search.
    #[arg(long, default_value_t = 61)]
    pub grid_steps: usize,

    /// Refinement iteration budget.
    #[arg(long, default_value_t = 60)]
    pub max_iterations: usize,
}

impl TuningArgs {
    pub fn to_options(&self) -> FitOptions {
        FitOptions {
            grid_decades: self.grid_decades,
            grid_steps: self.grid_steps,
            max_iterations: self.max_iterations,
            ..FitOptions::default()
        }
    }
}

/// Fit one observed transient.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Simulation CSV with time and surface-flux columns.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Salt layer thickness [mm].
    #[arg(long)]
    pub thickness_mm: f64,

    /// Permeating surface diameter [mm]. When set, the raw surface-integrated
    /// flux is normalized by the disc area to a per-area flux.
    #[arg(long)]
    pub diameter_mm: Option<f64>,

    /// Experiment temperature [K].
    #[arg(long)]
    pub temperature_k: f64,

    /// Upstream pressure [Pa].
    #[arg(long, default_value_t = 1000.0)]
    pub pressure_pa: f64,

    #[command(flatten)]
    pub columns: ColumnArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Render a comparison chart (PNG or SVG by extension).
    #[arg(long, value_name = "IMAGE")]
    pub plot: Option<PathBuf>,

    /// Export the fit report to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

/// Overlay two observed transients.
#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    /// 1D simulation CSV.
    #[arg(long, value_name = "CSV")]
    pub csv_1d: PathBuf,

    /// 2D simulation CSV.
    #[arg(long, value_name = "CSV")]
    pub csv_2d: PathBuf,

    /// Permeating surface diameter [mm] (per-area normalization for both files).
    #[arg(long)]
    pub diameter_mm: Option<f64>,

    #[command(flatten)]
    pub columns: ColumnArgs,

    /// Output chart path (PNG or SVG by extension).
    #[arg(long, value_name = "IMAGE", default_value = "comparison.png")]
    pub plot: PathBuf,
}

/// Sweep a simulation output grid.
#[derive(Debug, Parser, Clone)]
pub struct SweepArgs {
    /// Root directory holding `<L>mm_thick_<d>mm_wide/<1d|2d>/derived_quantities.csv`.
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Which simulation variant to read.
    #[arg(long, value_enum, default_value_t = SimDimension::TwoD)]
    pub dimension: SimDimension,

    /// Thickness axis [mm], inclusive.
    #[arg(long, default_value_t = 2.0)]
    pub thickness_min_mm: f64,
    #[arg(long, default_value_t = 15.0)]
    pub thickness_max_mm: f64,
    #[arg(long, default_value_t = 14)]
    pub thickness_steps: usize,

    /// Diameter axis [mm], inclusive.
    #[arg(long, default_value_t = 20.0)]
    pub diameter_min_mm: f64,
    #[arg(long, default_value_t = 100.0)]
    pub diameter_max_mm: f64,
    #[arg(long, default_value_t = 9)]
    pub diameter_steps: usize,

    /// Experiment temperature [K].
    #[arg(long)]
    pub temperature_k: f64,

    /// Upstream pressure [Pa].
    #[arg(long, default_value_t = 1000.0)]
    pub pressure_pa: f64,

    /// What to do when one grid point fails to fit.
    #[arg(long, value_enum, default_value_t = FailurePolicy::Fail)]
    pub on_failure: FailurePolicy,

    #[command(flatten)]
    pub columns: ColumnArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,

    /// Export the error grid to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Directory for per-quantity error-map images.
    #[arg(long, value_name = "DIR")]
    pub plot_dir: Option<PathBuf>,
}

/// Generate a synthetic transient.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Salt layer thickness [mm].
    #[arg(long)]
    pub thickness_mm: f64,

    /// Upstream pressure [Pa].
    #[arg(long, default_value_t = 1000.0)]
    pub pressure_pa: f64,

    /// True permeability used to evaluate the model.
    #[arg(long)]
    pub permeability: f64,

    /// True diffusivity used to evaluate the model.
    #[arg(long)]
    pub diffusivity: f64,

    /// Observation window end [s].
    #[arg(long, default_value_t = 10_000.0)]
    pub t_end_s: f64,

    /// Number of samples (from 0 to the window end, inclusive).
    #[arg(long, default_value_t = 101)]
    pub steps: usize,

    /// Gaussian noise sigma relative to the steady-state flux (0 disables).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Noise RNG seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fit_invocation() {
        let cli = Cli::try_parse_from([
            "permfit",
            "fit",
            "--csv",
            "dq.csv",
            "--thickness-mm",
            "5",
            "--temperature-k",
            "800",
        ])
        .unwrap();
        match cli.command {
            Command::Fit(args) => {
                assert_eq!(args.thickness_mm, 5.0);
                assert_eq!(args.pressure_pa, 1000.0);
                assert_eq!(args.columns.flux_column, DEFAULT_FLUX_COLUMN);
            }
            _ => panic!("expected fit subcommand"),
        }
    }

    #[test]
    fn parses_sweep_policy_and_dimension() {
        let cli = Cli::try_parse_from([
            "permfit",
            "sweep",
            "--root",
            "runs",
            "--temperature-k",
            "800",
            "--on-failure",
            "skip",
            "--dimension",
            "1d",
        ])
        .unwrap();
        match cli.command {
            Command::Sweep(args) => {
                assert_eq!(args.on_failure, FailurePolicy::Skip);
                assert_eq!(args.dimension, SimDimension::OneD);
                assert_eq!(args.thickness_steps, 14);
            }
            _ => panic!("expected sweep subcommand"),
        }
    }
}
