//! Command dispatch: translate parsed CLI arguments into pipeline/sweep runs
//! and present the results.

pub mod pipeline;

use clap::Parser;

use crate::cli::{Cli, ColumnArgs, Command, CompareArgs, FitArgs, SweepArgs, SynthArgs};
use crate::data::{SynthSpec, generate_flux_series};
use crate::domain::{Conditions, ErrorQuantity, Geometry};
use crate::error::AppError;
use crate::io::{
    CsvFluxSource, FitReportFile, IngestConfig, load_flux_csv, permeating_area_m2, write_fit_json,
    write_flux_csv, write_sweep_csv,
};
use crate::material::{FLIBE_CALDERONI, PropertyReference};
use crate::plot::{CurveSpec, PlotConfig, plot_error_map, plot_fit_comparison, plot_flux_overlay};
use crate::report::{format_fit_summary, format_sweep_summary};
use crate::sweep::{SweepGrid, run_sweep};

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => cmd_fit(&args),
        Command::Compare(args) => cmd_compare(&args),
        Command::Sweep(args) => cmd_sweep(&args),
        Command::Synth(args) => cmd_synth(&args),
    }
}

fn ingest_config(columns: &ColumnArgs, diameter_mm: Option<f64>) -> IngestConfig {
    IngestConfig {
        time_column: columns.time_column.clone(),
        flux_column: columns.flux_column.clone(),
        area_m2: diameter_mm.map(|d| permeating_area_m2(d / 1000.0)),
    }
}

fn cmd_fit(args: &FitArgs) -> Result<(), AppError> {
    let geometry = Geometry {
        thickness_m: args.thickness_mm / 1000.0,
        p_up_pa: args.pressure_pa,
    };
    let conditions = Conditions {
        temperature_k: args.temperature_k,
    };
    let reference = FLIBE_CALDERONI;

    let output = pipeline::run_fit(
        &args.csv,
        &ingest_config(&args.columns, args.diameter_mm),
        geometry,
        conditions,
        &reference,
        &args.tuning.to_options(),
    )?;

    for e in &output.ingested.row_errors {
        eprintln!("warning: {} line {}: {}", args.csv.display(), e.line, e.message);
    }
    print!(
        "{}",
        format_fit_summary(
            geometry,
            conditions,
            output.ingested.series.len(),
            &output.fit,
            &output.errors,
            &reference,
            reference.name,
        )
    );

    if let Some(path) = &args.plot {
        let fitted = CurveSpec {
            label: "fit",
            permeability: output.fit.permeability,
            diffusivity: output.fit.diffusivity,
        };
        let t = conditions.temperature_k;
        let reference_curve = CurveSpec {
            label: "reference",
            permeability: reference.permeability(t),
            diffusivity: reference.diffusivity(t),
        };
        let mut config = PlotConfig::default();
        config.title = format!(
            "Permeation transient, L = {:.2} mm, T = {:.0} K",
            args.thickness_mm, args.temperature_k
        );
        plot_fit_comparison(
            path,
            &output.ingested.series,
            geometry,
            fitted,
            Some(reference_curve),
            &config,
        )?;
        println!("\nWrote comparison chart to {}", path.display());
    }

    if let Some(path) = &args.export {
        let report =
            FitReportFile::new(geometry, conditions, reference.name, output.fit, output.errors);
        write_fit_json(path, &report)?;
        println!("Wrote fit report to {}", path.display());
    }

    Ok(())
}

fn cmd_compare(args: &CompareArgs) -> Result<(), AppError> {
    let config = ingest_config(&args.columns, args.diameter_mm);
    let one_d = load_flux_csv(&args.csv_1d, &config)?;
    let two_d = load_flux_csv(&args.csv_2d, &config)?;

    let mut plot_config = PlotConfig::default();
    plot_config.title = "1D vs 2D permeation flux".to_string();
    plot_flux_overlay(
        &args.plot,
        &[("1D", &one_d.series), ("2D", &two_d.series)],
        &plot_config,
    )?;

    println!("=== permfit - 1D vs 2D comparison ===");
    for (label, ingested) in [("1D", &one_d), ("2D", &two_d)] {
        println!(
            "{label}: n={} | final flux {:.4e}",
            ingested.series.len(),
            ingested.series.final_abs_flux().unwrap_or(0.0),
        );
    }
    if let (Some(a), Some(b)) = (one_d.series.final_abs_flux(), two_d.series.final_abs_flux()) {
        if a > 0.0 {
            println!(
                "Final flux difference: {:+.3}% (2D relative to 1D)",
                (b - a) / a * 100.0
            );
        }
    }
    println!("Wrote overlay chart to {}", args.plot.display());

    Ok(())
}

fn cmd_sweep(args: &SweepArgs) -> Result<(), AppError> {
    let grid = SweepGrid::linspace(
        (
            args.thickness_min_mm / 1000.0,
            args.thickness_max_mm / 1000.0,
        ),
        args.thickness_steps,
        (args.diameter_min_mm / 1000.0, args.diameter_max_mm / 1000.0),
        args.diameter_steps,
    )?;

    let mut source = CsvFluxSource::new(args.root.clone(), args.dimension);
    source.time_column = args.columns.time_column.clone();
    source.flux_column = args.columns.flux_column.clone();

    let reference = FLIBE_CALDERONI;
    let result = run_sweep(
        &source,
        &grid,
        Conditions {
            temperature_k: args.temperature_k,
        },
        args.pressure_pa,
        &reference,
        &args.tuning.to_options(),
        args.on_failure,
    )?;

    print!("{}", format_sweep_summary(&result));

    if let Some(path) = &args.export {
        write_sweep_csv(path, &result)?;
        println!("Wrote error grid to {}", path.display());
    }

    if let Some(dir) = &args.plot_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::io(format!(
                "Failed to create plot directory '{}': {e}",
                dir.display()
            ))
        })?;
        for quantity in ErrorQuantity::ALL {
            let path = dir.join(format!(
                "{}_error.png",
                quantity.display_name().to_ascii_lowercase()
            ));
            plot_error_map(&path, &result, quantity, &PlotConfig::default())?;
            println!("Wrote {} error map to {}", quantity.display_name(), path.display());
        }
    }

    Ok(())
}

fn cmd_synth(args: &SynthArgs) -> Result<(), AppError> {
    let spec = SynthSpec {
        geometry: Geometry {
            thickness_m: args.thickness_mm / 1000.0,
            p_up_pa: args.pressure_pa,
        },
        permeability: args.permeability,
        diffusivity: args.diffusivity,
        t_end_s: args.t_end_s,
        steps: args.steps,
        noise_rel: args.noise,
        seed: args.seed,
    };
    let series = generate_flux_series(&spec)?;
    write_flux_csv(
        &args.out,
        &series,
        &args.columns.time_column,
        &args.columns.flux_column,
    )?;
    println!(
        "Wrote {} synthetic samples to {}",
        series.len(),
        args.out.display()
    );
    Ok(())
}
