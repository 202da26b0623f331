//! Flux comparison charts.
//!
//! Two variants:
//! - observed samples overlaid with the fitted model curve and, optionally,
//!   the curve at the reference properties (single-fit diagnostics)
//! - two observed series overlaid (1D vs 2D simulation comparison)
//!
//! Output format follows the file extension: `.svg` renders vector output,
//! anything else goes through the bitmap backend.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{FluxSeries, Geometry};
use crate::error::AppError;
use crate::models::downstream_flux;
use crate::plot::PlotConfig;

/// Points on the fitted/reference model curves per chart.
const CURVE_SAMPLES: usize = 400;

/// A (permeability, diffusivity) pair to draw as a model curve.
#[derive(Debug, Clone, Copy)]
pub struct CurveSpec {
    pub label: &'static str,
    pub permeability: f64,
    pub diffusivity: f64,
}

/// Plot observed flux magnitudes with one or two model curves.
pub fn plot_fit_comparison(
    path: &Path,
    observed: &FluxSeries,
    geometry: Geometry,
    fitted: CurveSpec,
    reference: Option<CurveSpec>,
    config: &PlotConfig,
) -> Result<(), AppError> {
    if observed.is_empty() {
        return Err(AppError::invalid_input("Nothing to plot: empty flux series."));
    }

    let path_str = path.to_string_lossy().to_string();
    let result = if path_str.ends_with(".svg") {
        let root = SVGBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_comparison(&root, observed, geometry, fitted, reference, config)
    } else {
        let root = BitMapBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_comparison(&root, observed, geometry, fitted, reference, config)
    };
    result.map_err(|e| AppError::io(format!("Failed to render '{}': {e}", path.display())))
}

/// Overlay two observed series (e.g. the 1D and 2D simulation outputs).
pub fn plot_flux_overlay(
    path: &Path,
    series: &[(&str, &FluxSeries)],
    config: &PlotConfig,
) -> Result<(), AppError> {
    if series.is_empty() || series.iter().any(|(_, s)| s.is_empty()) {
        return Err(AppError::invalid_input("Nothing to plot: empty flux series."));
    }

    let path_str = path.to_string_lossy().to_string();
    let result = if path_str.ends_with(".svg") {
        let root = SVGBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_overlay(&root, series, config)
    } else {
        let root = BitMapBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_overlay(&root, series, config)
    };
    result.map_err(|e| AppError::io(format!("Failed to render '{}': {e}", path.display())))
}

fn draw_comparison<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    observed: &FluxSeries,
    geometry: Geometry,
    fitted: CurveSpec,
    reference: Option<CurveSpec>,
    config: &PlotConfig,
) -> Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let times = observed.times();
    let flux = observed.abs_flux();
    let t_max = times.last().copied().unwrap_or(1.0).max(1e-9);

    let mut y_max = observed.max_abs_flux();
    for spec in std::iter::once(&fitted).chain(reference.iter()) {
        let j_end = downstream_flux(
            t_max,
            geometry.p_up_pa,
            geometry.thickness_m,
            spec.permeability,
            spec.diffusivity,
        );
        y_max = y_max.max(j_end);
    }
    let y_max = (y_max * 1.1).max(f64::MIN_POSITIVE);

    root.fill(&config.background)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&config.title, ("sans-serif", 30.0).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc(&config.xlabel)
        .y_desc(&config.ylabel)
        .draw()?;

    chart
        .draw_series(
            times
                .iter()
                .zip(flux.iter())
                .map(|(&t, &j)| Circle::new((t, j), 3, BLUE.mix(0.4).filled())),
        )?
        .label("observed")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.mix(0.4).filled()));

    for (spec, color) in std::iter::once((fitted, RED)).chain(reference.map(|r| (r, BLACK))) {
        let curve: Vec<(f64, f64)> = (0..=CURVE_SAMPLES)
            .map(|i| {
                let t = t_max * i as f64 / CURVE_SAMPLES as f64;
                let j = downstream_flux(
                    t,
                    geometry.p_up_pa,
                    geometry.thickness_m,
                    spec.permeability,
                    spec.diffusivity,
                );
                (t, j)
            })
            .collect();
        chart
            .draw_series(LineSeries::new(curve, color.stroke_width(config.line_width)))?
            .label(spec.label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_overlay<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &[(&str, &FluxSeries)],
    config: &PlotConfig,
) -> Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let palette = [RED, BLUE, GREEN, MAGENTA, CYAN, BLACK];

    let t_max = series
        .iter()
        .filter_map(|(_, s)| s.times().last().copied())
        .fold(f64::MIN_POSITIVE, f64::max);
    let y_max = series
        .iter()
        .map(|(_, s)| s.max_abs_flux())
        .fold(f64::MIN_POSITIVE, f64::max)
        * 1.1;

    root.fill(&config.background)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&config.title, ("sans-serif", 30.0).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc(&config.xlabel)
        .y_desc(&config.ylabel)
        .draw()?;

    for (i, (label, s)) in series.iter().enumerate() {
        let color = palette[i % palette.len()];
        let points: Vec<(f64, f64)> = s
            .samples()
            .iter()
            .map(|p| (p.time_s, p.flux.abs()))
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(config.line_width)))?
            .label(*label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> FluxSeries {
        let times: Vec<f64> = (0..=40).map(|i| i as f64 * 250.0).collect();
        let flux: Vec<f64> = times
            .iter()
            .map(|&t| downstream_flux(t, 1000.0, 0.005, 1e-10, 5e-9))
            .collect();
        FluxSeries::from_pairs(&times, &flux).unwrap()
    }

    #[test]
    fn renders_comparison_png_and_svg() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = Geometry {
            thickness_m: 0.005,
            p_up_pa: 1000.0,
        };
        let fitted = CurveSpec {
            label: "fit",
            permeability: 1e-10,
            diffusivity: 5e-9,
        };
        let reference = CurveSpec {
            label: "reference",
            permeability: 1.2e-10,
            diffusivity: 4e-9,
        };

        for name in ["cmp.png", "cmp.svg"] {
            let path = dir.path().join(name);
            plot_fit_comparison(
                &path,
                &series(),
                geometry,
                fitted,
                Some(reference),
                &PlotConfig::default(),
            )
            .unwrap();
            assert!(path.exists());
        }
    }

    #[test]
    fn renders_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let a = series();
        let b = series();
        plot_flux_overlay(&path, &[("1D", &a), ("2D", &b)], &PlotConfig::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn empty_series_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmp.png");
        let empty = FluxSeries::from_pairs(&[], &[]).unwrap();
        let fitted = CurveSpec {
            label: "fit",
            permeability: 1e-10,
            diffusivity: 5e-9,
        };
        let err = plot_fit_comparison(
            &path,
            &empty,
            Geometry {
                thickness_m: 0.005,
                p_up_pa: 1000.0,
            },
            fitted,
            None,
            &PlotConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
