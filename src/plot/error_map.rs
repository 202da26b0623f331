//! Sweep error maps.
//!
//! Renders one property-error surface over the (thickness, diameter) grid as
//! a colored cell map: a symmetric diverging scale centered on zero error
//! (blue = fit overestimates the reference, red = underestimates), with
//! skipped cells drawn gray. This is the contour-style view of the sweep.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::ErrorQuantity;
use crate::error::AppError;
use crate::plot::PlotConfig;
use crate::sweep::SweepResult;

const MISSING_CELL: RGBColor = RGBColor(160, 160, 160);

/// Render the error surface for one quantity.
pub fn plot_error_map(
    path: &Path,
    result: &SweepResult,
    quantity: ErrorQuantity,
    config: &PlotConfig,
) -> Result<(), AppError> {
    if result.grid.thicknesses_m.is_empty() || result.grid.diameters_m.is_empty() {
        return Err(AppError::invalid_input("Nothing to plot: empty sweep grid."));
    }

    let path_str = path.to_string_lossy().to_string();
    let render = if path_str.ends_with(".svg") {
        let root = SVGBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_map(&root, result, quantity, config)
    } else {
        let root = BitMapBackend::new(&path_str, (config.width, config.height)).into_drawing_area();
        draw_map(&root, result, quantity, config)
    };
    render.map_err(|e| AppError::io(format!("Failed to render '{}': {e}", path.display())))
}

fn draw_map<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    result: &SweepResult,
    quantity: ErrorQuantity,
    config: &PlotConfig,
) -> Result<(), Box<dyn Error>>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let surface = result.error_surface(quantity);
    let x_mm: Vec<f64> = result.grid.thicknesses_m.iter().map(|v| v * 1000.0).collect();
    let y_mm: Vec<f64> = result.grid.diameters_m.iter().map(|v| v * 1000.0).collect();

    let v_max = surface
        .iter()
        .flatten()
        .flatten()
        .fold(0.0_f64, |acc, &v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);

    let x_edges = cell_edges(&x_mm);
    let y_edges = cell_edges(&y_mm);

    root.fill(&config.background)?;

    let caption = if config.title.is_empty() {
        format!("{} error (%), scale ±{v_max:.2}", quantity.display_name())
    } else {
        config.title.clone()
    };

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 30.0).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            x_edges[0]..x_edges[x_edges.len() - 1],
            y_edges[0]..y_edges[y_edges.len() - 1],
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Thickness (mm)")
        .y_desc("Diameter (mm)")
        .draw()?;

    let cells = surface.iter().enumerate().flat_map(|(di, row)| {
        let x_edges = &x_edges;
        let y_edges = &y_edges;
        row.iter().enumerate().map(move |(ti, value)| {
            let color = match value {
                Some(v) => diverging_color(v / v_max),
                None => MISSING_CELL,
            };
            Rectangle::new(
                [
                    (x_edges[ti], y_edges[di]),
                    (x_edges[ti + 1], y_edges[di + 1]),
                ],
                color.filled(),
            )
        })
    });
    chart.draw_series(cells)?;

    root.present()?;
    Ok(())
}

/// Cell boundaries: midpoints between axis values, extended half a step at
/// both ends. A single-value axis gets a unit-wide cell.
fn cell_edges(values: &[f64]) -> Vec<f64> {
    if values.len() == 1 {
        return vec![values[0] - 0.5, values[0] + 0.5];
    }
    let mut edges = Vec::with_capacity(values.len() + 1);
    edges.push(values[0] - (values[1] - values[0]) / 2.0);
    for w in values.windows(2) {
        edges.push((w[0] + w[1]) / 2.0);
    }
    let n = values.len();
    edges.push(values[n - 1] + (values[n - 1] - values[n - 2]) / 2.0);
    edges
}

/// Diverging blue→white→red map for `t ∈ [−1, 1]`.
fn diverging_color(t: f64) -> RGBColor {
    let t = t.clamp(-1.0, 1.0);
    let blend = |a: u8, b: u8, f: f64| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    let (low, high): ((u8, u8, u8), (u8, u8, u8)) = if t < 0.0 {
        ((255, 255, 255), (33, 102, 172))
    } else {
        ((255, 255, 255), (178, 24, 43))
    };
    let f = t.abs();
    RGBColor(
        blend(low.0, high.0, f),
        blend(low.1, high.1, f),
        blend(low.2, high.2, f),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PermeationFit, PropertyErrors};
    use crate::sweep::{SweepCell, SweepGrid};

    fn sample_result() -> SweepResult {
        let grid = SweepGrid {
            thicknesses_m: vec![0.002, 0.004, 0.006],
            diameters_m: vec![0.02, 0.04],
        };
        let cell = |p: f64| {
            Some(SweepCell {
                fit: PermeationFit {
                    permeability: 1e-10,
                    diffusivity: 5e-9,
                    sse: 0.0,
                    rmse: 0.0,
                    iterations: 1,
                },
                errors: PropertyErrors {
                    diffusivity_pct: p,
                    solubility_pct: -p,
                    permeability_pct: p / 2.0,
                },
            })
        };
        SweepResult {
            grid,
            cells: vec![
                vec![cell(1.0), cell(-2.0), None],
                vec![cell(3.0), cell(0.0), cell(-1.0)],
            ],
            failures: vec![],
        }
    }

    #[test]
    fn renders_map_with_missing_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        plot_error_map(
            &path,
            &sample_result(),
            ErrorQuantity::Diffusivity,
            &PlotConfig::default(),
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn cell_edges_are_midpoints_with_extended_ends() {
        let edges = cell_edges(&[2.0, 3.0, 5.0]);
        assert_eq!(edges, vec![1.5, 2.5, 4.0, 6.0]);
    }

    #[test]
    fn diverging_color_is_white_at_zero_and_saturated_at_ends() {
        assert_eq!(diverging_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(diverging_color(1.0), RGBColor(178, 24, 43));
        assert_eq!(diverging_color(-1.0), RGBColor(33, 102, 172));
    }
}
