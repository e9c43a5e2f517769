//! Figure generation using plotters (SVG output)
//!
//! Static versions of the operator plots: time sweep (log y), frequency
//! sweep and flow curve (log-log), Cox-Merz overlay, and grouped box plots
//! for cohort comparisons. An empty data set still produces a figure with a
//! "No data" notice so the report layout does not change.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::analysis::cox_merz::CoxMerzResult;
use crate::analysis::export::{FlowStepData, FrequencySweepData, TimeSweepData};
use crate::cohort::selection::MeltedRow;
use crate::error::{Result, RheoError};

const SIZE: (u32, u32) = (800, 500);
const PALETTE: [RGBColor; 5] = [BLUE, RED, GREEN, MAGENTA, CYAN];

fn figure_error<E: std::fmt::Display>(e: E) -> RheoError {
    RheoError::Figure(e.to_string())
}

/// Positive, finite range padded by half a decade on each side
fn log_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo <= hi).then(|| (lo / 3.0, hi * 3.0))
}

fn linear_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    let pad = ((hi - lo) * 0.05).max(1e-9);
    Some((lo - pad, hi + pad))
}

fn no_data(root: &DrawingArea<SVGBackend, Shift>, message: &str) -> Result<()> {
    root.draw(&Text::new(
        message.to_string(),
        (SIZE.0 as i32 / 2 - 60, SIZE.1 as i32 / 2),
        ("sans-serif", 20).into_font().color(&BLACK),
    ))
    .map_err(figure_error)?;
    root.present().map_err(figure_error)
}

fn positive_points<'a>(x: &'a [f64], y: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.iter()
        .zip(y)
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| *a > 0.0 && *b > 0.0 && a.is_finite() && b.is_finite())
}

/// G', G'' over time, log y axis
pub fn time_sweep_figure(path: &Path, data: &TimeSweepData) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(figure_error)?;

    let x_range = linear_range(data.time_min.iter().copied());
    let y_range = log_range(data.storage.iter().chain(&data.loss).copied());
    let (Some((x0, x1)), Some((y0, y1))) = (x_range, y_range) else {
        return no_data(&root, "No time sweep data");
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Time Sweep", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, (y0..y1).log_scale())
        .map_err(figure_error)?;

    chart
        .configure_mesh()
        .x_desc("time (min)")
        .y_desc("G', G'' (Pa)")
        .draw()
        .map_err(figure_error)?;

    for (values, label, color) in [(&data.storage, "G'", BLUE), (&data.loss, "G''", RED)] {
        chart
            .draw_series(
                data.time_min
                    .iter()
                    .zip(values.iter())
                    .filter(|(_, v)| **v > 0.0)
                    .map(|(&t, &v)| Circle::new((t, v), 3, color.mix(0.7).filled())),
            )
            .map_err(figure_error)?
            .label(label)
            .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(figure_error)?;
    root.present().map_err(figure_error)
}

/// G', G'' and |η*| against angular frequency, log-log
pub fn frequency_sweep_figure(path: &Path, data: &FrequencySweepData) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(figure_error)?;

    let x_range = log_range(data.frequency.iter().copied());
    let y_range = log_range(
        data.storage.iter().chain(&data.loss).chain(&data.complex_viscosity).copied(),
    );
    let (Some((x0, x1)), Some((y0, y1))) = (x_range, y_range) else {
        return no_data(&root, "No frequency sweep data");
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Frequency Sweep", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
        .map_err(figure_error)?;

    chart
        .configure_mesh()
        .x_desc("ang. frequency (rad/s)")
        .y_desc("G', G'' (Pa), |η*| (Pa s)")
        .draw()
        .map_err(figure_error)?;

    let series = [
        (&data.storage, "G'", BLUE),
        (&data.loss, "G''", RED),
        (&data.complex_viscosity, "|η*|", GREEN),
    ];
    for (values, label, color) in series {
        chart
            .draw_series(
                positive_points(&data.frequency, values)
                    .map(|p| Circle::new(p, 3, color.mix(0.7).filled())),
            )
            .map_err(figure_error)?
            .label(label)
            .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(figure_error)?;
    root.present().map_err(figure_error)
}

/// Measured viscosity and the Cross model curve, log-log
pub fn flow_step_figure(path: &Path, data: &FlowStepData, curve: &[(f64, f64)]) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(figure_error)?;

    let x_range = log_range(data.shear_rate.iter().copied().chain(curve.iter().map(|p| p.0)));
    let y_range = log_range(data.viscosity.iter().copied().chain(curve.iter().map(|p| p.1)));
    let (Some((x0, x1)), Some((y0, y1))) = (x_range, y_range) else {
        return no_data(&root, "No flow step data");
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Flow Step", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
        .map_err(figure_error)?;

    chart
        .configure_mesh()
        .x_desc("shear rate (1/s)")
        .y_desc("viscosity (Pa s)")
        .draw()
        .map_err(figure_error)?;

    chart
        .draw_series(
            positive_points(&data.shear_rate, &data.viscosity)
                .map(|p| Circle::new(p, 3, BLUE.mix(0.7).filled())),
        )
        .map_err(figure_error)?
        .label("η")
        .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));

    if !curve.is_empty() {
        chart
            .draw_series(LineSeries::new(
                curve.iter().copied().filter(|(x, y)| *x > 0.0 && *y > 0.0),
                &RED,
            ))
            .map_err(figure_error)?
            .label("Cross model")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(figure_error)?;
    root.present().map_err(figure_error)
}

/// Steady viscosity against shear rate over |η*| against frequency
pub fn cox_merz_figure(path: &Path, result: &CoxMerzResult) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(figure_error)?;

    let x_range = log_range(result.shear_rate.iter().chain(&result.frequency).copied());
    let y_range = log_range(result.viscosity.iter().chain(&result.complex_viscosity).copied());
    let (Some((x0, x1)), Some((y0, y1))) = (x_range, y_range) else {
        return no_data(&root, "No Cox-Merz data");
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Cox-Merz Rule", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())
        .map_err(figure_error)?;

    chart
        .configure_mesh()
        .x_desc("shear rate (1/s), ang. frequency (rad/s)")
        .y_desc("η, |η*| (Pa s)")
        .draw()
        .map_err(figure_error)?;

    let series = [
        (&result.shear_rate, &result.viscosity, "η (flow step)", BLUE),
        (&result.frequency, &result.complex_viscosity, "|η*| (frequency sweep)", RED),
    ];
    for (x, y, label, color) in series {
        chart
            .draw_series(positive_points(x, y).map(|p| Circle::new(p, 3, color.mix(0.7).filled())))
            .map_err(figure_error)?
            .label(label)
            .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(figure_error)?;
    root.present().map_err(figure_error)
}

/// One box per (variable, group), variables along x and groups side by side
pub fn box_plot_figure(path: &Path, title: &str, y_desc: &str, rows: &[MeltedRow]) -> Result<()> {
    let root = SVGBackend::new(path, (1000, 550)).into_drawing_area();
    root.fill(&WHITE).map_err(figure_error)?;

    let mut variables: Vec<&str> = Vec::new();
    let mut groups: Vec<&str> = Vec::new();
    for row in rows {
        if !variables.contains(&row.variable.as_str()) {
            variables.push(&row.variable);
        }
        if !groups.contains(&row.group.as_str()) {
            groups.push(&row.group);
        }
    }
    let Some((y0, y1)) = linear_range(rows.iter().map(|r| r.value)) else {
        return no_data(&root, "No cohort data");
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..variables.len()).into_segmented(), y0 as f32..y1 as f32)
        .map_err(figure_error)?;

    chart
        .configure_mesh()
        .x_labels(variables.len())
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => variables.get(*i).map(|v| v.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc(y_desc)
        .draw()
        .map_err(figure_error)?;

    let width = 24u32;
    let spread = groups.len() as f64 - 1.0;
    for (g, group) in groups.iter().enumerate() {
        let color = PALETTE[g % PALETTE.len()];
        let offset = (g as f64 - spread / 2.0) * (width as f64 + 6.0);
        let boxes: Vec<_> = variables
            .iter()
            .enumerate()
            .filter_map(|(i, variable)| {
                let values: Vec<f64> = rows
                    .iter()
                    .filter(|r| r.group == *group && r.variable == *variable)
                    .map(|r| r.value)
                    .collect();
                (!values.is_empty()).then(|| {
                    Boxplot::new_vertical(SegmentValue::CenterOf(i), &Quartiles::new(&values))
                        .width(width)
                        .whisker_width(0.5)
                        .style(color)
                        .offset(offset)
                })
            })
            .collect();
        chart
            .draw_series(boxes)
            .map_err(figure_error)?
            .label(*group)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(figure_error)?;
    root.present().map_err(figure_error)
}
