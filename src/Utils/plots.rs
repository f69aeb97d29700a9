use crate::numerical::ode_error::OdeError;
use log::info;
use nalgebra::{DMatrix, DVector};
use plotters::prelude::*;
use std::path::Path;

fn plot_err<E: std::fmt::Display>(e: E) -> OdeError {
    OdeError::Plot(e.to_string())
}

// plotters panics on a zero-width range
fn padded_range(min: f64, max: f64) -> std::ops::Range<f64> {
    let span = (max - min).abs();
    let pad = if span > 0.0 { 0.05 * span } else { 0.5 * min.abs().max(1.0) };
    (min - pad)..(max + pad)
}

/// one PNG per column of `y_result`, named `<variable>.png`
pub fn plots(
    dir: &Path,
    arg: &str,
    values: &[String],
    t_result: &DVector<f64>,
    y_result: &DMatrix<f64>,
    title: &str,
) -> Result<(), OdeError> {
    let x = t_result;
    let x_range = padded_range(x.min(), x.max());
    for col in 0..y_result.ncols() {
        let y_col = y_result.column(col);
        let varname = values[col].clone();
        let filename = dir.join(format!("{}.png", varname));
        let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE).map_err(plot_err)?;

        let mut chart = ChartBuilder::on(&root_area)
            .caption(format!("{} ({})", varname, title), ("sans-serif", 40))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range.clone(), padded_range(y_col.min(), y_col.max()))
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc(arg)
            .y_desc(&varname)
            .draw()
            .map_err(plot_err)?;

        let series: Vec<(f64, f64)> = x.iter().zip(y_col.iter()).map(|(&x, &y)| (x, y)).collect();
        chart
            .draw_series(LineSeries::new(series, &Palette99::pick(col)))
            .map_err(plot_err)?
            .label(format!(" {}", varname))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(col)));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;
        root_area.present().map_err(plot_err)?;
    }
    info!("result plotted to {}", dir.display());
    Ok(())
}

/// x_1 against x_0 with the start and end points marked
pub fn phase_portrait(dir: &Path, y_result: &DMatrix<f64>, title: &str) -> Result<(), OdeError> {
    let q = y_result.column(0);
    let p = y_result.column(1);
    let filename = dir.join("phase_portrait.png");
    let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root_area)
        .caption(format!("Phase portrait ({})", title), ("sans-serif", 40))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(padded_range(q.min(), q.max()), padded_range(p.min(), p.max()))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("x_0")
        .y_desc("x_1")
        .draw()
        .map_err(plot_err)?;

    let series: Vec<(f64, f64)> = q.iter().zip(p.iter()).map(|(&q, &p)| (q, p)).collect();
    let start = series[0];
    let end = series[series.len() - 1];
    chart
        .draw_series(LineSeries::new(series, &MAGENTA))
        .map_err(plot_err)?;
    chart
        .draw_series([Circle::new(start, 6, RED.filled())])
        .map_err(plot_err)?
        .label("Start")
        .legend(|(x, y)| Circle::new((x, y), 5, RED.filled()));
    chart
        .draw_series([Circle::new(end, 6, BLUE.filled())])
        .map_err(plot_err)?
        .label("End")
        .legend(|(x, y)| Circle::new((x, y), 5, BLUE.filled()));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    root_area.present().map_err(plot_err)?;
    Ok(())
}
