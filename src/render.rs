use crate::error::{GraphError, Result};
use crate::grid::Grid;
use crate::timeseries::{TimeAxis, TimeSeries};
use crate::voxel::VoxelGrid;
use crate::{min_and_max, suitable_xfmt};
use chrono::prelude::*;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::Ranged;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

pub const HEATMAP_SIZE: (u32, u32) = (1000, 800);
pub const TIMEGRAPH_SIZE: (u32, u32) = (1600, 800);
pub const VOXEL_SIZE: (u32, u32) = (1000, 900);

/// Appends `.png` when the output path has no extension.
pub fn with_image_extension(mut path: PathBuf) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension("png");
    }
    path
}

fn is_svg(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("svg"))
}

fn render_err(path: &Path, e: Box<dyn Error>) -> GraphError {
    GraphError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Draws on an svg or a bitmap backend depending on the extension of `out`.
macro_rules! on_backend {
    ($out:expr, $size:expr, |$root:ident| $body:expr) => {{
        let out: &Path = $out;
        let res: DrawResult = if is_svg(out) {
            let $root = SVGBackend::new(out, $size).into_drawing_area();
            $body
        } else {
            let $root = BitMapBackend::new(out, $size).into_drawing_area();
            $body
        };
        res.map_err(|e| render_err(out, e))
    }};
}

/// `hot` colormap: black, red, yellow, white over [0, 1].
pub fn hot(v: f64) -> RGBColor {
    let v = if v.is_nan() { 0. } else { v.clamp(0., 1.) };
    let r = (v / 0.365).min(1.);
    let g = ((v - 0.365) / 0.381).clamp(0., 1.);
    let b = ((v - 0.746) / 0.254).clamp(0., 1.);
    RGBColor((r * 255.) as u8, (g * 255.) as u8, (b * 255.) as u8)
}

/// Paints one rectangle per tile, row 0 at the bottom. Values at or above
/// `display` (the unvisited display value) are painted white.
pub fn draw_heatmap(grid: &Grid, display: f64, out: &Path) -> Result<()> {
    debug!(
        "drawing {}x{} heatmap to {}",
        grid.rows(),
        grid.cols(),
        out.display()
    );
    on_backend!(out, HEATMAP_SIZE, |root| heatmap_on(root, grid, display))
}

fn heatmap_on<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    grid: &Grid,
    display: f64,
) -> DrawResult
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("heat map", ("sans-serif", 30))
        .margin(20)
        .build_cartesian_2d(0..grid.cols() as i32, 0..grid.rows() as i32)?;
    chart.draw_series(grid.iter().map(|(row, col, v)| {
        let color = match v {
            Some(v) if v < display => hot(v / display),
            _ => WHITE,
        };
        let (x, y) = (col as i32, row as i32);
        Rectangle::new([(x, y), (x + 1, y + 1)], color.filled())
    }))?;
    root.present()?;
    Ok(())
}

/// Contiguous index ranges of `values` holding no NAN.
pub fn runs(values: &[f64]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, v) in values.iter().enumerate() {
        match (v.is_nan(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..values.len());
    }
    out
}

fn value_range(ts: &TimeSeries) -> Option<Range<f64>> {
    let (ymin, ymax) = min_and_max(
        ts.series
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .filter(|v| !v.is_nan()),
    )?;
    let yspan = if ymax > ymin { (ymax - ymin) / 10. } else { 1. };
    Some(ymin - yspan..ymax + yspan)
}

/// Plots one line per series against time, breaking lines at NAN.
pub fn draw_timegraph(ts: &TimeSeries, out: &Path) -> Result<()> {
    debug!(
        "drawing {} series over {} samples to {}",
        ts.series.len(),
        ts.time.len(),
        out.display()
    );
    on_backend!(out, TIMEGRAPH_SIZE, |root| timegraph_on(root, ts))
}

fn timegraph_on<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, ts: &TimeSeries) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let yrange = value_range(ts).ok_or("no values to plot")?;
    root.fill(&WHITE)?;
    match &ts.time {
        TimeAxis::Ticks(t) => {
            let (xmin, xmax) = min_and_max(t.iter().copied()).ok_or("no values to plot")?;
            let xmargin = if xmax > xmin { (xmax - xmin) / 20. } else { 1. };
            let mut chart = ChartBuilder::on(&root)
                .caption("values over time", ("sans-serif", 24))
                .margin(20)
                .x_label_area_size(60)
                .y_label_area_size(100)
                .build_cartesian_2d(xmin - xmargin..xmax + xmargin, yrange)?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(&TRANSPARENT)
                .bold_line_style(RGBColor(150, 150, 150).stroke_width(1))
                .label_style(("sans-serif", 20))
                .x_desc("time")
                .y_desc("values")
                .draw()?;
            draw_lines(&mut chart, t, &ts.series)?;
        }
        TimeAxis::DateTimes(t) => {
            let (xmindt, xmaxdt) = min_and_max(t.iter().copied()).ok_or("no values to plot")?;
            let xspan: chrono::Duration = xmaxdt - xmindt;
            let xmargin = if xspan > chrono::Duration::zero() {
                xspan / 20
            } else {
                chrono::Duration::minutes(1)
            };
            let xfmt = suitable_xfmt(xspan);
            let xs: Vec<DateTime<Utc>> = t.iter().map(|x| Utc.from_utc_datetime(x)).collect();
            let xminlocal = Utc.from_utc_datetime(&(xmindt - xmargin));
            let xmaxlocal = Utc.from_utc_datetime(&(xmaxdt + xmargin));
            let mut chart = ChartBuilder::on(&root)
                .caption("values over time", ("sans-serif", 24))
                .margin(20)
                .x_label_area_size(60)
                .y_label_area_size(100)
                .build_cartesian_2d(xminlocal..xmaxlocal, yrange)?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(&TRANSPARENT)
                .bold_line_style(RGBColor(150, 150, 150).stroke_width(1))
                .label_style(("sans-serif", 20))
                .x_labels(14)
                .x_label_formatter(&|x: &DateTime<Utc>| x.format(xfmt).to_string())
                .x_desc(format!("time [{}]", xfmt.replace('%', "")))
                .y_desc("values")
                .draw()?;
            draw_lines(&mut chart, &xs, &ts.series)?;
        }
    }
    root.present()?;
    Ok(())
}

fn draw_lines<'a, DB, XC>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<XC, RangedCoordf64>>,
    xs: &[XC::ValueType],
    series: &[(String, Vec<f64>)],
) -> DrawResult
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    XC: Ranged,
    XC::ValueType: Clone + 'static,
{
    for (i, (name, ys)) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        for (k, run) in runs(ys).into_iter().enumerate() {
            let line = LineSeries::new(
                run.map(|j| (xs[j].clone(), ys[j])),
                color.stroke_width(2),
            );
            let anno = chart.draw_series(line)?;
            if k == 0 {
                anno.label(name.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 20))
        .draw()?;
    Ok(())
}

/// Draws one translucent point per visited voxel, colored by its visit count.
pub fn draw_voxels(grid: &VoxelGrid, out: &Path) -> Result<()> {
    debug!("drawing {:?} voxels to {}", grid.shape(), out.display());
    on_backend!(out, VOXEL_SIZE, |root| voxels_on(root, grid))
}

fn voxels_on<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, grid: &VoxelGrid) -> DrawResult
where
    DB::ErrorType: 'static,
{
    let (width, length, depth) = grid.shape();
    let max = grid.max_count().max(1) as f64;
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("heat map", ("sans-serif", 30))
        .margin(20)
        .build_cartesian_3d(
            0.0..width as f64,
            0.0..(depth.max(2) - 1) as f64,
            0.0..length as f64,
        )?;
    chart.configure_axes().draw()?;
    chart.draw_series(grid.occupied().map(|(x, z, h, count)| {
        Circle::new(
            (x as f64, h as f64, z as f64),
            6,
            hot(count as f64 / max).mix(0.4).filled(),
        )
    }))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_endpoints() {
        assert_eq!(hot(0.), RGBColor(0, 0, 0));
        assert_eq!(hot(1.), RGBColor(255, 255, 255));
        assert_eq!(hot(0.2).1, 0);
        // the cap sits at 0.8 of the display value: yellow, not white
        let capped = hot(0.8);
        assert_eq!((capped.0, capped.1), (255, 255));
        assert!(capped.2 < 255);
    }

    #[test]
    fn test_runs_split_at_nan() {
        let v = [f64::NAN, 1., 2., f64::NAN, f64::NAN, 3.];
        assert_eq!(runs(&v), vec![1..3, 5..6]);
        assert!(runs(&[f64::NAN]).is_empty());
        assert_eq!(runs(&[1., 2.]), vec![0..2]);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(
            with_image_extension(PathBuf::from("hmap")),
            PathBuf::from("hmap.png")
        );
        assert_eq!(
            with_image_extension(PathBuf::from("out.svg")),
            PathBuf::from("out.svg")
        );
        assert!(is_svg(Path::new("a/b.SVG")));
    }
}
