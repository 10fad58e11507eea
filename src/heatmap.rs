use super::VERSION;
use crate::cli::*;
use crate::dataset::{Dataset, Input, SampleSpec};
use crate::error::Result;
use crate::grid::{aggregate, unvisited_display_value, Grid, GridConfig, MissingValues, Reducer};
use crate::render::draw_heatmap;
use clap::{App, AppSettings, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

/// Everything needed to draw one heatmap.
#[derive(Debug, Clone)]
pub struct HeatmapArgs {
    pub input: Input,
    pub output: PathBuf,
    pub spec: SampleSpec,
    pub grid: GridConfig,
    pub reducer: Reducer,
    pub verbose: bool,
}

fn app() -> App<'static, 'static> {
    let arg_width = Arg::with_name("width")
        .help("the width of the map, in position units")
        .long("width")
        .takes_value(true)
        .required(true);
    let arg_height = Arg::with_name("height")
        .help("the height of the map, in position units")
        .long("height")
        .takes_value(true)
        .required(true);
    let arg_scale = Arg::with_name("scale")
        .help("tiles are 1/scale x 1/scale; positions in the same tile are merged")
        .long("scale")
        .takes_value(true)
        .default_value("1");
    let arg_maxval = Arg::with_name("maxval")
        .help("maximum heat value of a tile")
        .long("maxval")
        .takes_value(true)
        .default_value("100");
    let arg_minval = Arg::with_name("minval")
        .help("value subtracted from every sample, so it maps to zero heat")
        .long("minval")
        .takes_value(true)
        .default_value("0");
    let arg_xname = Arg::with_name("xname")
        .help("column holding the x position")
        .long("xname")
        .takes_value(true)
        .default_value("x");
    let arg_yname = Arg::with_name("yname")
        .help("column holding the y position")
        .long("yname")
        .takes_value(true)
        .default_value("y");
    let arg_reducer = Arg::with_name("reducer")
        .help("how samples in the same tile combine; visit-count without properties, max-sum with")
        .long("reducer")
        .takes_value(true)
        .possible_values(&["visit-count", "max-sum", "capped-increment"]);
    App::new("tracegraph_heatmap")
        .setting(AppSettings::AllowNegativeNumbers)
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to draw a tile heatmap of the positions visited in csv traces")
        .arg(arg_input())
        .arg(arg_dir())
        .arg(arg_output("hmap.png"))
        .arg(arg_width)
        .arg(arg_height)
        .arg(arg_scale)
        .arg(arg_maxval)
        .arg(arg_minval)
        .arg(arg_xname)
        .arg(arg_yname)
        .arg(arg_reducer)
        .arg(arg_skip_missing())
        .arg(arg_out_of_bounds())
        .arg(arg_verbose())
        .arg(arg_properties(
            "properties whose summed values are shown; none for a visit count",
        ))
}

fn from_matches(m: &ArgMatches) -> Result<HeatmapArgs> {
    let properties = properties_from(m);
    let reducer = match m.value_of("reducer") {
        Some(r) => r.parse()?,
        None => Reducer::default_for(&properties),
    };
    let grid = GridConfig {
        width: required(m, "width")?,
        height: required(m, "height")?,
        scale: required(m, "scale")?,
        cap: required(m, "maxval")?,
        floor: required(m, "minval")?,
        missing: if m.is_present("skip_missing") {
            MissingValues::Skip
        } else {
            MissingValues::Fail
        },
        out_of_bounds: out_of_bounds_from(m)?,
    };
    grid.validate()?;
    Ok(HeatmapArgs {
        input: input_from(m)?,
        output: output_from(m),
        spec: SampleSpec {
            x: m.value_of("xname").unwrap_or("x").to_string(),
            y: m.value_of("yname").unwrap_or("y").to_string(),
            properties,
        },
        grid,
        reducer,
        verbose: m.is_present("verbose"),
    })
}

/// Takes the CLI arguments that control the heatmap, exiting on usage errors.
pub fn parse_cli() -> Result<HeatmapArgs> {
    from_matches(&app().get_matches())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<HeatmapArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    from_matches(&app().get_matches_from_safe(args).map_err(clap_err)?)
}

/// Loads the input, aggregates it and draws the heatmap; returns the drawn grid.
pub fn run(args: &HeatmapArgs) -> Result<Grid> {
    let dataset = Dataset::load(&args.input)?;
    let samples = dataset.samples(&args.spec)?;
    let (rows, cols) = args.grid.shape();
    info!(
        "aggregating {} samples into {}x{} tiles with {}, properties: {:?}",
        samples.len(),
        rows,
        cols,
        args.reducer,
        args.spec.properties
    );
    let mut grid = aggregate(&samples, &args.spec.properties, &args.grid, &args.reducer)?;
    info!("{} of {} tiles visited", grid.visited(), rows * cols);
    let display = unvisited_display_value(args.grid.cap);
    grid.fill_unvisited(display);
    draw_heatmap(&grid, display, &args.output)?;
    info!("heatmap saved to {}", args.output.display());
    Ok(grid)
}
