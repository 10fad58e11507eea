use super::VERSION;
use crate::cli::*;
use crate::dataset::{Dataset, Input};
use crate::error::Result;
use crate::render::draw_voxels;
use crate::voxel::{VoxelColumns, VoxelConfig, VoxelGrid};
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct VoxelArgs {
    pub input: Input,
    pub output: PathBuf,
    pub columns: VoxelColumns,
    pub config: VoxelConfig,
    pub verbose: bool,
}

fn app() -> App<'static, 'static> {
    let size = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .help(help)
            .long(name)
            .takes_value(true)
            .required(true)
    };
    let column = |name: &'static str, help: &'static str, default: &'static str| {
        Arg::with_name(name)
            .help(help)
            .long(name)
            .takes_value(true)
            .default_value(default)
    };
    App::new("tracegraph_voxel")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to draw a 3D heatmap of visits per unit voxel")
        .arg(arg_input())
        .arg(arg_dir())
        .arg(arg_output("heatmap3d.png"))
        .arg(size("width", "size of the map along x"))
        .arg(size("length", "size of the map along z"))
        .arg(size("depth", "number of height levels"))
        .arg(column("xname", "column holding the x position", "posx"))
        .arg(column("zname", "column holding the z position", "posz"))
        .arg(column("hname", "column holding the height", "posy"))
        .arg(arg_out_of_bounds())
        .arg(arg_verbose())
}

fn from_matches(m: &ArgMatches) -> Result<VoxelArgs> {
    Ok(VoxelArgs {
        input: input_from(m)?,
        output: output_from(m),
        columns: VoxelColumns {
            x: m.value_of("xname").unwrap_or("posx").to_string(),
            z: m.value_of("zname").unwrap_or("posz").to_string(),
            h: m.value_of("hname").unwrap_or("posy").to_string(),
        },
        config: VoxelConfig {
            width: required(m, "width")?,
            length: required(m, "length")?,
            depth: required(m, "depth")?,
            out_of_bounds: out_of_bounds_from(m)?,
        },
        verbose: m.is_present("verbose"),
    })
}

pub fn parse_cli() -> Result<VoxelArgs> {
    from_matches(&app().get_matches())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<VoxelArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    from_matches(&app().get_matches_from_safe(args).map_err(clap_err)?)
}

pub fn run(args: &VoxelArgs) -> Result<VoxelGrid> {
    let dataset = Dataset::load(&args.input)?;
    let grid = VoxelGrid::count_visits(&dataset, &args.columns, &args.config)?;
    info!(
        "{} voxels visited, at most {} times",
        grid.occupied().count(),
        grid.max_count()
    );
    draw_voxels(&grid, &args.output)?;
    info!("3D heatmap saved to {}", args.output.display());
    Ok(grid)
}
