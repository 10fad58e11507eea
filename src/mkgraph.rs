//! Combined time graph / heatmap app over traces with `posx,posy,posz,time`
//! columns. Its heatmap starts a tile at the first sample's value, shifted by
//! `--hmMinval`, and adds one per later visit.

use super::VERSION;
use crate::cli::*;
use crate::dataset::{Input, SampleSpec};
use crate::error::{GraphError, Result};
use crate::grid::{GridConfig, MissingValues, OutOfBounds, Reducer};
use crate::heatmap::HeatmapArgs;
use crate::timegraph::TimegraphArgs;
use crate::{heatmap, timegraph};
use clap::{App, AppSettings, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub enum GraphArgs {
    Timegraph(TimegraphArgs),
    Heatmap(HeatmapArgs),
}

fn app() -> App<'static, 'static> {
    let hm = |name: &'static str, help: &'static str| {
        Arg::with_name(name).help(help).long(name).takes_value(true)
    };
    let arg_input = Arg::with_name("input")
        .help("input csv file")
        .short("i")
        .takes_value(true)
        .required(true);
    let arg_graph = Arg::with_name("graph")
        .help("the type of graph")
        .short("g")
        .takes_value(true)
        .possible_values(&["timegraph", "heatmap"])
        .default_value("timegraph");
    App::new("tracegraph_mkgraph")
        .setting(AppSettings::AllowNegativeNumbers)
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot a time graph or a heatmap of csv traces")
        .arg(arg_input)
        .arg(arg_output("plot.png"))
        .arg(arg_graph)
        .arg(hm("hmWidth", "the width of the heatmap"))
        .arg(hm("hmHeight", "the height of the heatmap"))
        .arg(hm("hmScale", "the size-scale of the heatmap").default_value("1"))
        .arg(hm("hmMinval", "minimum heat value in the heatmap").default_value("0"))
        .arg(hm("hmMaxval", "maximum heat value in the heatmap").default_value("100"))
        .arg(arg_verbose())
        .arg(arg_properties("properties (column names) to plot").required(true))
}

fn from_matches(m: &ArgMatches) -> Result<GraphArgs> {
    let input = Input::File(PathBuf::from(m.value_of("input").unwrap_or_default()));
    let output = output_from(m);
    let properties = properties_from(m);
    let verbose = m.is_present("verbose");
    if properties.is_empty() {
        return Err(GraphError::Config(
            "specify at least one property whose values are to be plotted".to_string(),
        ));
    }
    match m.value_of("graph") {
        Some("heatmap") => {
            let grid = GridConfig {
                width: required(m, "hmWidth")?,
                height: required(m, "hmHeight")?,
                scale: required(m, "hmScale")?,
                cap: required(m, "hmMaxval")?,
                floor: required(m, "hmMinval")?,
                missing: MissingValues::Skip,
                out_of_bounds: OutOfBounds::Fail,
            };
            grid.validate()?;
            Ok(GraphArgs::Heatmap(HeatmapArgs {
                input,
                output,
                spec: SampleSpec {
                    x: "posx".to_string(),
                    y: "posz".to_string(),
                    properties,
                },
                grid,
                reducer: Reducer::CappedIncrement,
                verbose,
            }))
        }
        _ => Ok(GraphArgs::Timegraph(TimegraphArgs {
            input,
            output,
            time_column: "time".to_string(),
            properties,
            missing: MissingValues::Fail,
            verbose,
        })),
    }
}

pub fn parse_cli() -> Result<GraphArgs> {
    from_matches(&app().get_matches())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<GraphArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    from_matches(&app().get_matches_from_safe(args).map_err(clap_err)?)
}

impl GraphArgs {
    pub fn verbose(&self) -> bool {
        match self {
            GraphArgs::Timegraph(a) => a.verbose,
            GraphArgs::Heatmap(a) => a.verbose,
        }
    }
}

pub fn run(args: &GraphArgs) -> Result<()> {
    match args {
        GraphArgs::Timegraph(a) => {
            info!("graph type: timegraph, properties: {:?}", a.properties);
            timegraph::run(a)?;
        }
        GraphArgs::Heatmap(a) => {
            info!("graph type: heatmap, properties: {:?}", a.spec.properties);
            heatmap::run(a)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timegraph_is_default() {
        let args = parse_cli_from(vec!["mkgraph", "-i", "in.csv", "health"]).unwrap();
        match args {
            GraphArgs::Timegraph(a) => {
                assert_eq!(a.time_column, "time");
                assert_eq!(a.output, PathBuf::from("plot.png"));
            }
            other => panic!("expected a time graph, got {:?}", other),
        }
    }

    #[test]
    fn test_heatmap_uses_floor_and_capped_increment() {
        let args = parse_cli_from(vec![
            "mkgraph", "-i", "in.csv", "-g", "heatmap", "--hmWidth", "20", "--hmHeight", "10",
            "--hmMinval=-5", "--hmMaxval", "50", "health",
        ])
        .unwrap();
        match args {
            GraphArgs::Heatmap(a) => {
                assert_eq!(a.reducer, Reducer::CappedIncrement);
                assert_eq!(a.grid.floor, -5.);
                assert_eq!(a.grid.cap, 50.);
                assert_eq!(a.grid.missing, MissingValues::Skip);
                assert_eq!(a.spec.y, "posz");
            }
            other => panic!("expected a heatmap, got {:?}", other),
        }
    }

    #[test]
    fn test_heatmap_needs_size() {
        let res = parse_cli_from(vec!["mkgraph", "-i", "in.csv", "-g", "heatmap", "health"]);
        assert!(matches!(res, Err(GraphError::Config(_))));
    }

    #[test]
    fn test_property_required() {
        assert!(parse_cli_from(vec!["mkgraph", "-i", "in.csv"]).is_err());
    }
}
