use super::VERSION;
use crate::cli::*;
use crate::dataset::{Dataset, Input};
use crate::error::{GraphError, Result};
use crate::grid::MissingValues;
use crate::render::draw_timegraph;
use crate::timeseries::TimeSeries;
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct TimegraphArgs {
    pub input: Input,
    pub output: PathBuf,
    pub time_column: String,
    pub properties: Vec<String>,
    pub missing: MissingValues,
    pub verbose: bool,
}

fn app() -> App<'static, 'static> {
    let arg_tname = Arg::with_name("tname")
        .help("column holding the time")
        .long("tname")
        .takes_value(true)
        .default_value("time");
    App::new("tracegraph_time")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot the values of csv columns over time")
        .arg(arg_input())
        .arg(arg_dir())
        .arg(arg_output("tgraph.png"))
        .arg(arg_tname)
        .arg(arg_skip_missing())
        .arg(arg_verbose())
        .arg(arg_properties("properties (column names) to plot"))
}

fn from_matches(m: &ArgMatches) -> Result<TimegraphArgs> {
    let input = input_from(m)?;
    let properties = properties_from(m);
    if properties.is_empty() {
        return Err(GraphError::Config(
            "specify at least one property whose values are to be plotted".to_string(),
        ));
    }
    Ok(TimegraphArgs {
        input,
        output: output_from(m),
        time_column: m.value_of("tname").unwrap_or("time").to_string(),
        properties,
        missing: if m.is_present("skip_missing") {
            MissingValues::Skip
        } else {
            MissingValues::Fail
        },
        verbose: m.is_present("verbose"),
    })
}

/// Takes the CLI arguments that control the time graph, exiting on usage errors.
pub fn parse_cli() -> Result<TimegraphArgs> {
    from_matches(&app().get_matches())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<TimegraphArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    from_matches(&app().get_matches_from_safe(args).map_err(clap_err)?)
}

pub fn run(args: &TimegraphArgs) -> Result<TimeSeries> {
    let dataset = Dataset::load(&args.input)?;
    let ts = TimeSeries::from_dataset(&dataset, &args.time_column, &args.properties, args.missing)?;
    draw_timegraph(&ts, &args.output)?;
    info!("time graph saved to {}", args.output.display());
    Ok(ts)
}
