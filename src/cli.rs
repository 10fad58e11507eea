//! Arguments shared by the command line apps.

use crate::dataset::Input;
use crate::error::{GraphError, Result};
use crate::grid::OutOfBounds;
use crate::render::with_image_extension;
use clap::{Arg, ArgMatches};
use std::path::PathBuf;
use std::str::FromStr;

pub fn arg_input() -> Arg<'static, 'static> {
    Arg::with_name("input")
        .help("input csv file (comma separated)")
        .short("i")
        .long("input")
        .takes_value(true)
}

pub fn arg_dir() -> Arg<'static, 'static> {
    Arg::with_name("dir")
        .help("read and append the data of all csv files in this directory")
        .long("dir")
        .takes_value(true)
        .conflicts_with("input")
}

pub fn arg_output(default: &'static str) -> Arg<'static, 'static> {
    Arg::with_name("output")
        .help("output image, png unless the extension is .svg")
        .short("o")
        .long("output")
        .takes_value(true)
        .default_value(default)
}

pub fn arg_properties(help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name("properties")
        .help(help)
        .multiple(true)
        .index(1)
}

pub fn arg_skip_missing() -> Arg<'static, 'static> {
    Arg::with_name("skip_missing")
        .help("treat empty property values as missing instead of failing")
        .long("skip-missing")
        .takes_value(false)
}

pub fn arg_out_of_bounds() -> Arg<'static, 'static> {
    Arg::with_name("out_of_bounds")
        .help("what to do with positions outside the map")
        .long("out-of-bounds")
        .takes_value(true)
        .possible_values(&["fail", "drop", "clamp"])
        .default_value("fail")
}

pub fn arg_verbose() -> Arg<'static, 'static> {
    Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose")
        .takes_value(false)
}

/// Single file (`-i`) or directory (`--dir`); one of them is required.
pub fn input_from(m: &ArgMatches) -> Result<Input> {
    match (m.value_of("input"), m.value_of("dir")) {
        (Some(f), None) => Ok(Input::File(PathBuf::from(f))),
        (None, Some(d)) => Ok(Input::Dir(PathBuf::from(d))),
        _ => Err(GraphError::Config(
            "specify an input file (-i) or an input directory (--dir)".to_string(),
        )),
    }
}

pub fn output_from(m: &ArgMatches) -> PathBuf {
    with_image_extension(PathBuf::from(m.value_of("output").unwrap_or_default()))
}

pub fn properties_from(m: &ArgMatches) -> Vec<String> {
    m.values_of("properties")
        .map(|v| v.map(String::from).collect())
        .unwrap_or_default()
}

pub fn out_of_bounds_from(m: &ArgMatches) -> Result<OutOfBounds> {
    m.value_of("out_of_bounds").unwrap_or("fail").parse()
}

/// Parses the value of `name`, which must be present.
pub fn required<T: FromStr>(m: &ArgMatches, name: &str) -> Result<T> {
    let raw = m
        .value_of(name)
        .ok_or_else(|| GraphError::Config(format!("missing value for --{}", name)))?;
    raw.parse::<T>().map_err(|_| {
        GraphError::Config(format!("invalid value '{}' for --{}", raw, name))
    })
}

/// Turns a clap failure into a configuration error.
pub fn clap_err(e: clap::Error) -> GraphError {
    GraphError::Config(e.message)
}
