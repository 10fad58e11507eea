pub mod cli;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod heatmap;
pub mod mkgraph;
pub mod render;
pub mod timegraph;
pub mod timeseries;
pub mod voxel;
pub mod voxelmap;

pub use dataset::{Dataset, Input, Sample, SampleSpec};
pub use error::{GraphError, Result};
pub use grid::{aggregate, Combine, Grid, GridConfig, MissingValues, OutOfBounds, Reducer};

use tracing_subscriber::EnvFilter;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exit status for invalid command line arguments.
pub const EXIT_CONFIG: i32 = 2;

/// Installs the stderr logger; `RUST_LOG` overrides the default level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(
    s: impl IntoIterator<Item = T>,
) -> Option<(T, T)> {
    let mut self_iter = s.into_iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (v, v),
        None => return None,
    };
    for es in self_iter {
        if es > max {
            max = es
        }
        if es < min {
            min = es
        }
    }
    Some((min, max))
}

pub fn suitable_xfmt(d: chrono::Duration) -> &'static str {
    if d > chrono::Duration::weeks(1) {
        "%y-%m-%d"
    } else if d > chrono::Duration::days(1) {
        "%m-%d %H"
    } else {
        "%d %H:%M"
    }
}
