use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading traces, aggregating grids, and drawing images.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header line")]
    EmptyInput { path: PathBuf },

    #[error("no csv files found in directory {0}")]
    EmptyDir(PathBuf),

    #[error("header of {path} does not match header of {first}")]
    HeaderMismatch { first: PathBuf, path: PathBuf },

    #[error("{path} has no column named '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}, line {line}, column '{column}': '{value}' is not a valid number")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("{path}, line {line}: no value for property '{column}'")]
    MissingValue {
        path: PathBuf,
        line: u64,
        column: String,
    },

    #[error(
        "{path}, line {line}: scaled position {position:?} maps to tile {index:?}, outside the {shape:?} grid"
    )]
    OutOfBounds {
        path: PathBuf,
        line: u64,
        position: Vec<f64>,
        index: Vec<i64>,
        shape: Vec<usize>,
    },

    #[error("could not draw {path}: {message}")]
    Render { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, GraphError>;
