use crate::dataset::{Dataset, Record};
use crate::error::{GraphError, Result};
use crate::grid::MissingValues;
use crate::DT_FORMAT;
use chrono::NaiveDateTime;

/// Values of the time column, numeric ticks or datetimes.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAxis {
    Ticks(Vec<f64>),
    DateTimes(Vec<NaiveDateTime>),
}

impl TimeAxis {
    pub fn len(&self) -> usize {
        match self {
            TimeAxis::Ticks(t) => t.len(),
            TimeAxis::DateTimes(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The time column and one series per selected property,
/// NAN where a property has no value.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub time: TimeAxis,
    pub series: Vec<(String, Vec<f64>)>,
}

fn parse_datetime(record: &Record, column: &str, index: usize) -> Result<NaiveDateTime> {
    let raw = record.field(index);
    NaiveDateTime::parse_from_str(raw, DT_FORMAT).map_err(|_| GraphError::InvalidNumber {
        path: record.origin.path.to_path_buf(),
        line: record.origin.line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

impl TimeSeries {
    /// Reads the time column and the selected property columns.
    /// The first record decides whether time is numeric or a `DT_FORMAT` datetime.
    pub fn from_dataset(
        dataset: &Dataset,
        time_column: &str,
        selected: &[String],
        missing: MissingValues,
    ) -> Result<TimeSeries> {
        let ti = dataset.column(time_column)?;
        let records = dataset.records();
        let numeric = match records.first() {
            Some(r) => r.field(ti).parse::<f64>().is_ok(),
            None => true,
        };
        let time = if numeric {
            TimeAxis::Ticks(
                records
                    .iter()
                    .map(|r| r.required(time_column, ti))
                    .collect::<Result<Vec<f64>>>()?,
            )
        } else {
            TimeAxis::DateTimes(
                records
                    .iter()
                    .map(|r| parse_datetime(r, time_column, ti))
                    .collect::<Result<Vec<NaiveDateTime>>>()?,
            )
        };
        let mut series = Vec::with_capacity(selected.len());
        for name in selected.iter() {
            let pi = dataset.column(name)?;
            let mut values = Vec::with_capacity(records.len());
            for r in records.iter() {
                match (r.optional(name, pi)?, missing) {
                    (Some(v), _) => values.push(v),
                    (None, MissingValues::Skip) => values.push(f64::NAN),
                    (None, MissingValues::Fail) => {
                        return Err(GraphError::MissingValue {
                            path: r.origin.path.to_path_buf(),
                            line: r.origin.line,
                            column: name.clone(),
                        })
                    }
                }
            }
            series.push((name.clone(), values));
        }
        Ok(TimeSeries { time, series })
    }
}
