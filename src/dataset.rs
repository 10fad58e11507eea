use crate::error::{GraphError, Result};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the rows come from: a single csv file or every csv file in a directory.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    File(PathBuf),
    Dir(PathBuf),
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::File(p) => write!(f, "file {}", p.display()),
            Input::Dir(p) => write!(f, "directory {}", p.display()),
        }
    }
}

/// File and line a record was read from, kept for error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub path: Arc<Path>,
    pub line: u64,
}

/// One csv row, decoded but not yet interpreted.
#[derive(Debug, Clone)]
pub struct Record {
    pub origin: Origin,
    pub fields: Vec<String>,
}

/// One sample: a 2D position and the selected property values found in its row.
/// Selected properties with an empty field are absent from `properties`.
#[derive(Debug, Clone)]
pub struct Sample {
    pub position: (f64, f64),
    pub properties: HashMap<String, f64>,
    pub origin: Origin,
}

/// Which columns to read when turning records into samples.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub x: String,
    pub y: String,
    pub properties: Vec<String>,
}

/// All records of one or more csv files sharing the same header.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    headers: Vec<String>,
    records: Vec<Record>,
}

/// Decodes bytes as latin-1: every byte is the code point of the same value,
/// so arbitrary 8-bit content never fails to decode.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode(record: &ByteRecord) -> Vec<String> {
    record.iter().map(latin1).collect()
}

impl Dataset {
    pub fn load(input: &Input) -> Result<Dataset> {
        match input {
            Input::File(path) => Dataset::from_csv(path),
            Input::Dir(dir) => Dataset::from_dir(dir),
        }
    }

    /// Reads a comma separated file whose first line names the columns.
    pub fn from_csv(path: &Path) -> Result<Dataset> {
        let file = File::open(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let csv_err = |source: csv::Error| GraphError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let header_record = reader.byte_headers().map_err(csv_err)?.clone();
        if header_record.is_empty() {
            return Err(GraphError::EmptyInput {
                path: path.to_path_buf(),
            });
        }
        let headers: Vec<String> = decode(&header_record)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let shared: Arc<Path> = Arc::from(path);
        let mut records = Vec::new();
        let mut byte_record = ByteRecord::new();
        while reader.read_byte_record(&mut byte_record).map_err(csv_err)? {
            let line = byte_record.position().map(|p| p.line()).unwrap_or(0);
            records.push(Record {
                origin: Origin {
                    path: Arc::clone(&shared),
                    line,
                },
                fields: decode(&byte_record),
            });
        }
        debug!("read {} records from {}", records.len(), path.display());
        Ok(Dataset {
            source: path.to_path_buf(),
            headers,
            records,
        })
    }

    /// Concatenates every `*.csv` file of `dir`, in file name order.
    /// All files must have exactly the same header.
    pub fn from_dir(dir: &Path) -> Result<Dataset> {
        let io_err = |source: std::io::Error| GraphError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "csv") {
                files.push(path);
            }
        }
        files.sort();
        let mut files = files.into_iter();
        let first = match files.next() {
            Some(f) => f,
            None => return Err(GraphError::EmptyDir(dir.to_path_buf())),
        };
        let mut dataset = Dataset::from_csv(&first)?;
        let mut count = 1;
        for f in files {
            let next = Dataset::from_csv(&f)?;
            if next.headers != dataset.headers {
                return Err(GraphError::HeaderMismatch {
                    first: first.clone(),
                    path: f,
                });
            }
            dataset.records.extend(next.records);
            count += 1;
        }
        info!(
            "read {} records from {} csv files in {}",
            dataset.records.len(),
            count,
            dir.display()
        );
        dataset.source = dir.to_path_buf();
        Ok(dataset)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the column called `name`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| GraphError::MissingColumn {
                path: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// Builds one sample per record. Positions are required; an empty
    /// property field is left out of the sample, a malformed one is an error.
    pub fn samples(&self, spec: &SampleSpec) -> Result<Vec<Sample>> {
        let xi = self.column(&spec.x)?;
        let yi = self.column(&spec.y)?;
        let props = spec
            .properties
            .iter()
            .map(|p| self.column(p).map(|i| (p.as_str(), i)))
            .collect::<Result<Vec<(&str, usize)>>>()?;
        let mut samples = Vec::with_capacity(self.records.len());
        for record in self.records.iter() {
            let x = record.required(&spec.x, xi)?;
            let y = record.required(&spec.y, yi)?;
            let mut properties = HashMap::with_capacity(props.len());
            for &(name, i) in props.iter() {
                if let Some(v) = record.optional(name, i)? {
                    properties.insert(name.to_string(), v);
                }
            }
            samples.push(Sample {
                position: (x, y),
                properties,
                origin: record.origin.clone(),
            });
        }
        Ok(samples)
    }
}

impl Record {
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.trim()).unwrap_or("")
    }

    fn invalid(&self, column: &str, value: &str) -> GraphError {
        GraphError::InvalidNumber {
            path: self.origin.path.to_path_buf(),
            line: self.origin.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// Parses the field as a finite number, `None` when it is empty.
    pub fn optional(&self, column: &str, index: usize) -> Result<Option<f64>> {
        let raw = self.field(index);
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(self.invalid(column, raw)),
        }
    }

    /// Parses the field as a number; empty counts as malformed.
    pub fn required(&self, column: &str, index: usize) -> Result<f64> {
        match self.optional(column, index)? {
            Some(v) => Ok(v),
            None => Err(self.invalid(column, "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_csv(name: &str, content: &[u8]) -> PathBuf {
        let dir = env::temp_dir().join("tracegraph_dataset_tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn spec(props: &[&str]) -> SampleSpec {
        SampleSpec {
            x: "x".to_string(),
            y: "y".to_string(),
            properties: props.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        assert_eq!(latin1(b"caf\xe9"), "café");
        assert_eq!(latin1(&[0xff]), "\u{ff}");
    }

    #[test]
    fn test_from_csv_reads_header_and_lines() {
        let path = temp_csv("basic.csv", b"x,y,hp\n0,0,3\n1,2,4\n");
        let ds = Dataset::from_csv(&path).unwrap();
        assert_eq!(ds.headers(), &["x", "y", "hp"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[1].origin.line, 3);
    }

    #[test]
    fn test_non_utf8_bytes_do_not_fail() {
        let path = temp_csv("latin.csv", b"x,y,name\n0,0,\xe9t\xe9\n");
        let ds = Dataset::from_csv(&path).unwrap();
        assert_eq!(ds.records()[0].field(2), "été");
    }

    #[test]
    fn test_empty_property_is_absent() {
        let path = temp_csv("gaps.csv", b"x,y,hp\n0,0,\n1,0,5\n");
        let samples = Dataset::from_csv(&path).unwrap().samples(&spec(&["hp"])).unwrap();
        assert!(samples[0].properties.get("hp").is_none());
        assert_eq!(samples[1].properties.get("hp"), Some(&5.0));
    }

    #[test]
    fn test_malformed_number_names_line_and_column() {
        let path = temp_csv("bad.csv", b"x,y,hp\n0,0,1\n0,abc,1\n");
        let err = Dataset::from_csv(&path)
            .unwrap()
            .samples(&spec(&["hp"]))
            .unwrap_err();
        match err {
            GraphError::InvalidNumber { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "y");
                assert_eq!(value, "abc");
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let cases: [(&str, &[u8], &str, &str); 4] = [
            ("nan_x.csv", b"x,y,p\nNaN,0,1\n", "x", "NaN"),
            ("inf_y.csv", b"x,y,p\n0,inf,1\n", "y", "inf"),
            ("nan_p.csv", b"x,y,p\n0,0,nan\n", "p", "nan"),
            ("inf_p.csv", b"x,y,p\n0,0,-infinity\n", "p", "-infinity"),
        ];
        for (name, content, col, raw) in cases.iter() {
            let err = Dataset::from_csv(&temp_csv(name, content))
                .unwrap()
                .samples(&spec(&["p"]))
                .unwrap_err();
            match err {
                GraphError::InvalidNumber { line, column, value, .. } => {
                    assert_eq!(line, 2);
                    assert_eq!(column, *col);
                    assert_eq!(value, *raw);
                }
                e => panic!("unexpected error {}", e),
            }
        }
    }

    #[test]
    fn test_missing_column() {
        let path = temp_csv("nocol.csv", b"x,y\n0,0\n");
        let err = Dataset::from_csv(&path)
            .unwrap()
            .samples(&spec(&["gold"]))
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingColumn { ref column, .. } if column == "gold"));
    }

    #[test]
    fn test_unequal_record_length_is_an_error() {
        let path = temp_csv("ragged.csv", b"x,y\n0,0\n1,2,3\n");
        assert!(matches!(
            Dataset::from_csv(&path),
            Err(GraphError::Csv { .. })
        ));
    }
}
