//! Tile aggregation of sampled positions into a 2D grid.
//!
//! A map of `width x height` units is cut into square tiles of side `1/scale`.
//! Every sample lands in the tile `(round(scale*y), round(scale*x))`, rounding
//! halves away from zero, and its contribution is folded into that tile's value
//! through a [`Combine`] strategy. Folded values are clamped to `[0, cap]`.

use crate::dataset::{Origin, Sample};
use crate::error::{GraphError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Display value of never visited tiles, relative to the cap.
pub const UNVISITED_DISPLAY_FACTOR: f64 = 1.25;

/// Largest number of tiles a grid may hold.
pub const MAX_CELLS: usize = 1 << 24;

/// Value used to paint unvisited tiles: above the cap, so it never collides
/// with an aggregated value.
pub fn unvisited_display_value(cap: f64) -> f64 {
    UNVISITED_DISPLAY_FACTOR * cap
}

/// What to do when a sample lacks a value for a selected property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValues {
    Fail,
    /// the missing value contributes 0
    Skip,
}

impl Default for MissingValues {
    fn default() -> Self {
        MissingValues::Fail
    }
}

/// What to do with a sample whose tile falls outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBounds {
    Fail,
    Drop,
    /// move the tile to the nearest edge
    Clamp,
}

impl Default for OutOfBounds {
    fn default() -> Self {
        OutOfBounds::Fail
    }
}

impl FromStr for OutOfBounds {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(OutOfBounds::Fail),
            "drop" => Ok(OutOfBounds::Drop),
            "clamp" => Ok(OutOfBounds::Clamp),
            _ => Err(GraphError::Config(format!(
                "unknown out-of-bounds policy '{}', expected fail, drop or clamp",
                s
            ))),
        }
    }
}

/// Maps a scaled coordinate to a tile index along an axis of `len` tiles.
/// `Ok(None)` means the sample is dropped, `Err` that it is out of bounds.
pub(crate) fn tile_index(
    scaled: f64,
    len: usize,
    policy: OutOfBounds,
) -> std::result::Result<Option<usize>, ()> {
    let i = scaled.round();
    if i >= 0. && i < len as f64 {
        return Ok(Some(i as usize));
    }
    match policy {
        OutOfBounds::Fail => Err(()),
        OutOfBounds::Drop => Ok(None),
        OutOfBounds::Clamp => Ok(Some(if i < 0. { 0 } else { len - 1 })),
    }
}

/// Number of cells of a grid with the given axis lengths, `None` when it
/// exceeds `max`.
pub(crate) fn cell_count(lengths: &[f64], max: usize) -> Option<usize> {
    lengths.iter().try_fold(1usize, |acc, &len| {
        if len.is_nan() || len > max as f64 {
            return None;
        }
        acc.checked_mul(len as usize).filter(|&n| n <= max)
    })
}

pub(crate) fn out_of_bounds(origin: &Origin, position: Vec<f64>, shape: Vec<usize>) -> GraphError {
    GraphError::OutOfBounds {
        path: origin.path.to_path_buf(),
        line: origin.line,
        index: position.iter().map(|p| p.round() as i64).collect(),
        position,
        shape,
    }
}

/// Parameters of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    /// maximum value of any tile
    pub cap: f64,
    /// subtracted from every contribution, so `floor` maps to 0
    pub floor: f64,
    pub missing: MissingValues,
    pub out_of_bounds: OutOfBounds,
}

impl GridConfig {
    pub fn new(width: f64, height: f64) -> GridConfig {
        GridConfig {
            width,
            height,
            scale: 1.,
            cap: 100.,
            floor: 0.,
            missing: MissingValues::default(),
            out_of_bounds: OutOfBounds::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("scale", self.scale),
            ("maximum value", self.cap),
        ];
        for (name, v) in positive.iter() {
            if !v.is_finite() || *v <= 0. {
                return Err(GraphError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, v
                )));
            }
        }
        if !self.floor.is_finite() {
            return Err(GraphError::Config(format!(
                "minimum value must be finite, got {}",
                self.floor
            )));
        }
        let rows = (self.scale * self.height).ceil();
        let cols = (self.scale * self.width).ceil();
        if cell_count(&[rows, cols], MAX_CELLS).is_none() {
            return Err(GraphError::Config(format!(
                "a {}x{} grid exceeds the limit of {} tiles, reduce the size or the scale",
                rows, cols, MAX_CELLS
            )));
        }
        Ok(())
    }

    /// (rows, cols) = (ceil(scale*height), ceil(scale*width))
    pub fn shape(&self) -> (usize, usize) {
        (
            (self.scale * self.height).ceil() as usize,
            (self.scale * self.width).ceil() as usize,
        )
    }
}

/// Folds a sample's contribution into the current value of its tile.
/// `current` is `None` while the tile has not been visited.
pub trait Combine {
    fn combine(&self, current: Option<f64>, contribution: f64) -> f64;
}

impl<F> Combine for F
where
    F: Fn(Option<f64>, f64) -> f64,
{
    fn combine(&self, current: Option<f64>, contribution: f64) -> f64 {
        self(current, contribution)
    }
}

/// The combine strategies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// counts visits, ignoring the contribution
    VisitCount,
    /// keeps the largest contribution
    MaxSum,
    /// first visit sets the contribution, later visits add one
    CappedIncrement,
}

impl Reducer {
    /// Visit counting when nothing is selected, max-sum otherwise.
    pub fn default_for(selected: &[String]) -> Reducer {
        if selected.is_empty() {
            Reducer::VisitCount
        } else {
            Reducer::MaxSum
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reducer::VisitCount => "visit-count",
            Reducer::MaxSum => "max-sum",
            Reducer::CappedIncrement => "capped-increment",
        }
    }
}

impl Combine for Reducer {
    fn combine(&self, current: Option<f64>, contribution: f64) -> f64 {
        match self {
            Reducer::VisitCount => current.unwrap_or(0.) + 1.,
            Reducer::MaxSum => current.unwrap_or(0.).max(contribution),
            Reducer::CappedIncrement => match current {
                None => contribution,
                Some(v) => v + 1.,
            },
        }
    }
}

impl FromStr for Reducer {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "visit-count" => Ok(Reducer::VisitCount),
            "max-sum" => Ok(Reducer::MaxSum),
            "capped-increment" => Ok(Reducer::CappedIncrement),
            _ => Err(GraphError::Config(format!(
                "unknown reducer '{}', expected visit-count, max-sum or capped-increment",
                s
            ))),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregated tiles in row-major order, `None` for tiles never visited.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<f64>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Grid {
        Grid {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col]
        } else {
            None
        }
    }

    /// number of tiles holding a value
    pub fn visited(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Iterates `(row, col, value)` over every tile.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / cols, i % cols, v))
    }

    /// Gives every unvisited tile the value `display`. Applying it again is a no-op.
    pub fn fill_unvisited(&mut self, display: f64) {
        for c in self.cells.iter_mut().filter(|c| c.is_none()) {
            *c = Some(display);
        }
    }

    fn fold<C: Combine + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        contribution: f64,
        combine: &C,
        cap: f64,
    ) {
        let i = row * self.cols + col;
        let v = combine.combine(self.cells[i], contribution);
        self.cells[i] = Some(v.max(0.).min(cap));
    }
}

/// Sum of the selected properties of `sample`, minus `floor`.
fn contribution(
    sample: &Sample,
    selected: &[String],
    floor: f64,
    missing: MissingValues,
) -> Result<f64> {
    let mut sum = -floor;
    for name in selected.iter() {
        match (sample.properties.get(name), missing) {
            (Some(v), _) => sum += v,
            (None, MissingValues::Skip) => {}
            (None, MissingValues::Fail) => {
                return Err(GraphError::MissingValue {
                    path: sample.origin.path.to_path_buf(),
                    line: sample.origin.line,
                    column: name.clone(),
                })
            }
        }
    }
    Ok(sum)
}

/// Folds `samples`, in order, into a fresh `ceil(scale*height) x ceil(scale*width)` grid.
pub fn aggregate<C: Combine + ?Sized>(
    samples: &[Sample],
    selected: &[String],
    config: &GridConfig,
    combine: &C,
) -> Result<Grid> {
    config.validate()?;
    let (rows, cols) = config.shape();
    let mut grid = Grid::new(rows, cols);
    let mut dropped = 0;
    for sample in samples.iter() {
        let (x, y) = sample.position;
        let sx = config.scale * x;
        let sy = config.scale * y;
        let fail = |()| out_of_bounds(&sample.origin, vec![sy, sx], vec![rows, cols]);
        let row = tile_index(sy, rows, config.out_of_bounds).map_err(fail)?;
        let col = tile_index(sx, cols, config.out_of_bounds).map_err(fail)?;
        let (row, col) = match (row, col) {
            (Some(r), Some(c)) => (r, c),
            _ => {
                debug!(
                    "dropped sample at ({}, {}) from {}, line {}",
                    x,
                    y,
                    sample.origin.path.display(),
                    sample.origin.line
                );
                dropped += 1;
                continue;
            }
        };
        let c = contribution(sample, selected, config.floor, config.missing)?;
        grid.fold(row, col, c, combine, config.cap);
    }
    debug!(
        "aggregated {} samples into {}x{} tiles, {} visited, {} dropped",
        samples.len(),
        rows,
        cols,
        grid.visited(),
        dropped
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    fn sample(x: f64, y: f64, props: &[(&str, f64)]) -> Sample {
        Sample {
            position: (x, y),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            origin: Origin {
                path: Arc::from(Path::new("trace.csv")),
                line: 2,
            },
        }
    }

    fn example() -> Vec<Sample> {
        vec![
            sample(0., 0., &[("p", 3.)]),
            sample(0., 0., &[("p", 4.)]),
            sample(1., 0., &[("p", 10.)]),
        ]
    }

    fn p() -> Vec<String> {
        vec!["p".to_string()]
    }

    #[test]
    fn test_shape_is_ceiled() {
        let mut config = GridConfig::new(10., 7.);
        config.scale = 0.5;
        let grid = aggregate(&[], &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (4, 5));
        assert_eq!(grid.visited(), 0);
    }

    #[test]
    fn test_visit_count_example() {
        let config = GridConfig::new(3., 2.);
        let grid = aggregate(&example(), &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.get(0, 0), Some(2.));
        assert_eq!(grid.get(0, 1), Some(1.));
        assert_eq!(grid.visited(), 2);
        assert_eq!(grid.get(1, 2), None);
    }

    #[test]
    fn test_max_sum_example() {
        let config = GridConfig::new(3., 2.);
        let grid = aggregate(&example(), &p(), &config, &Reducer::MaxSum).unwrap();
        assert_eq!(grid.get(0, 0), Some(4.));
        assert_eq!(grid.get(0, 1), Some(10.));
    }

    #[test]
    fn test_capped_increment_counts_collisions() {
        let samples = vec![
            sample(0., 0., &[("p", 7.)]),
            sample(0., 0., &[("p", 50.)]),
            sample(0., 0., &[("p", 50.)]),
        ];
        let config = GridConfig::new(2., 2.);
        let grid = aggregate(&samples, &p(), &config, &Reducer::CappedIncrement).unwrap();
        assert_eq!(grid.get(0, 0), Some(9.));
    }

    #[test]
    fn test_cap_is_exact() {
        let mut config = GridConfig::new(2., 2.);
        config.cap = 5.;
        let grid = aggregate(&example(), &p(), &config, &Reducer::MaxSum).unwrap();
        assert_eq!(grid.get(0, 0), Some(4.));
        assert_eq!(grid.get(0, 1), Some(5.));

        let many: Vec<Sample> = (0..20).map(|_| sample(1., 1., &[])).collect();
        let grid = aggregate(&many, &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.get(1, 1), Some(5.));
    }

    #[test]
    fn test_floor_offsets_contribution() {
        let mut config = GridConfig::new(2., 2.);
        config.floor = 2.;
        let grid = aggregate(&example(), &p(), &config, &Reducer::MaxSum).unwrap();
        assert_eq!(grid.get(0, 0), Some(2.));
        assert_eq!(grid.get(0, 1), Some(8.));
    }

    #[test]
    fn test_negative_results_clamp_to_zero() {
        let samples = vec![sample(0., 0., &[("p", -3.)])];
        let config = GridConfig::new(1., 1.);
        let grid = aggregate(&samples, &p(), &config, &Reducer::CappedIncrement).unwrap();
        assert_eq!(grid.get(0, 0), Some(0.));
    }

    #[test]
    fn test_rounding_halves_away_from_zero() {
        let samples = vec![
            sample(0.5, 0., &[]),
            sample(1.5, 0., &[]),
            sample(2.5, 0., &[]),
            sample(-0.4, 0., &[]),
        ];
        let config = GridConfig::new(4., 1.);
        let grid = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.get(0, 0), Some(1.));
        assert_eq!(grid.get(0, 1), Some(1.));
        assert_eq!(grid.get(0, 2), Some(1.));
        assert_eq!(grid.get(0, 3), Some(1.));
    }

    #[test]
    fn test_scale_one_keeps_integer_positions_apart() {
        let samples: Vec<Sample> = (0..4)
            .flat_map(|y| (0..4).map(move |x| sample(x as f64, y as f64, &[])))
            .collect();
        let config = GridConfig::new(4., 4.);
        let grid = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap();
        assert!(grid.iter().all(|(_, _, v)| v == Some(1.)));
    }

    #[test]
    fn test_half_scale_merges_two_by_two() {
        // scaled coordinates 0.5 and 1.0 both round to tile 1
        let samples = vec![
            sample(1., 1., &[]),
            sample(2., 1., &[]),
            sample(1., 2., &[]),
            sample(2., 2., &[]),
        ];
        let mut config = GridConfig::new(6., 6.);
        config.scale = 0.5;
        let grid = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.get(1, 1), Some(4.));
        assert_eq!(grid.visited(), 1);
    }

    #[test]
    fn test_deterministic() {
        let config = GridConfig::new(3., 2.);
        let a = aggregate(&example(), &p(), &config, &Reducer::MaxSum).unwrap();
        let b = aggregate(&example(), &p(), &config, &Reducer::MaxSum).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_unvisited_is_idempotent() {
        let config = GridConfig::new(3., 2.);
        let mut grid = aggregate(&example(), &[], &config, &Reducer::VisitCount).unwrap();
        let display = unvisited_display_value(config.cap);
        grid.fill_unvisited(display);
        let once = grid.clone();
        grid.fill_unvisited(display);
        assert_eq!(grid, once);
        assert_eq!(grid.get(1, 2), Some(125.));
        assert_eq!(grid.get(0, 0), Some(2.));
    }

    #[test]
    fn test_missing_value_policy() {
        let samples = vec![sample(0., 0., &[("p", 3.)]), sample(1., 0., &[])];
        let mut config = GridConfig::new(2., 1.);
        let err = aggregate(&samples, &p(), &config, &Reducer::MaxSum).unwrap_err();
        assert!(matches!(err, GraphError::MissingValue { ref column, .. } if column == "p"));

        config.missing = MissingValues::Skip;
        let grid = aggregate(&samples, &p(), &config, &Reducer::MaxSum).unwrap();
        assert_eq!(grid.get(0, 1), Some(0.));
    }

    #[test]
    fn test_out_of_bounds_policies() {
        let samples = vec![sample(0., 0., &[]), sample(5., -1., &[])];
        let mut config = GridConfig::new(2., 2.);
        let err = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap_err();
        match err {
            GraphError::OutOfBounds { index, position, shape, .. } => {
                assert_eq!(index, vec![-1, 5]);
                assert_eq!(position, vec![-1., 5.]);
                assert_eq!(shape, vec![2, 2]);
            }
            e => panic!("unexpected error {}", e),
        }

        config.out_of_bounds = OutOfBounds::Drop;
        let grid = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.visited(), 1);

        config.out_of_bounds = OutOfBounds::Clamp;
        let grid = aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap();
        assert_eq!(grid.get(0, 1), Some(1.));
    }

    #[test]
    fn test_closure_combine() {
        let config = GridConfig::new(3., 2.);
        let sum = |cur: Option<f64>, c: f64| cur.unwrap_or(0.) + c;
        let grid = aggregate(&example(), &p(), &config, &sum).unwrap();
        assert_eq!(grid.get(0, 0), Some(7.));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = GridConfig::new(3., 2.);
        config.scale = 0.;
        assert!(matches!(config.validate(), Err(GraphError::Config(_))));
        let mut config = GridConfig::new(3., 2.);
        config.cap = -1.;
        assert!(aggregate(&example(), &[], &config, &Reducer::VisitCount).is_err());
    }

    #[test]
    fn test_oversized_grid_is_a_config_error() {
        let huge = GridConfig::new(1e300, 1e300);
        assert!(matches!(huge.validate(), Err(GraphError::Config(_))));
        assert!(matches!(
            aggregate(&[], &[], &huge, &Reducer::VisitCount),
            Err(GraphError::Config(_))
        ));

        let mut wide = GridConfig::new(8192., 8192.);
        assert!(wide.validate().is_err());
        wide.scale = 0.5;
        assert!(wide.validate().is_ok());
        assert_eq!(wide.shape(), (4096, 4096));
    }

    #[test]
    fn test_cell_count_limit() {
        assert_eq!(cell_count(&[4., 5.], 20), Some(20));
        assert_eq!(cell_count(&[4., 6.], 20), None);
        assert_eq!(cell_count(&[1e300, 1.], usize::MAX), None);
        assert_eq!(cell_count(&[3., 2., 2.], 100), Some(12));
    }

    #[test]
    fn test_far_position_reports_scaled_coordinates() {
        let samples = vec![sample(1e30, 0., &[])];
        let mut config = GridConfig::new(4., 2.);
        config.scale = 2.;
        match aggregate(&samples, &[], &config, &Reducer::VisitCount).unwrap_err() {
            GraphError::OutOfBounds { position, index, .. } => {
                assert_eq!(position, vec![0., 2e30]);
                assert_eq!(index, vec![0, i64::MAX]);
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_reducer_names() {
        assert_eq!("max-sum".parse::<Reducer>().unwrap(), Reducer::MaxSum);
        assert!("median".parse::<Reducer>().is_err());
        assert_eq!(Reducer::default_for(&[]), Reducer::VisitCount);
        assert_eq!(Reducer::default_for(&p()), Reducer::MaxSum);
    }
}
