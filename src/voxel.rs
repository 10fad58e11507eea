use crate::dataset::Dataset;
use crate::error::{GraphError, Result};
use crate::grid::{cell_count, out_of_bounds, tile_index, OutOfBounds};
use tracing::debug;

/// Largest number of voxels a map may hold.
pub const MAX_VOXELS: usize = 1 << 26;

/// Size of the voxel map and the handling of positions outside it.
/// One voxel per unit length along every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelConfig {
    pub width: usize,
    pub length: usize,
    pub depth: usize,
    pub out_of_bounds: OutOfBounds,
}

/// Names of the position columns: `x` and `z` span the floor, `h` the height.
#[derive(Debug, Clone)]
pub struct VoxelColumns {
    pub x: String,
    pub z: String,
    pub h: String,
}

impl Default for VoxelColumns {
    fn default() -> Self {
        VoxelColumns {
            x: "posx".to_string(),
            z: "posz".to_string(),
            h: "posy".to_string(),
        }
    }
}

/// Visit counts per voxel, indexed `[x][z][h]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    width: usize,
    length: usize,
    depth: usize,
    counts: Vec<u32>,
}

impl VoxelGrid {
    pub fn new(width: usize, length: usize, depth: usize) -> VoxelGrid {
        VoxelGrid {
            width,
            length,
            depth,
            counts: vec![0; width * length * depth],
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width, self.length, self.depth)
    }

    fn index(&self, x: usize, z: usize, h: usize) -> usize {
        (x * self.length + z) * self.depth + h
    }

    pub fn get(&self, x: usize, z: usize, h: usize) -> u32 {
        if x < self.width && z < self.length && h < self.depth {
            self.counts[self.index(x, z, h)]
        } else {
            0
        }
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(x, z, h, count)` of every visited voxel, in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, usize, u32)> + '_ {
        let (length, depth) = (self.length, self.depth);
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(move |(i, &c)| (i / (length * depth), (i / depth) % length, i % depth, c))
    }

    /// Counts one visit per record of `dataset`.
    pub fn count_visits(
        dataset: &Dataset,
        columns: &VoxelColumns,
        config: &VoxelConfig,
    ) -> Result<VoxelGrid> {
        if config.width == 0 || config.length == 0 || config.depth == 0 {
            return Err(GraphError::Config(format!(
                "voxel map {}x{}x{} must not be empty",
                config.width, config.length, config.depth
            )));
        }
        let lengths = [config.width, config.length, config.depth].map(|n| n as f64);
        if cell_count(&lengths, MAX_VOXELS).is_none() {
            return Err(GraphError::Config(format!(
                "voxel map {}x{}x{} exceeds the limit of {} voxels",
                config.width, config.length, config.depth, MAX_VOXELS
            )));
        }
        let xi = dataset.column(&columns.x)?;
        let zi = dataset.column(&columns.z)?;
        let hi = dataset.column(&columns.h)?;
        let mut grid = VoxelGrid::new(config.width, config.length, config.depth);
        let shape = vec![config.width, config.length, config.depth];
        let mut dropped = 0;
        for record in dataset.records().iter() {
            let pos = [
                record.required(&columns.x, xi)?,
                record.required(&columns.z, zi)?,
                record.required(&columns.h, hi)?,
            ];
            let mut idx = [0usize; 3];
            let mut keep = true;
            for (axis, (&p, &len)) in pos.iter().zip(shape.iter()).enumerate() {
                match tile_index(p, len, config.out_of_bounds) {
                    Ok(Some(i)) => idx[axis] = i,
                    Ok(None) => keep = false,
                    Err(()) => {
                        return Err(out_of_bounds(&record.origin, pos.to_vec(), shape.clone()));
                    }
                }
            }
            if !keep {
                dropped += 1;
                continue;
            }
            let i = grid.index(idx[0], idx[1], idx[2]);
            grid.counts[i] += 1;
        }
        debug!(
            "counted {} visits into {:?} voxels, {} dropped",
            dataset.len() - dropped,
            grid.shape(),
            dropped
        );
        Ok(grid)
    }
}
