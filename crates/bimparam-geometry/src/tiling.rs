// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint tiling with fixed-size modules
//!
//! Element bounds are projected to the XY plane and rasterized into an
//! occupancy grid. A regular grid of modules is laid over the footprint
//! bounds (plus one extra row and column) and every module whose
//! occupied-cell ratio exceeds the minimum overlap is kept.

use crate::error::{Error, Result};
use bimparam_model::BoundingBox;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Largest occupancy grid, in cells
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Largest module grid, in module positions
pub const MAX_MODULE_POSITIONS: usize = 1 << 20;

/// Product of two counts, failing past `limit`
fn bounded_product(a: usize, b: usize, limit: usize, what: &str) -> Result<usize> {
    a.checked_mul(b).filter(|n| *n <= limit).ok_or_else(|| {
        Error::tiling(format!(
            "{} grid of {} x {} exceeds the limit of {}",
            what, a, b, limit
        ))
    })
}

/// Number of steps of `size` covering `extent`, plus `extra`
fn steps(extent: f64, size: f64, extra: usize, limit: usize, what: &str) -> Result<usize> {
    let n = (extent / size).floor();
    if !n.is_finite() || n < 0.0 || n >= limit as f64 {
        return Err(Error::tiling(format!(
            "{} extent {} is too large for size {}",
            what, extent, size
        )));
    }
    Ok(n as usize + extra)
}

/// Tiling options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingOptions {
    /// Module extent along X in meters (48 ft)
    pub module_length: f64,
    /// Module extent along Y in meters (14 ft)
    pub module_width: f64,
    /// Occupancy grid cell size in meters
    pub cell_size: f64,
    /// Occupied-cell ratio a module must exceed to be kept
    pub min_overlap: f64,
}

impl Default for TilingOptions {
    fn default() -> Self {
        Self {
            module_length: 14.63,
            module_width: 4.267,
            cell_size: 1.0,
            min_overlap: 0.01,
        }
    }
}

impl TilingOptions {
    /// Set the module size
    pub fn with_module(mut self, length: f64, width: f64) -> Self {
        self.module_length = length;
        self.module_width = width;
        self
    }

    /// Set the grid cell size
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Check sizes are positive and the overlap ratio is in `[0, 1)`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("module length", self.module_length),
            ("module width", self.module_width),
            ("cell size", self.cell_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::tiling(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !(0.0..1.0).contains(&self.min_overlap) {
            return Err(Error::tiling(format!(
                "minimum overlap must be in [0, 1), got {}",
                self.min_overlap
            )));
        }
        Ok(())
    }
}

/// Occupancy grid of a building footprint
#[derive(Debug, Clone)]
pub struct FootprintGrid {
    /// Lower-left corner of the footprint
    pub origin: [f64; 2],
    /// Footprint extent along X and Y
    pub extent: [f64; 2],
    pub cell_size: f64,
    /// Cell counts along X and Y
    pub cells: [usize; 2],
    occupied: Vec<bool>,
}

impl FootprintGrid {
    /// Rasterize the XY projection of element bounds
    pub fn from_bounds(footprints: &[BoundingBox], cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Error::tiling("cell size must be positive"));
        }
        let mut iter = footprints.iter().filter(|b| b.is_finite());
        let first = iter
            .next()
            .ok_or_else(|| Error::tiling("footprint has no elements"))?;
        let total = iter.fold(*first, |acc, b| acc.union(b));

        let origin = [total.min[0], total.min[1]];
        let extent = [total.max[0] - total.min[0], total.max[1] - total.min[1]];
        let cells = [
            steps(extent[0], cell_size, 1, MAX_GRID_CELLS, "footprint")?,
            steps(extent[1], cell_size, 1, MAX_GRID_CELLS, "footprint")?,
        ];
        let count = bounded_product(cells[0], cells[1], MAX_GRID_CELLS, "occupancy")?;

        let mut grid = Self {
            origin,
            extent,
            cell_size,
            cells,
            occupied: vec![false; count],
        };
        for b in footprints.iter().filter(|b| b.is_finite()) {
            let (x0, y0) = grid.cell_of(b.min[0], b.min[1]);
            let (x1, y1) = grid.cell_of(b.max[0], b.max[1]);
            for gx in x0..=x1 {
                for gy in y0..=y1 {
                    grid.occupied[gx * cells[1] + gy] = true;
                }
            }
        }
        Ok(grid)
    }

    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let gx = ((x - self.origin[0]) / self.cell_size).max(0.0) as usize;
        let gy = ((y - self.origin[1]) / self.cell_size).max(0.0) as usize;
        (gx.min(self.cells[0] - 1), gy.min(self.cells[1] - 1))
    }

    /// Check if a cell is occupied
    pub fn is_occupied(&self, gx: usize, gy: usize) -> bool {
        gx < self.cells[0] && gy < self.cells[1] && self.occupied[gx * self.cells[1] + gy]
    }

    /// Number of occupied cells
    pub fn occupied_count(&self) -> usize {
        self.occupied.iter().filter(|&&o| o).count()
    }

    /// Ratio of occupied cells among the grid cells a rectangle covers
    pub fn overlap_ratio(&self, x: f64, y: f64, length: f64, width: f64) -> f64 {
        let start_x = ((x - self.origin[0]) / self.cell_size).floor() as i64;
        let start_y = ((y - self.origin[1]) / self.cell_size).floor() as i64;
        let end_x = ((x + length - self.origin[0]) / self.cell_size).floor() as i64;
        let end_y = ((y + width - self.origin[1]) / self.cell_size).floor() as i64;

        let mut occupied = 0usize;
        let mut total = 0usize;
        for gx in start_x.max(0)..=end_x.min(self.cells[0] as i64 - 1) {
            for gy in start_y.max(0)..=end_y.min(self.cells[1] as i64 - 1) {
                total += 1;
                if self.is_occupied(gx as usize, gy as usize) {
                    occupied += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            occupied as f64 / total as f64
        }
    }
}

/// A kept module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePlacement {
    /// Sequential index among kept modules
    pub index: usize,
    /// (column, row) in the module grid
    pub grid_position: (usize, usize),
    /// Lower-left corner in meters
    pub origin: [f64; 2],
    /// Module size (length along X, width along Y)
    pub size: [f64; 2],
    pub overlap_ratio: f64,
}

/// Tile a footprint with modules
///
/// Output is ordered row by row, then column, and is independent of thread
/// scheduling.
pub fn tile_modules(footprints: &[BoundingBox], options: &TilingOptions) -> Result<Vec<ModulePlacement>> {
    options.validate()?;
    let grid = FootprintGrid::from_bounds(footprints, options.cell_size)?;

    let rows = steps(grid.extent[1], options.module_width, 2, MAX_MODULE_POSITIONS, "module")?;
    let cols = steps(grid.extent[0], options.module_length, 2, MAX_MODULE_POSITIONS, "module")?;
    bounded_product(rows, cols, MAX_MODULE_POSITIONS, "module")?;

    let positions: Vec<(usize, usize)> = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (col, row)))
        .collect();

    let kept: Vec<((usize, usize), [f64; 2], f64)> = positions
        .par_iter()
        .filter_map(|&(col, row)| {
            let x = grid.origin[0] + col as f64 * options.module_length;
            let y = grid.origin[1] + row as f64 * options.module_width;
            let ratio = grid.overlap_ratio(x, y, options.module_length, options.module_width);
            (ratio > options.min_overlap).then_some(((col, row), [x, y], ratio))
        })
        .collect();

    log::debug!(
        "Tiled footprint {:.1}m x {:.1}m: kept {} of {} module positions",
        grid.extent[0],
        grid.extent[1],
        kept.len(),
        positions.len()
    );

    Ok(kept
        .into_iter()
        .enumerate()
        .map(|(index, (grid_position, origin, overlap_ratio))| ModulePlacement {
            index,
            grid_position,
            origin,
            size: [options.module_length, options.module_width],
            overlap_ratio,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_rasterizes_boxes() {
        let boxes = [
            BoundingBox::new([0.0, 0.0, 0.0], [0.5, 0.5, 3.0]),
            BoundingBox::new([9.5, 9.5, 0.0], [10.0, 10.0, 3.0]),
        ];
        let grid = FootprintGrid::from_bounds(&boxes, 1.0).unwrap();
        assert_eq!(grid.cells, [11, 11]);
        assert!(grid.is_occupied(0, 0));
        assert!(grid.is_occupied(10, 10));
        assert!(!grid.is_occupied(5, 5));
        assert_eq!(grid.occupied_count(), 5);
    }

    #[test]
    fn test_oversized_footprint_rejected() {
        let boxes = [
            BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 3.0]),
            BoundingBox::new([1e10, 1e10, 0.0], [1e10 + 1.0, 1e10 + 1.0, 3.0]),
        ];
        assert!(matches!(
            FootprintGrid::from_bounds(&boxes, 1.0),
            Err(Error::Tiling(_))
        ));
        assert!(matches!(
            tile_modules(&boxes, &TilingOptions::default()),
            Err(Error::Tiling(_))
        ));

        // long in one direction only: each side fits, the product does not
        let strip = [
            BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 3.0]),
            BoundingBox::new([8000.0, 8000.0, 0.0], [8001.0, 8001.0, 3.0]),
        ];
        assert!(FootprintGrid::from_bounds(&strip, 1.0).is_err());
        assert!(FootprintGrid::from_bounds(&strip, 10.0).is_ok());
    }

    #[test]
    fn test_single_module_footprint() {
        // A footprint smaller than one module is covered by exactly one module
        let boxes = [BoundingBox::new([0.0, 0.0, 0.0], [10.0, 3.0, 0.3])];
        let modules = tile_modules(&boxes, &TilingOptions::default()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].grid_position, (0, 0));
        assert_eq!(modules[0].origin, [0.0, 0.0]);
        assert_relative_eq!(modules[0].overlap_ratio, 1.0);
    }

    #[test]
    fn test_l_shaped_footprint() {
        let options = TilingOptions::default().with_module(10.0, 4.0);
        let boxes = [
            BoundingBox::new([0.0, 0.0, 0.0], [19.5, 3.5, 0.3]),
            BoundingBox::new([0.0, 4.0, 0.0], [9.5, 7.5, 0.3]),
        ];
        let modules = tile_modules(&boxes, &options).unwrap();
        let positions: Vec<(usize, usize)> = modules.iter().map(|m| m.grid_position).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (0, 1)]);
        assert_eq!(modules.iter().map(|m| m.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_options() {
        let boxes = [BoundingBox::new([0.0; 3], [1.0; 3])];
        assert!(tile_modules(&boxes, &TilingOptions::default().with_cell_size(0.0)).is_err());
        assert!(tile_modules(&[], &TilingOptions::default()).is_err());
    }
}
