use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{CellBounds, CellCoord};

/// Upper bound on the number of cells a single grid may index.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Pathfinding properties a tile source reports for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    #[serde(default)]
    pub blocking: bool,
    #[serde(default = "default_cost_multiplier")]
    pub cost_multiplier: f32,
}

fn default_cost_multiplier() -> f32 {
    1.0
}

impl TileDescriptor {
    pub const fn walkable(cost_multiplier: f32) -> Self {
        Self {
            blocking: false,
            cost_multiplier,
        }
    }

    pub const fn blocking() -> Self {
        Self {
            blocking: true,
            cost_multiplier: 1.0,
        }
    }
}

impl Default for TileDescriptor {
    fn default() -> Self {
        Self::walkable(1.0)
    }
}

/// Level data the grid is captured from.
///
/// Cells for which `descriptor` returns `None` carry no pathfinding tile and
/// are treated as absent (untraversable).
pub trait TileSource {
    fn bounds(&self) -> CellBounds;
    fn descriptor(&self, cell: CellCoord) -> Option<TileDescriptor>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    blocking: bool,
    cost_multiplier: f32,
}

impl GridCell {
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn cost_multiplier(&self) -> f32 {
        self.cost_multiplier
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid bounds are empty or inverted: min ({min_x}, {min_y}), max ({max_x}, {max_y})")]
    InvalidBounds {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    },
    #[error("grid bounds {width}x{height} exceed the limit of {limit} cells")]
    BoundsTooLarge { width: i64, height: i64, limit: usize },
    #[error("tile at ({x}, {y}) has invalid cost multiplier {value}")]
    InvalidCostMultiplier { x: i32, y: i32, value: f32 },
}

/// Immutable walkability snapshot, built once and then shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    bounds: CellBounds,
    width: usize,
    cells: Vec<Option<GridCell>>,
    tile_count: usize,
}

impl GridModel {
    pub fn from_source(source: &impl TileSource) -> Result<Self, GridError> {
        Self::build(source.bounds(), source)
    }

    pub fn build(bounds: CellBounds, source: &impl TileSource) -> Result<Self, GridError> {
        if bounds.is_empty() {
            return Err(GridError::InvalidBounds {
                min_x: bounds.min.x,
                min_y: bounds.min.y,
                max_x: bounds.max.x,
                max_y: bounds.max.y,
            });
        }

        let too_large = || GridError::BoundsTooLarge {
            width: bounds.width(),
            height: bounds.height(),
            limit: MAX_GRID_CELLS,
        };
        let width = usize::try_from(bounds.width()).map_err(|_| too_large())?;
        let height = usize::try_from(bounds.height()).map_err(|_| too_large())?;
        let cell_count = width
            .checked_mul(height)
            .filter(|count| *count <= MAX_GRID_CELLS)
            .ok_or_else(too_large)?;

        let mut cells = Vec::with_capacity(cell_count);
        let mut tile_count = 0usize;
        for coord in bounds.cells() {
            let cell = match source.descriptor(coord) {
                Some(descriptor) => {
                    let value = descriptor.cost_multiplier;
                    if !value.is_finite() || value < 0.0 {
                        return Err(GridError::InvalidCostMultiplier {
                            x: coord.x,
                            y: coord.y,
                            value,
                        });
                    }
                    tile_count += 1;
                    Some(GridCell {
                        blocking: descriptor.blocking,
                        cost_multiplier: value,
                    })
                }
                None => None,
            };
            cells.push(cell);
        }

        Ok(Self {
            bounds,
            width,
            cells,
            tile_count,
        })
    }

    pub fn bounds(&self) -> CellBounds {
        self.bounds
    }

    /// Number of cells that carry a pathfinding tile.
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn cell(&self, coord: CellCoord) -> Option<GridCell> {
        self.index_of(coord)
            .and_then(|index| self.cells.get(index))
            .copied()
            .flatten()
    }

    pub fn is_walkable(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(|cell| !cell.blocking)
    }

    /// True only for cells that exist and block; absent cells are not blocking.
    pub fn is_blocking(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(|cell| cell.blocking)
    }

    pub fn cost_multiplier(&self, coord: CellCoord) -> Option<f32> {
        self.cell(coord).map(|cell| cell.cost_multiplier)
    }

    fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if !self.bounds.contains(coord) {
            return None;
        }
        let column = (coord.x - self.bounds.min.x) as usize;
        let row = (coord.y - self.bounds.min.y) as usize;
        Some(row * self.width + column)
    }
}
