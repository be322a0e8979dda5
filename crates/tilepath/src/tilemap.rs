use std::collections::HashMap;

use thiserror::Error;

use crate::geom::{CellBounds, CellCoord, Vec2};
use crate::grid::{TileDescriptor, TileSource};

/// Tile id that marks a cell with no tile at all.
pub const EMPTY_TILE_ID: u16 = 0;

/// Maps tile ids to their pathfinding descriptors.
///
/// Ids missing from the palette are not pathfinding tiles and are skipped
/// when the grid is captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePalette {
    descriptors: HashMap<u16, TileDescriptor>,
}

impl TilePalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile(mut self, tile_id: u16, descriptor: TileDescriptor) -> Self {
        self.insert(tile_id, descriptor);
        self
    }

    pub fn insert(&mut self, tile_id: u16, descriptor: TileDescriptor) {
        if tile_id == EMPTY_TILE_ID {
            return;
        }
        self.descriptors.insert(tile_id, descriptor);
    }

    pub fn descriptor(&self, tile_id: u16) -> Option<TileDescriptor> {
        self.descriptors.get(&tile_id).copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Tile layer origin convention:
/// - `origin` is the cell address of the layer's bottom-left tile.
/// - Tiles are stored row-major, bottom row first.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    width: u32,
    height: u32,
    origin: CellCoord,
    tiles: Vec<u16>,
    palette: TilePalette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileLayerError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

impl TileLayer {
    pub fn new(
        width: u32,
        height: u32,
        origin: CellCoord,
        tiles: Vec<u16>,
        palette: TilePalette,
    ) -> Result<Self, TileLayerError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TileLayerError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tiles,
            palette,
        })
    }

    /// A fully populated layer where every tile uses `tile_id`.
    pub fn filled(width: u32, height: u32, tile_id: u16, palette: TilePalette) -> Self {
        Self {
            width,
            height,
            origin: CellCoord::default(),
            tiles: vec![tile_id; width as usize * height as usize],
            palette,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> CellCoord {
        self.origin
    }

    pub fn palette(&self) -> &TilePalette {
        &self.palette
    }

    pub fn tile_at(&self, cell: CellCoord) -> Option<u16> {
        self.index_of(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Overwrites a tile in place. Only meaningful before the grid is captured.
    pub fn set_tile(&mut self, cell: CellCoord, tile_id: u16) -> bool {
        match self.index_of(cell) {
            Some(index) => {
                self.tiles[index] = tile_id;
                true
            }
            None => false,
        }
    }

    pub fn tile_center_world(&self, cell: CellCoord) -> Option<Vec2> {
        self.index_of(cell)?;
        Some(cell.center_world())
    }

    fn index_of(&self, cell: CellCoord) -> Option<usize> {
        let column = i64::from(cell.x) - i64::from(self.origin.x);
        let row = i64::from(cell.y) - i64::from(self.origin.y);
        if column < 0 || row < 0 || column >= i64::from(self.width) || row >= i64::from(self.height)
        {
            return None;
        }
        Some(row as usize * self.width as usize + column as usize)
    }
}

impl TileSource for TileLayer {
    fn bounds(&self) -> CellBounds {
        // A layer whose far edge overflows reports empty bounds, which grid
        // capture rejects.
        CellBounds::from_size(self.origin, self.width, self.height)
            .unwrap_or(CellBounds::new(self.origin, self.origin))
    }

    fn descriptor(&self, cell: CellCoord) -> Option<TileDescriptor> {
        let tile_id = self.tile_at(cell)?;
        if tile_id == EMPTY_TILE_ID {
            return None;
        }
        self.palette.descriptor(tile_id)
    }
}
