//! JSON level files: a glyph palette plus rows of glyphs, top row first.
//!
//! ```json
//! {
//!   "origin": { "x": 0, "y": 0 },
//!   "palette": {
//!     ".": { "cost_multiplier": 1.0 },
//!     "~": { "cost_multiplier": 3.0 },
//!     "#": { "blocking": true }
//!   },
//!   "rows": [
//!     "#####",
//!     "#..~#",
//!     "#####"
//!   ]
//! }
//! ```
//!
//! A space is a cell with no tile at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::CellCoord;
use crate::grid::TileDescriptor;
use crate::json::from_json_str;
use crate::tilemap::{TileLayer, TileLayerError, TilePalette, EMPTY_TILE_ID};

const EMPTY_GLYPH: char = ' ';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelFile {
    #[serde(default)]
    pub origin: CellCoord,
    pub palette: BTreeMap<String, TileDescriptor>,
    pub rows: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level json invalid at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level has no rows")]
    Empty,
    #[error("palette key {glyph:?} must be exactly one non-space character")]
    InvalidGlyph { glyph: String },
    #[error("palette defines more than {limit} glyphs")]
    TooManyGlyphs { limit: usize },
    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row}, column {column}: glyph {glyph:?} is not in the palette")]
    UnknownGlyph {
        row: usize,
        column: usize,
        glyph: char,
    },
    #[error(transparent)]
    Layer(#[from] TileLayerError),
}

impl LevelFile {
    pub fn parse(raw: &str) -> Result<Self, LevelError> {
        from_json_str(raw).map_err(|failure| LevelError::Parse {
            location: failure.location,
            source: failure.source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let raw = fs::read_to_string(path).map_err(|source| LevelError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn to_tile_layer(&self) -> Result<TileLayer, LevelError> {
        let glyph_ids = self.glyph_ids()?;
        let mut palette = TilePalette::new();
        for (glyph, descriptor) in &self.palette {
            if let Some(tile_id) = glyph_ids.get(&single_glyph(glyph)?) {
                palette.insert(*tile_id, *descriptor);
            }
        }

        let Some(first_row) = self.rows.first() else {
            return Err(LevelError::Empty);
        };
        let width = first_row.chars().count();
        if width == 0 {
            return Err(LevelError::Empty);
        }
        let height = self.rows.len();

        // Rows are authored top-down; the layer stores the bottom row first.
        let mut tiles = vec![EMPTY_TILE_ID; width * height];
        for (row_index, row) in self.rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(LevelError::RaggedRow {
                    row: row_index,
                    expected: width,
                    actual,
                });
            }
            let y = height - 1 - row_index;
            for (column, glyph) in row.chars().enumerate() {
                if glyph == EMPTY_GLYPH {
                    continue;
                }
                let tile_id =
                    glyph_ids
                        .get(&glyph)
                        .copied()
                        .ok_or(LevelError::UnknownGlyph {
                            row: row_index,
                            column,
                            glyph,
                        })?;
                tiles[y * width + column] = tile_id;
            }
        }

        Ok(TileLayer::new(
            width as u32,
            height as u32,
            self.origin,
            tiles,
            palette,
        )?)
    }

    fn glyph_ids(&self) -> Result<BTreeMap<char, u16>, LevelError> {
        let limit = usize::from(u16::MAX) - 1;
        if self.palette.len() > limit {
            return Err(LevelError::TooManyGlyphs { limit });
        }
        let mut ids = BTreeMap::new();
        for (index, glyph) in self.palette.keys().enumerate() {
            ids.insert(single_glyph(glyph)?, index as u16 + 1);
        }
        Ok(ids)
    }
}

fn single_glyph(key: &str) -> Result<char, LevelError> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(glyph), None) if glyph != EMPTY_GLYPH => Ok(glyph),
        _ => Err(LevelError::InvalidGlyph {
            glyph: key.to_string(),
        }),
    }
}
