use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Integer address of one grid square.
///
/// World space maps onto cells by flooring each axis independently, so the
/// cell `(x, y)` covers `[x, x + 1) x [y, y + 1)` and its centre sits at
/// `(x + 0.5, y + 0.5)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_world(world: Vec2) -> Self {
        Self {
            x: world.x.floor() as i32,
            y: world.y.floor() as i32,
        }
    }

    pub fn center_world(self) -> Vec2 {
        Vec2 {
            x: self.x as f32 + 0.5,
            y: self.y as f32 + 0.5,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub fn manhattan(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    pub fn chebyshev(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// Half-open rectangle of cells: `min` is inclusive, `max` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellBounds {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellBounds {
    pub const fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    /// `None` when the far corner does not fit in `i32`.
    pub fn from_size(origin: CellCoord, width: u32, height: u32) -> Option<Self> {
        let max_x = i32::try_from(width).ok().and_then(|w| origin.x.checked_add(w))?;
        let max_y = i32::try_from(height).ok().and_then(|h| origin.y.checked_add(h))?;
        Some(Self {
            min: origin,
            max: CellCoord::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> i64 {
        i64::from(self.max.x) - i64::from(self.min.x)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max.y) - i64::from(self.min.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x < self.max.x && cell.y >= self.min.y && cell.y < self.max.y
    }

    /// Row-major walk over every cell, bottom row first.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let bounds = *self;
        (bounds.min.y..bounds.max.y)
            .flat_map(move |y| (bounds.min.x..bounds.max.x).map(move |x| CellCoord { x, y }))
    }
}
