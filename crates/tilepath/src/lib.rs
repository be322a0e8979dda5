pub mod cache;
pub mod config;
pub mod follower;
pub mod geom;
pub mod grid;
mod json;
pub mod level;
pub mod metrics;
pub mod path;
pub mod search;
pub mod service;
pub mod tilemap;

pub use cache::PathCache;
pub use config::{ConfigError, PathfinderConfig};
pub use follower::PathFollower;
pub use geom::{CellBounds, CellCoord, Vec2};
pub use grid::{GridCell, GridError, GridModel, TileDescriptor, TileSource, MAX_GRID_CELLS};
pub use level::{LevelError, LevelFile};
pub use metrics::{MetricsHandle, PathfinderStats};
pub use path::Path;
pub use search::{find_path, AStarSearch, SearchStatus, DIAGONAL_COST, ORTHOGONAL_COST};
pub use service::{PathCallback, Pathfinder, PathfinderError, RequesterId};
pub use tilemap::{TileLayer, TileLayerError, TilePalette, EMPTY_TILE_ID};
