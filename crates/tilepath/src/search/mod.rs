mod astar;
mod nodes;

pub use astar::{find_path, AStarSearch, SearchStatus, DIAGONAL_COST, ORTHOGONAL_COST};
