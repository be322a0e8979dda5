use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::geom::{CellCoord, Vec2};
use crate::grid::GridModel;
use crate::path::Path;

use super::nodes::{NodeId, NodeState, NodeTable};

pub const ORTHOGONAL_COST: u32 = 10;
pub const DIAGONAL_COST: u32 = 14;
const HEURISTIC_SCALE: u32 = 10;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 1),
    (1, 0),
    (1, -1),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Pending,
    Found,
    NoPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: u32,
    h: u32,
    order: u64,
    node: NodeId,
}

/// One A* query over a [`GridModel`].
///
/// The search can be driven three ways with identical results: [`run`]
/// finishes it in one call, [`step`] expands exactly one node, and
/// [`run_budgeted`] expands up to a fixed number of nodes before handing
/// control back so the caller can spread the work over several ticks.
///
/// [`run`]: AStarSearch::run
/// [`step`]: AStarSearch::step
/// [`run_budgeted`]: AStarSearch::run_budgeted
#[derive(Debug)]
pub struct AStarSearch<'g> {
    grid: &'g GridModel,
    start: CellCoord,
    end: CellCoord,
    nodes: NodeTable,
    open: BinaryHeap<Reverse<OpenEntry>>,
    next_order: u64,
    status: SearchStatus,
    expanded: u32,
    path: Option<Path>,
    path_cost: Option<u32>,
}

impl<'g> AStarSearch<'g> {
    pub fn new(grid: &'g GridModel, start: CellCoord, end: CellCoord) -> Self {
        let mut search = Self {
            grid,
            start,
            end,
            nodes: NodeTable::default(),
            open: BinaryHeap::new(),
            next_order: 0,
            status: SearchStatus::Pending,
            expanded: 0,
            path: None,
            path_cost: None,
        };

        if start == end {
            search.status = SearchStatus::Found;
            search.path = Some(Path::empty());
            search.path_cost = Some(0);
            return search;
        }

        let root = search.nodes.get_or_insert(start);
        let h = heuristic(start, end);
        let node = search.nodes.node_mut(root);
        node.h = h;
        node.f = h;
        node.state = NodeState::Open;
        search.push_open(root, h, h);
        search
    }

    pub fn from_world(grid: &'g GridModel, start: Vec2, end: Vec2) -> Self {
        Self::new(
            grid,
            CellCoord::from_world(start),
            CellCoord::from_world(end),
        )
    }

    pub fn start(&self) -> CellCoord {
        self.start
    }

    pub fn end(&self) -> CellCoord {
        self.end
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status != SearchStatus::Pending
    }

    /// Nodes moved to the closed set so far.
    pub fn expanded_nodes(&self) -> u32 {
        self.expanded
    }

    pub fn visited_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    pub fn take_path(&mut self) -> Option<Path> {
        self.path.take()
    }

    /// Accumulated cost `g` of the end node once a path was found.
    pub fn path_cost(&self) -> Option<u32> {
        self.path_cost
    }

    pub fn run(&mut self) -> SearchStatus {
        while self.step() == SearchStatus::Pending {}
        self.status
    }

    pub fn run_budgeted(&mut self, max_steps: u32) -> SearchStatus {
        for _ in 0..max_steps.max(1) {
            if self.step() != SearchStatus::Pending {
                break;
            }
        }
        self.status
    }

    pub fn step(&mut self) -> SearchStatus {
        if self.is_finished() {
            return self.status;
        }

        let Some(current) = self.pop_open() else {
            self.status = SearchStatus::NoPath;
            return self.status;
        };

        self.expanded = self.expanded.saturating_add(1);
        let node = self.nodes.node_mut(current);
        node.state = NodeState::Closed;

        if node.position == self.end {
            self.finish_found(current);
            return self.status;
        }

        self.expand(current);
        if self.open.is_empty() {
            self.status = SearchStatus::NoPath;
        }
        self.status
    }

    fn pop_open(&mut self) -> Option<NodeId> {
        while let Some(Reverse(entry)) = self.open.pop() {
            let node = self.nodes.node(entry.node);
            // Entries left behind by a cheaper re-parenting carry a stale f.
            if node.state == NodeState::Open && node.f == entry.f {
                return Some(entry.node);
            }
        }
        None
    }

    fn expand(&mut self, current_id: NodeId) {
        let current = *self.nodes.node(current_id);

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let position = current.position.offset(dx, dy);
            if position == self.start || !self.grid.is_walkable(position) {
                continue;
            }

            let diagonal = dx != 0 && dy != 0;
            if diagonal && self.cuts_corner(current.position, dx, dy) {
                continue;
            }

            let base = if diagonal {
                DIAGONAL_COST
            } else {
                ORTHOGONAL_COST
            };
            let multiplier = self.grid.cost_multiplier(position).unwrap_or(1.0);
            let step_cost = (base as f32 * multiplier).round() as u32;
            let tentative_g = current.g.saturating_add(step_cost);

            let id = self.nodes.get_or_insert(position);
            let node = self.nodes.node_mut(id);
            match node.state {
                NodeState::Closed => continue,
                NodeState::Open if tentative_g >= node.g => continue,
                NodeState::Open | NodeState::Unvisited => {}
            }

            let h = heuristic(position, self.end);
            let f = tentative_g.saturating_add(h);
            node.parent = Some(current_id);
            node.g = tentative_g;
            node.h = h;
            node.f = f;
            node.state = NodeState::Open;
            self.push_open(id, f, h);
        }
    }

    fn cuts_corner(&self, from: CellCoord, dx: i32, dy: i32) -> bool {
        self.grid.is_blocking(from.offset(dx, 0)) || self.grid.is_blocking(from.offset(0, dy))
    }

    fn push_open(&mut self, node: NodeId, f: u32, h: u32) {
        self.open.push(Reverse(OpenEntry {
            f,
            h,
            order: self.next_order,
            node,
        }));
        self.next_order = self.next_order.wrapping_add(1);
    }

    fn finish_found(&mut self, end_id: NodeId) {
        let start = self.start;
        let mut waypoints: Vec<Vec2> = self
            .nodes
            .lineage(end_id)
            .take_while(|node| node.position != start)
            .map(|node| node.position.center_world())
            .collect();
        waypoints.reverse();

        self.path_cost = Some(self.nodes.node(end_id).g);
        self.path = Some(Path::new(waypoints));
        self.status = SearchStatus::Found;
        self.open.clear();
    }
}

fn heuristic(from: CellCoord, to: CellCoord) -> u32 {
    from.manhattan(to).saturating_mul(HEURISTIC_SCALE)
}

/// Runs a complete search and returns the path, if one exists.
pub fn find_path(grid: &GridModel, start: CellCoord, end: CellCoord) -> Option<Path> {
    let mut search = AStarSearch::new(grid, start, end);
    match search.run() {
        SearchStatus::Found => search.take_path(),
        SearchStatus::Pending | SearchStatus::NoPath => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_support::grid_from_rows;

    fn cells(path: &Path) -> Vec<CellCoord> {
        path.waypoints()
            .iter()
            .map(|waypoint| CellCoord::from_world(*waypoint))
            .collect()
    }

    fn open_grid(width: usize, height: usize) -> GridModel {
        let row = ".".repeat(width);
        let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
        grid_from_rows(&rows)
    }

    #[test]
    fn open_five_by_five_takes_the_diagonal() {
        let grid = open_grid(5, 5);
        let mut search = AStarSearch::new(&grid, CellCoord::new(0, 0), CellCoord::new(4, 4));

        assert_eq!(search.run(), SearchStatus::Found);
        assert_eq!(search.path_cost(), Some(56));
        let path = search.take_path().expect("path");
        assert_eq!(
            path.waypoints(),
            &[
                Vec2::new(1.5, 1.5),
                Vec2::new(2.5, 2.5),
                Vec2::new(3.5, 3.5),
                Vec2::new(4.5, 4.5),
            ]
        );
    }

    #[test]
    fn blocked_end_cell_has_no_path() {
        let grid = grid_from_rows(&[
            "....#", //
            ".....",
            ".....",
            ".....",
            ".....",
        ]);
        assert!(find_path(&grid, CellCoord::new(0, 0), CellCoord::new(4, 4)).is_none());
    }

    #[test]
    fn absent_end_cell_has_no_path() {
        let grid = open_grid(3, 3);
        let mut search = AStarSearch::new(&grid, CellCoord::new(0, 0), CellCoord::new(7, 7));
        assert_eq!(search.run(), SearchStatus::NoPath);
        assert_eq!(search.expanded_nodes(), 9);
    }

    #[test]
    fn open_grid_waypoint_count_is_chebyshev_distance() {
        let grid = open_grid(10, 10);
        let pairs = [
            ((0, 0), (4, 4)),
            ((0, 0), (6, 2)),
            ((2, 5), (9, 1)),
            ((9, 9), (0, 9)),
            ((3, 0), (3, 8)),
        ];
        for ((sx, sy), (ex, ey)) in pairs {
            let start = CellCoord::new(sx, sy);
            let end = CellCoord::new(ex, ey);
            let path = find_path(&grid, start, end).expect("path on open grid");
            assert_eq!(
                path.len() as u32,
                start.chebyshev(end),
                "{start:?} -> {end:?}"
            );
        }
    }

    #[test]
    fn open_grid_cost_approximates_straight_line() {
        let grid = open_grid(10, 10);
        let mut search = AStarSearch::new(&grid, CellCoord::new(0, 0), CellCoord::new(6, 2));
        search.run();

        // 2 diagonal + 4 orthogonal steps.
        assert_eq!(search.path_cost(), Some(2 * DIAGONAL_COST + 4 * ORTHOGONAL_COST));
        let straight = (6.0f32 * 6.0 + 2.0 * 2.0).sqrt() * ORTHOGONAL_COST as f32;
        let cost = search.path_cost().expect("cost") as f32;
        assert!((cost - straight).abs() / straight < 0.1);
    }

    #[test]
    fn diagonal_is_refused_when_one_corner_blocks() {
        let grid = grid_from_rows(&[
            "..", //
            ".#",
        ]);
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1)).expect("detour");
        assert_eq!(cells(&path), vec![CellCoord::new(0, 1), CellCoord::new(1, 1)]);
    }

    #[test]
    fn diagonal_is_refused_when_both_corners_block() {
        let grid = grid_from_rows(&[
            "#.", //
            ".#",
        ]);
        assert!(find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1)).is_none());
    }

    #[test]
    fn both_corners_blocked_forces_longer_route() {
        let grid = grid_from_rows(&[
            "...", //
            "#..",
            ".#.",
        ]);
        let start = CellCoord::new(0, 0);
        let end = CellCoord::new(1, 1);
        assert!(find_path(&grid, start, end).is_none());

        let grid = grid_from_rows(&[
            "...", //
            "...",
            ".#.",
            "..#",
            "...",
        ]);
        let start = CellCoord::new(1, 1);
        let end = CellCoord::new(2, 2);
        let path = find_path(&grid, start, end).expect("detour");
        let route = cells(&path);
        assert!(route.len() > 1);
        assert_ne!(route[0], end);
        let walked: Vec<CellCoord> = std::iter::once(start).chain(route).collect();
        for pair in walked.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let diagonal = from.x != to.x && from.y != to.y;
            if diagonal {
                assert!(!grid.is_blocking(CellCoord::new(to.x, from.y)));
                assert!(!grid.is_blocking(CellCoord::new(from.x, to.y)));
            }
        }
    }

    #[test]
    fn absent_corner_cells_do_not_block_diagonals() {
        let grid = grid_from_rows(&[
            " .", //
            ". ",
        ]);
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1)).expect("path");
        assert_eq!(cells(&path), vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn expensive_cells_are_avoided_when_a_cheap_route_exists() {
        let grid = grid_from_rows(&[
            ".....", //
            ".~~~.",
            ".....",
        ]);
        let path = find_path(&grid, CellCoord::new(0, 1), CellCoord::new(4, 1)).expect("path");
        for cell in cells(&path) {
            assert!(
                !(cell.y == 1 && (1..=3).contains(&cell.x)),
                "path crossed swamp at {cell:?}"
            );
        }
    }

    #[test]
    fn walls_are_routed_around() {
        let grid = grid_from_rows(&[
            ".......", //
            "...#...",
            "...#...",
            "...#...",
            "...#...",
        ]);
        let path = find_path(&grid, CellCoord::new(1, 2), CellCoord::new(5, 2)).expect("path");
        let route = cells(&path);
        assert_eq!(route.last(), Some(&CellCoord::new(5, 2)));
        assert!(route.iter().all(|cell| grid.is_walkable(*cell)));
        assert!(route.contains(&CellCoord::new(3, 4)));
    }

    #[test]
    fn start_equal_to_end_is_an_empty_path() {
        let grid = open_grid(2, 2);
        let mut search = AStarSearch::new(&grid, CellCoord::new(1, 1), CellCoord::new(1, 1));
        assert_eq!(search.status(), SearchStatus::Found);
        assert!(search.take_path().expect("path").is_empty());
    }

    #[test]
    fn start_cell_without_tile_still_searches() {
        let grid = grid_from_rows(&[
            "...", //
            " ..",
        ]);
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 1)).expect("path");
        assert_eq!(path.destination(), Some(Vec2::new(2.5, 1.5)));
    }

    #[test]
    fn execution_modes_agree() {
        let grid = grid_from_rows(&[
            "..........", //
            ".####.....",
            "....#..~~.",
            ".#..#..~~.",
            ".#.....#..",
            ".######...",
        ]);
        let start = CellCoord::new(0, 0);
        let end = CellCoord::new(9, 5);

        let mut full = AStarSearch::new(&grid, start, end);
        full.run();

        let mut stepped = AStarSearch::new(&grid, start, end);
        let mut steps = 0u32;
        while stepped.step() == SearchStatus::Pending {
            steps += 1;
        }

        let mut budgeted = AStarSearch::new(&grid, start, end);
        let mut slices = 0u32;
        while budgeted.run_budgeted(3) == SearchStatus::Pending {
            slices += 1;
        }

        assert_eq!(full.status(), SearchStatus::Found);
        assert_eq!(stepped.status(), full.status());
        assert_eq!(budgeted.status(), full.status());
        assert_eq!(stepped.path(), full.path());
        assert_eq!(budgeted.path(), full.path());
        assert_eq!(stepped.path_cost(), full.path_cost());
        assert_eq!(budgeted.expanded_nodes(), full.expanded_nodes());
        assert!(steps > 1);
        assert!(slices >= steps / 3);
    }

    #[test]
    fn finished_search_ignores_further_steps() {
        let grid = open_grid(3, 1);
        let mut search = AStarSearch::new(&grid, CellCoord::new(0, 0), CellCoord::new(2, 0));
        search.run();
        let expanded = search.expanded_nodes();

        assert_eq!(search.step(), SearchStatus::Found);
        assert_eq!(search.run_budgeted(10), SearchStatus::Found);
        assert_eq!(search.expanded_nodes(), expanded);
    }

    #[test]
    fn world_positions_are_floored_into_cells() {
        let grid = open_grid(4, 4);
        let search = AStarSearch::from_world(&grid, Vec2::new(0.9, 0.2), Vec2::new(3.99, 2.5));
        assert_eq!(search.start(), CellCoord::new(0, 0));
        assert_eq!(search.end(), CellCoord::new(3, 2));
    }
}
