use crate::geom::{CellCoord, Vec2};
use crate::path::Path;

/// A path being walked by one agent, plus the goal it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFollower {
    path: Path,
    end_goal: Vec2,
}

impl PathFollower {
    pub fn new(path: Path, end_goal: Vec2) -> Self {
        Self { path, end_goal }
    }

    pub fn end_goal(&self) -> Vec2 {
        self.end_goal
    }

    pub fn current_goal(&self) -> Option<Vec2> {
        self.path.peek()
    }

    pub fn advance(&mut self) -> Option<Vec2> {
        self.path.pop();
        self.path.peek()
    }

    pub fn is_finished(&self) -> bool {
        self.path.is_empty()
    }

    pub fn remaining(&self) -> &[Vec2] {
        self.path.waypoints()
    }

    /// Adopts a repath that was requested while this path was being walked.
    ///
    /// The new path was planned from wherever the agent stood when it asked,
    /// so its head may lead back over cells already crossed. When it passes
    /// through the waypoint currently being approached, walking resumes from
    /// there; otherwise the new path is taken from its start.
    pub fn splice(&mut self, mut path: Path, end_goal: Vec2) {
        if let Some(goal) = self.current_goal() {
            let goal_cell = CellCoord::from_world(goal);
            let rejoin = path
                .waypoints()
                .iter()
                .position(|waypoint| CellCoord::from_world(*waypoint) == goal_cell);
            if let Some(index) = rejoin {
                path.skip_to(index);
            }
        }
        self.path = path;
        self.end_goal = end_goal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centers(cells: &[(i32, i32)]) -> Path {
        cells
            .iter()
            .map(|&(x, y)| CellCoord::new(x, y).center_world())
            .collect()
    }

    #[test]
    fn advance_walks_to_completion() {
        let mut follower = PathFollower::new(centers(&[(1, 0), (2, 0)]), Vec2::new(2.5, 0.5));
        assert_eq!(follower.current_goal(), Some(Vec2::new(1.5, 0.5)));
        assert_eq!(follower.advance(), Some(Vec2::new(2.5, 0.5)));
        assert_eq!(follower.advance(), None);
        assert!(follower.is_finished());
    }

    #[test]
    fn splice_resumes_at_current_goal_when_new_path_crosses_it() {
        let mut follower =
            PathFollower::new(centers(&[(2, 0), (3, 0), (4, 0)]), Vec2::new(4.5, 0.5));
        let repath = centers(&[(1, 0), (2, 0), (3, 1), (4, 2)]);

        follower.splice(repath, Vec2::new(4.5, 2.5));

        assert_eq!(follower.current_goal(), Some(Vec2::new(2.5, 0.5)));
        assert_eq!(follower.remaining().len(), 3);
        assert_eq!(follower.end_goal(), Vec2::new(4.5, 2.5));
    }

    #[test]
    fn splice_takes_whole_path_when_it_diverges() {
        let mut follower = PathFollower::new(centers(&[(2, 0), (3, 0)]), Vec2::new(3.5, 0.5));
        follower.splice(centers(&[(0, 1), (0, 2)]), Vec2::new(0.5, 2.5));

        assert_eq!(follower.current_goal(), Some(Vec2::new(0.5, 1.5)));
        assert_eq!(follower.remaining().len(), 2);
    }

    #[test]
    fn splice_into_finished_follower_replaces_path() {
        let mut follower = PathFollower::new(Path::empty(), Vec2::default());
        follower.splice(centers(&[(5, 5)]), Vec2::new(5.5, 5.5));
        assert!(!follower.is_finished());
    }
}
