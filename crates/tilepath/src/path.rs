use std::sync::Arc;

use crate::geom::Vec2;

/// Waypoints from the cell next to the start through the end cell.
///
/// Consumed from the top like a stack: `pop` yields the waypoint nearest the
/// start first. Clones share the waypoint storage but keep their own cursor,
/// so draining a delivered path never disturbs the cached copy.
#[derive(Debug, Clone)]
pub struct Path {
    waypoints: Arc<[Vec2]>,
    next: usize,
}

impl Path {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints: waypoints.into(),
            next: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn peek(&self) -> Option<Vec2> {
        self.waypoints.get(self.next).copied()
    }

    pub fn pop(&mut self) -> Option<Vec2> {
        let waypoint = self.peek()?;
        self.next += 1;
        Some(waypoint)
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints[self.next..]
    }

    pub fn len(&self) -> usize {
        self.waypoints.len() - self.next
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }

    pub fn rewound(&self) -> Self {
        Self {
            waypoints: Arc::clone(&self.waypoints),
            next: 0,
        }
    }

    pub(crate) fn skip_to(&mut self, index: usize) {
        self.next = index.min(self.waypoints.len());
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.waypoints() == other.waypoints()
    }
}

impl FromIterator<Vec2> for Path {
    fn from_iter<I: IntoIterator<Item = Vec2>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
