use std::collections::HashMap;

use crate::geom::CellCoord;
use crate::path::Path;

pub type PathKey = (CellCoord, CellCoord);

/// Bounded `(start cell, end cell) -> Path` store with round-robin eviction.
#[derive(Debug, Default)]
pub struct PathCache {
    capacity: usize,
    entries: HashMap<PathKey, Path>,
    slots: Vec<PathKey>,
    next_victim: usize,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            next_victim: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn try_get(&self, start: CellCoord, end: CellCoord) -> Option<Path> {
        self.entries.get(&(start, end)).map(Path::rewound)
    }

    pub fn contains(&self, start: CellCoord, end: CellCoord) -> bool {
        self.entries.contains_key(&(start, end))
    }

    // Existing keys are left untouched.
    pub fn insert(&mut self, start: CellCoord, end: CellCoord, path: Path) -> Option<PathKey> {
        let key = (start, end);
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return None;
        }

        let path = path.rewound();
        if self.slots.len() < self.capacity {
            self.slots.push(key);
            self.entries.insert(key, path);
            return None;
        }

        let slot = self.next_victim;
        self.next_victim = (self.next_victim + 1) % self.capacity;
        let evicted = std::mem::replace(&mut self.slots[slot], key);
        self.entries.remove(&evicted);
        self.entries.insert(key, path);
        Some(evicted)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.next_victim = 0;
    }
}
