use std::collections::HashMap;

use crate::geom::CellCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeState {
    Unvisited,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchNode {
    pub(crate) position: CellCoord,
    pub(crate) g: u32,
    pub(crate) h: u32,
    pub(crate) f: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) state: NodeState,
}

impl SearchNode {
    fn new(position: CellCoord) -> Self {
        Self {
            position,
            g: 0,
            h: 0,
            f: 0,
            parent: None,
            state: NodeState::Unvisited,
        }
    }
}

/// Search-scoped node arena. Nodes are created lazily the first time a cell
/// is touched and parents are arena indices, so the whole tree is dropped
/// with the table.
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
    nodes: Vec<SearchNode>,
    ids_by_cell: HashMap<CellCoord, NodeId>,
}

impl NodeTable {
    pub(crate) fn get_or_insert(&mut self, position: CellCoord) -> NodeId {
        if let Some(id) = self.ids_by_cell.get(&position) {
            return *id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new(position));
        self.ids_by_cell.insert(position, id);
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Walks parent links from `from` back to the root, `from` first.
    pub(crate) fn lineage(&self, from: NodeId) -> impl Iterator<Item = &SearchNode> {
        let mut cursor = Some(from);
        std::iter::from_fn(move || {
            let node = self.node(cursor?);
            cursor = node.parent;
            Some(node)
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
