//! Dense node numbering for task ids.
//!
//! A [`Subgraph`](crate::subgraph::Subgraph) numbers its tasks 0..n in the
//! order they were given, so effort, start weeks and paths live in plain
//! vectors indexed by [`NodeId`]. Ids are turned back into strings only when
//! results are reported.

use rustc_hash::FxHashMap;

/// Position of a task inside one subgraph.
pub type NodeId = u32;

/// Task id <-> node number, numbered in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct NodeInterner {
    numbers: FxHashMap<String, NodeId>,
    ids: Vec<String>,
}

impl NodeInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            numbers: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Number for `s`, assigning the next free one on first sight.
    pub fn intern(&mut self, s: &str) -> NodeId {
        if let Some(&node) = self.numbers.get(s) {
            return node;
        }
        let node = self.ids.len() as NodeId;
        self.ids.push(s.to_string());
        self.numbers.insert(s.to_string(), node);
        node
    }

    #[inline]
    pub fn get(&self, s: &str) -> Option<NodeId> {
        self.numbers.get(s).copied()
    }

    #[inline]
    pub fn resolve(&self, node: NodeId) -> Option<&str> {
        self.ids.get(node as usize).map(String::as_str)
    }

    /// Ids of a node sequence, e.g. one critical path.
    pub fn resolve_all(&self, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|&node| self.resolve(node))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
