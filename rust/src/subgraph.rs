//! Index-based view of a task subset shared by the analyses.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::{DfsPostOrder, EdgeFiltered, EdgeRef};
use rustc_hash::FxHashSet;

use crate::interner::{NodeId, NodeInterner};
use crate::models::Task;

/// Pre-computed data for a set of tasks, addressed by dense node index.
///
/// Only links whose both ends are inside the set are kept, so a subset cut
/// out of a larger graph behaves as a closed graph of its own. A link named
/// on either side (`a.successors` or `b.predecessors`) appears in both
/// `succs[a]` and `preds[b]`.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    /// Task id string <-> node index mapping.
    pub index: NodeInterner,
    /// T per node.
    pub durations: Vec<f64>,
    /// P per node.
    pub headcounts: Vec<f64>,
    /// MM per node.
    pub efforts: Vec<f64>,
    /// In-set predecessors per node, deduplicated.
    pub preds: Vec<Vec<NodeId>>,
    /// In-set successors per node, deduplicated.
    pub succs: Vec<Vec<NodeId>>,
}

impl Subgraph {
    /// Build from tasks. If an id appears twice the first task wins.
    pub fn new<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let mut index = NodeInterner::with_capacity(tasks.len());
        let mut members: Vec<&Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if index.get(&task.id).is_none() {
                index.intern(&task.id);
                members.push(task);
            }
        }

        let n = members.len();
        let mut durations = Vec::with_capacity(n);
        let mut headcounts = Vec::with_capacity(n);
        let mut efforts = Vec::with_capacity(n);
        let mut preds: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut succs: Vec<Vec<NodeId>> = vec![Vec::new(); n];

        for (idx, task) in members.iter().enumerate() {
            durations.push(task.duration_weeks);
            headcounts.push(task.headcount);
            efforts.push(task.effort);
            preds[idx] = in_set(&index, &task.predecessors);
            succs[idx] = in_set(&index, &task.successors);
        }

        // mirror one-sided links
        let mut backward: FxHashSet<(NodeId, NodeId)> = FxHashSet::default();
        let mut forward: FxHashSet<(NodeId, NodeId)> = FxHashSet::default();
        for node in 0..n as NodeId {
            backward.extend(preds[node as usize].iter().map(|&p| (p, node)));
            forward.extend(succs[node as usize].iter().map(|&s| (node, s)));
        }
        for from in 0..n as NodeId {
            for &to in &succs[from as usize] {
                if backward.insert((from, to)) {
                    preds[to as usize].push(from);
                }
            }
        }
        for to in 0..n as NodeId {
            for &from in &preds[to as usize] {
                if forward.insert((from, to)) {
                    succs[from as usize].push(to);
                }
            }
        }

        Self {
            index,
            durations,
            headcounts,
            efforts,
            preds,
            succs,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Nodes without in-set predecessors, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len() as NodeId)
            .filter(|&id| self.preds[id as usize].is_empty())
            .collect()
    }

    /// Id string of a node.
    #[inline]
    pub fn id(&self, node: NodeId) -> &str {
        self.index.resolve(node).unwrap_or_default()
    }

    /// Order the nodes so that every link is walked at most once.
    ///
    /// Strongly connected components come in topological order. Inside a
    /// cyclic component the nodes follow a depth-first search from its entry
    /// node (the first member with a predecessor outside the component, or
    /// the first member if none has one), and the back edges of that search
    /// are cut. Acyclic parts of the subset keep every link.
    pub fn evaluation_order(&self) -> EvaluationOrder {
        let n = self.len();
        let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(n, n);
        for _ in 0..n {
            graph.add_node(());
        }
        for (from, succs) in self.succs.iter().enumerate() {
            for &to in succs {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to as usize), ());
            }
        }

        // tarjan_scc yields components in reverse topological order
        let mut components = tarjan_scc(&graph);
        components.reverse();

        let mut component_of = vec![0usize; n];
        for (c, members) in components.iter().enumerate() {
            for node in members {
                component_of[node.index()] = c;
            }
        }

        let inner = EdgeFiltered::from_fn(&graph, |edge: EdgeReference<'_, ()>| {
            component_of[edge.source().index()] == component_of[edge.target().index()]
        });
        let mut dfs = DfsPostOrder::empty(&inner);
        let mut order: Vec<NodeId> = Vec::with_capacity(n);

        for (c, members) in components.iter().enumerate() {
            let entry = self.component_entry(members, c, &component_of);
            dfs.move_to(NodeIndex::new(entry as usize));
            let mut finished: Vec<NodeId> = Vec::with_capacity(members.len());
            while let Some(node) = dfs.next(&inner) {
                finished.push(node.index() as NodeId);
            }
            order.extend(finished.into_iter().rev());
        }

        let mut position = vec![0usize; n];
        for (rank, &node) in order.iter().enumerate() {
            position[node as usize] = rank;
        }
        let cut_links = (0..n)
            .map(|to| {
                self.preds[to]
                    .iter()
                    .filter(|&&from| position[from as usize] >= position[to])
                    .count()
            })
            .sum();
        EvaluationOrder {
            order,
            position,
            cut_links,
        }
    }

    fn component_entry(&self, members: &[NodeIndex], c: usize, component_of: &[usize]) -> NodeId {
        let mut members: Vec<NodeId> = members.iter().map(|m| m.index() as NodeId).collect();
        members.sort_unstable();
        members
            .iter()
            .copied()
            .find(|&node| {
                self.preds[node as usize]
                    .iter()
                    .any(|&p| component_of[p as usize] != c)
            })
            .unwrap_or(members[0])
    }
}

/// Nodes of a [`Subgraph`] in evaluation order, see
/// [`Subgraph::evaluation_order`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationOrder {
    pub order: Vec<NodeId>,
    position: Vec<usize>,
    /// Links cut to break cycles.
    pub cut_links: usize,
}

impl EvaluationOrder {
    /// Whether the link `from -> to` is kept, i.e. `from` is evaluated first.
    #[inline]
    pub fn keeps(&self, from: NodeId, to: NodeId) -> bool {
        self.position[from as usize] < self.position[to as usize]
    }
}

fn in_set(index: &NodeInterner, ids: &[String]) -> Vec<NodeId> {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    ids.iter()
        .filter_map(|id| index.get(id))
        .filter(|node| seen.insert(*node))
        .collect()
}
