//! Task collections and graph construction/validation.
//!
//! The graph holds one collection per hierarchy level. It is built once from
//! raw records ([`build_graph`]), repaired and checked once ([`validate`]),
//! and read by the analyses afterwards.

mod builder;
mod validator;

use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, HashMap};

use crate::models::{Level, Task};

pub use builder::{build_graph, BuildOutput, GraphBuilder};
pub use validator::{validate, ValidationOutput};

/// Outcome of looking up a link token in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Token names an existing id exactly.
    Exact(String),
    /// Token matches an existing id only when case is ignored.
    CaseInsensitive(String),
    /// Nothing matches.
    Missing,
}

/// Id-keyed tasks of one hierarchy level.
///
/// Insertion order is kept only so output is reproducible; lookups never depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCollection {
    tasks: FxHashMap<String, Task>,
    order: Vec<String>,
    /// lowercase id -> first inserted id with that spelling
    folded: FxHashMap<String, String>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Insert a task unless its id is taken. Returns whether it was inserted.
    pub fn insert(&mut self, task: Task) -> bool {
        if self.tasks.contains_key(&task.id) {
            return false;
        }
        self.folded
            .entry(task.id.to_lowercase())
            .or_insert_with(|| task.id.clone());
        self.order.push(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        true
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Resolve a link token: exact match first, then case-insensitive.
    pub fn resolve(&self, token: &str) -> Resolution {
        if self.tasks.contains_key(token) {
            return Resolution::Exact(token.to_string());
        }
        match self.folded.get(&token.to_lowercase()) {
            Some(id) => Resolution::CaseInsensitive(id.clone()),
            None => Resolution::Missing,
        }
    }

    /// Copy into a std map for the Python boundary.
    pub fn to_map(&self) -> HashMap<String, Task> {
        self.iter().map(|t| (t.id.clone(), t.clone())).collect()
    }
}

/// The two task collections of one input batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGraph {
    pub l5: TaskCollection,
    pub l6: TaskCollection,
}

impl TaskGraph {
    pub fn collection(&self, level: Level) -> &TaskCollection {
        match level {
            Level::L5 => &self.l5,
            Level::L6 => &self.l6,
        }
    }

    pub(crate) fn collection_mut(&mut self, level: Level) -> &mut TaskCollection {
        match level {
            Level::L5 => &mut self.l5,
            Level::L6 => &mut self.l6,
        }
    }

    /// L6 children of an L5 task, in attachment order. Empty for unknown ids.
    pub fn children_of(&self, l5_id: &str) -> Vec<&Task> {
        self.l5
            .get(l5_id)
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .filter_map(|child| self.l6.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct category labels over both levels, sorted.
    pub fn categories(&self) -> Vec<String> {
        let labels: BTreeSet<&str> = self
            .l5
            .iter()
            .chain(self.l6.iter())
            .map(|t| t.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        labels.into_iter().map(str::to_string).collect()
    }

    /// Distinct team labels of L5 tasks, sorted.
    pub fn teams(&self) -> Vec<String> {
        let teams: BTreeSet<&str> = self.l5.iter().filter_map(|t| t.team.as_deref()).collect();
        teams.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first() {
        let mut coll = TaskCollection::new();
        assert!(coll.insert(Task::new("A", Level::L5, "x")));
        assert!(!coll.insert(Task::new("A", Level::L5, "y")));
        assert_eq!(coll.len(), 1);
        assert_eq!(coll.get("A").unwrap().category, "x");
    }

    #[test]
    fn test_resolve_exact_then_case_insensitive() {
        let mut coll = TaskCollection::new();
        coll.insert(Task::new("Plan", Level::L5, "x"));
        coll.insert(Task::new("PLAN", Level::L5, "x"));

        assert_eq!(coll.resolve("PLAN"), Resolution::Exact("PLAN".to_string()));
        assert_eq!(
            coll.resolve("plan"),
            Resolution::CaseInsensitive("Plan".to_string())
        );
        assert_eq!(coll.resolve("build"), Resolution::Missing);
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let mut coll = TaskCollection::new();
        for id in ["c", "a", "b"] {
            coll.insert(Task::new(id, Level::L5, "x"));
        }
        let ids: Vec<&str> = coll.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_categories_and_teams() {
        let mut graph = TaskGraph::default();
        let mut a = Task::new("A", Level::L5, "Design");
        a.team = Some("core".to_string());
        let mut b = Task::new("B", Level::L5, "Build");
        b.team = Some("core".to_string());
        graph.l5.insert(a);
        graph.l5.insert(b);
        graph.l6.insert(Task::new("A::x", Level::L6, "Test"));

        assert_eq!(graph.categories(), vec!["Build", "Design", "Test"]);
        assert_eq!(graph.teams(), vec!["core"]);
    }
}
