//! Read-only queries over a validated graph.
//!
//! These answer the questions the downstream views ask: which tasks belong to
//! a group, what lies upstream of a task, what survives a category/team
//! filter, and the per-group effort and headcount figures.

use pyo3::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::critical_path::{critical_path, CriticalPathError, CriticalPathResult};
use crate::graph::{TaskCollection, TaskGraph};
use crate::log_debug;
use crate::models::{Level, Task};
use crate::ranking::{rank_descending, RankedTask};
use crate::scheduler::{headcount, headcount_for_subgraph, HeadcountResult};
use crate::subgraph::Subgraph;

/// Errors from graph queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Unknown {level} task: {id}")]
    UnknownTask { id: String, level: Level },
    #[error(transparent)]
    CriticalPath(#[from] CriticalPathError),
}

fn require<'g>(
    collection: &'g TaskCollection,
    id: &str,
    level: Level,
) -> Result<&'g Task, QueryError> {
    collection.get(id).ok_or_else(|| QueryError::UnknownTask {
        id: id.to_string(),
        level,
    })
}

/// The L6 children of one L5 task.
pub fn group_tasks<'g>(graph: &'g TaskGraph, l5_id: &str) -> Result<Vec<&'g Task>, QueryError> {
    require(&graph.l5, l5_id, Level::L5)?;
    Ok(graph.children_of(l5_id))
}

/// Critical paths through one L5 task's children.
pub fn group_critical_path(
    graph: &TaskGraph,
    l5_id: &str,
    config: &EngineConfig,
) -> Result<CriticalPathResult, QueryError> {
    let children = group_tasks(graph, l5_id)?;
    Ok(critical_path(children, config)?)
}

/// Headcount schedule of one L5 task's children.
pub fn group_headcount(
    graph: &TaskGraph,
    l5_id: &str,
    config: &EngineConfig,
) -> Result<HeadcountResult, QueryError> {
    let children = group_tasks(graph, l5_id)?;
    Ok(headcount(children, config))
}

/// The task and all its transitive predecessors on `level`, in collection
/// order.
///
/// Predecessor ids not present in the collection are ignored.
pub fn upstream_closure<'g>(
    graph: &'g TaskGraph,
    level: Level,
    id: &str,
) -> Result<Vec<&'g Task>, QueryError> {
    let collection = graph.collection(level);
    let start = require(collection, id, level)?;

    let mut reached: FxHashSet<&str> = FxHashSet::default();
    reached.insert(start.id.as_str());
    let mut stack = vec![start];
    while let Some(task) = stack.pop() {
        for pred in &task.predecessors {
            if let Some(pred_task) = collection.get(pred) {
                if reached.insert(pred_task.id.as_str()) {
                    stack.push(pred_task);
                }
            }
        }
    }

    Ok(collection
        .iter()
        .filter(|t| reached.contains(t.id.as_str()))
        .collect())
}

/// Visible categories and teams.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityFilter {
    #[pyo3(get, set)]
    pub categories: HashSet<String>,
    /// Tasks without a team are visible regardless of this set.
    #[pyo3(get, set)]
    pub teams: HashSet<String>,
}

#[pymethods]
impl VisibilityFilter {
    #[new]
    #[pyo3(signature = (categories=None, teams=None))]
    fn py_new(categories: Option<HashSet<String>>, teams: Option<HashSet<String>>) -> Self {
        Self {
            categories: categories.unwrap_or_default(),
            teams: teams.unwrap_or_default(),
        }
    }

    /// Flip one category on or off.
    pub fn toggle_category(&mut self, category: &str) {
        if !self.categories.remove(category) {
            self.categories.insert(category.to_string());
        }
    }

    /// Flip one team on or off.
    pub fn toggle_team(&mut self, team: &str) {
        if !self.teams.remove(team) {
            self.teams.insert(team.to_string());
        }
    }

    /// Hide every category.
    pub fn hide_all_categories(&mut self) {
        self.categories.clear();
    }

    /// Hide every team. Tasks without a team stay visible.
    pub fn hide_all_teams(&mut self) {
        self.teams.clear();
    }

    fn __repr__(&self) -> String {
        format!(
            "VisibilityFilter(categories={}, teams={})",
            self.categories.len(),
            self.teams.len()
        )
    }
}

impl VisibilityFilter {
    /// Everything in the graph visible.
    pub fn show_all(graph: &TaskGraph) -> Self {
        Self {
            categories: graph.categories().into_iter().collect(),
            teams: graph.teams().into_iter().collect(),
        }
    }

    /// Nothing visible.
    pub fn hide_all() -> Self {
        Self::default()
    }

    pub fn admits(&self, task: &Task) -> bool {
        self.categories.contains(&task.category)
            && task.team.as_ref().map_or(true, |team| self.teams.contains(team))
    }
}

/// Tasks passing `filter`, minus those whose links the filter cut.
///
/// A task that had predecessors keeps its place only if one of them is still
/// visible, and the same holds for successors. Tasks with no links at all are
/// always kept.
pub fn filter_visible<'c>(
    collection: &'c TaskCollection,
    filter: &VisibilityFilter,
) -> Vec<&'c Task> {
    let admitted: Vec<&Task> = collection.iter().filter(|t| filter.admits(t)).collect();
    let visible: FxHashSet<&str> = admitted.iter().map(|&t| t.id.as_str()).collect();
    let any_visible =
        |ids: &[String]| ids.is_empty() || ids.iter().any(|id| visible.contains(id.as_str()));

    admitted
        .into_iter()
        .filter(|t| {
            (t.predecessors.is_empty() && t.successors.is_empty())
                || (any_visible(&t.predecessors) && any_visible(&t.successors))
        })
        .collect()
}

/// Children of `l5_id` with no incoming link from a sibling.
pub fn group_start_tasks<'g>(graph: &'g TaskGraph, l5_id: &str) -> Vec<&'g Task> {
    let children = graph.children_of(l5_id);
    let siblings: FxHashSet<&str> = children.iter().map(|&t| t.id.as_str()).collect();
    let entered: FxHashSet<&str> = children
        .iter()
        .flat_map(|&t| t.successors.iter())
        .map(String::as_str)
        .filter(|id| siblings.contains(id))
        .collect();
    children
        .into_iter()
        .filter(|t| !entered.contains(t.id.as_str()))
        .collect()
}

/// Summed child effort of every L5 task whose group has a start task, highest first.
pub fn group_effort_totals(graph: &TaskGraph) -> Vec<RankedTask> {
    let entries = graph
        .l5
        .iter()
        .filter(|parent| !group_start_tasks(graph, &parent.id).is_empty())
        .map(|parent| RankedTask {
            task_id: parent.id.clone(),
            name: parent.name.clone(),
            value: graph.children_of(&parent.id).iter().map(|c| c.effort).sum(),
        })
        .collect();
    rank_descending(entries)
}

/// Peak headcount of each L5 task's children schedule, for L5 tasks with children.
pub fn group_peak_headcounts(graph: &TaskGraph, config: &EngineConfig) -> FxHashMap<String, f64> {
    graph
        .l5
        .iter()
        .filter(|parent| !parent.children.is_empty())
        .map(|parent| {
            let peak = headcount(graph.children_of(&parent.id), config).max_headcount;
            (parent.id.clone(), peak)
        })
        .collect()
}

/// Headcount figures of the tasks upstream of one L5 task.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamHeadcountStats {
    /// Own headcount per task, highest first.
    #[pyo3(get)]
    pub headcounts: Vec<RankedTask>,
    #[pyo3(get)]
    pub max_headcount: f64,
    #[pyo3(get)]
    pub average_headcount: f64,
}

#[pymethods]
impl UpstreamHeadcountStats {
    #[getter]
    pub fn total_tasks(&self) -> usize {
        self.headcounts.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "UpstreamHeadcountStats(tasks={}, max={}, average={})",
            self.headcounts.len(),
            self.max_headcount,
            self.average_headcount
        )
    }
}

pub fn upstream_headcount_stats(
    graph: &TaskGraph,
    l5_id: &str,
) -> Result<UpstreamHeadcountStats, QueryError> {
    let closure = upstream_closure(graph, Level::L5, l5_id)?;
    let headcounts = rank_descending(
        closure
            .iter()
            .map(|t| RankedTask {
                task_id: t.id.clone(),
                name: t.name.clone(),
                value: t.headcount,
            })
            .collect(),
    );

    let max_headcount = headcounts.iter().map(|r| r.value).fold(0.0, f64::max);
    let average_headcount = if headcounts.is_empty() {
        0.0
    } else {
        headcounts.iter().map(|r| r.value).sum::<f64>() / headcounts.len() as f64
    };

    Ok(UpstreamHeadcountStats {
        headcounts,
        max_headcount,
        average_headcount,
    })
}

/// Headcount schedule of the L5 tasks upstream of `l5_id`.
///
/// An L5 task with children counts with its group peak instead of its own P.
pub fn upstream_headcount(
    graph: &TaskGraph,
    l5_id: &str,
    config: &EngineConfig,
) -> Result<HeadcountResult, QueryError> {
    let closure = upstream_closure(graph, Level::L5, l5_id)?;
    let mut sub = Subgraph::new(closure.iter().copied());

    let mut replaced = 0usize;
    for task in &closure {
        if task.children.is_empty() {
            continue;
        }
        if let Some(node) = sub.index.get(&task.id) {
            sub.headcounts[node as usize] =
                headcount(graph.children_of(&task.id), config).max_headcount;
            replaced += 1;
        }
    }
    log_debug!(
        config.verbosity,
        "[query] upstream of {}: {} tasks, {} group peaks substituted",
        l5_id,
        sub.len(),
        replaced
    );

    Ok(headcount_for_subgraph(&sub, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, level: Level, category: &str, preds: &[&str], succs: &[&str]) -> Task {
        let mut task = Task::new(id, level, category);
        task.predecessors = preds.iter().map(|s| s.to_string()).collect();
        task.successors = succs.iter().map(|s| s.to_string()).collect();
        task
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// L5: A -> B -> C, D isolated. A has children x -> y, z.
    fn make_graph() -> TaskGraph {
        let mut graph = TaskGraph::default();
        let mut a = make_task("A", Level::L5, "Design", &[], &["B"]);
        a.headcount = 1.0;
        a.children = vec!["A::x".into(), "A::y".into(), "A::z".into()];
        graph.l5.insert(a);
        let mut b = make_task("B", Level::L5, "Build", &["A"], &["C"]);
        b.headcount = 2.0;
        b.team = Some("core".into());
        graph.l5.insert(b);
        let mut c = make_task("C", Level::L5, "Test", &["B"], &[]);
        c.headcount = 5.0;
        graph.l5.insert(c);
        graph.l5.insert(make_task("D", Level::L5, "Test", &[], &[]));

        let children: [(&str, f64, f64, f64, &[&str], &[&str]); 3] = [
            ("A::x", 2.0, 3.0, 1.0, &[], &["A::y"]),
            ("A::y", 1.0, 2.0, 2.5, &["A::x"], &[]),
            ("A::z", 2.0, 1.0, 0.5, &[], &[]),
        ];
        for (id, t, p, mm, preds, succs) in children {
            let mut task = make_task(id, Level::L6, "Design", preds, succs);
            task.parent_id = Some("A".into());
            task.duration_weeks = t;
            task.headcount = p;
            task.effort = mm;
            graph.l6.insert(task);
        }
        graph
    }

    #[test]
    fn test_group_tasks() {
        let graph = make_graph();
        let group = group_tasks(&graph, "A").unwrap();
        assert_eq!(ids(&group), vec!["A::x", "A::y", "A::z"]);
        assert!(group_tasks(&graph, "B").unwrap().is_empty());
        assert_eq!(
            group_tasks(&graph, "nope").unwrap_err(),
            QueryError::UnknownTask { id: "nope".into(), level: Level::L5 }
        );
    }

    #[test]
    fn test_group_critical_path_and_headcount() {
        let graph = make_graph();
        let config = EngineConfig::default();

        let path = group_critical_path(&graph, "A", &config).unwrap();
        assert_eq!(path.paths, vec![vec!["A::x".to_string(), "A::y".to_string()]]);
        assert_eq!(path.total_duration, 3.0);

        // x [0,2) P3, z [0,2) P1, y [2,3) P2
        let hc = group_headcount(&graph, "A", &config).unwrap();
        assert_eq!(hc.max_headcount, 4.0);
        assert_eq!(hc.max_headcount_task_ids, vec!["A::x", "A::z"]);
    }

    #[test]
    fn test_upstream_closure() {
        let graph = make_graph();
        let closure = upstream_closure(&graph, Level::L5, "C").unwrap();
        assert_eq!(ids(&closure), vec!["A", "B", "C"]);
        assert_eq!(ids(&upstream_closure(&graph, Level::L5, "D").unwrap()), vec!["D"]);

        let children = upstream_closure(&graph, Level::L6, "A::y").unwrap();
        assert_eq!(ids(&children), vec!["A::x", "A::y"]);
    }

    #[test]
    fn test_upstream_closure_cycle() {
        let mut graph = TaskGraph::default();
        graph.l5.insert(make_task("a", Level::L5, "x", &["b", "ghost"], &["b"]));
        graph.l5.insert(make_task("b", Level::L5, "x", &["a"], &["a"]));
        let closure = upstream_closure(&graph, Level::L5, "a").unwrap();
        assert_eq!(ids(&closure), vec!["a", "b"]);
    }

    #[test]
    fn test_upstream_closure_unknown_id_reports_its_level() {
        let graph = TaskGraph::default();
        assert_eq!(
            upstream_closure(&graph, Level::L6, "P::x").unwrap_err(),
            QueryError::UnknownTask {
                id: "P::x".to_string(),
                level: Level::L6,
            }
        );
    }

    #[test]
    fn test_filter_visible_drops_cut_tasks() {
        let graph = make_graph();
        let mut filter = VisibilityFilter::show_all(&graph);
        assert_eq!(filter_visible(&graph.l5, &filter).len(), 4);

        // hiding Design cuts B's only predecessor
        filter.toggle_category("Design");
        let visible = filter_visible(&graph.l5, &filter);
        assert_eq!(ids(&visible), vec!["C", "D"]);
    }

    #[test]
    fn test_filter_visible_team() {
        let graph = make_graph();
        let mut filter = VisibilityFilter::show_all(&graph);
        filter.toggle_team("core");
        let visible = filter_visible(&graph.l5, &filter);
        // A lost its successor, C its predecessor; D has no links
        assert_eq!(ids(&visible), vec!["D"]);
    }

    #[test]
    fn test_filter_hide_all() {
        let graph = make_graph();
        let mut filter = VisibilityFilter::show_all(&graph);
        filter.hide_all_teams();
        assert!(filter.admits(graph.l5.get("A").unwrap()));
        assert!(!filter.admits(graph.l5.get("B").unwrap()));

        filter.hide_all_categories();
        assert!(filter_visible(&graph.l5, &filter).is_empty());
        assert_eq!(filter, VisibilityFilter::hide_all());

        filter.toggle_category("Test");
        assert_eq!(ids(&filter_visible(&graph.l5, &filter)), vec!["D"]);
    }

    #[test]
    fn test_group_effort_totals() {
        let graph = make_graph();
        let totals = group_effort_totals(&graph);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].task_id, "A");
        assert_eq!(totals[0].value, 4.0);
        assert_eq!(ids(&group_start_tasks(&graph, "A")), vec!["A::x", "A::z"]);
    }

    #[test]
    fn test_group_peak_headcounts() {
        let graph = make_graph();
        let peaks = group_peak_headcounts(&graph, &EngineConfig::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.get("A"), Some(&4.0));
    }

    #[test]
    fn test_upstream_headcount_stats() {
        let graph = make_graph();
        let stats = upstream_headcount_stats(&graph, "C").unwrap();
        let order: Vec<&str> = stats.headcounts.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
        assert_eq!(stats.max_headcount, 5.0);
        assert!((stats.average_headcount - 8.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.total_tasks(), 3);
    }

    #[test]
    fn test_upstream_headcount_uses_group_peak() {
        let mut graph = make_graph();
        for id in ["A", "B", "C"] {
            graph.l5.get_mut(id).unwrap().duration_weeks = 1.0;
        }
        let result = upstream_headcount(&graph, "C", &EngineConfig::default()).unwrap();
        // A counts with its group peak 4 instead of its own 1
        assert_eq!(result.intervals[0].headcount, 4.0);
        assert_eq!(result.max_headcount, 5.0);
        assert_eq!(result.max_headcount_task_ids, vec!["C"]);
        assert_eq!(result.total_weeks, 3.0);
    }
}
