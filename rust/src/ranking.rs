//! Descending rankings of tasks by a numeric key.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::graph::TaskCollection;

/// A task id with the value it was ranked by.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedTask {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub value: f64,
}

#[pymethods]
impl RankedTask {
    fn __repr__(&self) -> String {
        format!("RankedTask({}, value={})", self.task_id, self.value)
    }
}

/// Compare f64 values for sorting, treating NaN as equal to everything.
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Sort by value descending, then by id ascending.
pub fn rank_descending(mut entries: Vec<RankedTask>) -> Vec<RankedTask> {
    entries.sort_by(|a, b| cmp_f64(b.value, a.value).then_with(|| a.task_id.cmp(&b.task_id)));
    entries
}

/// Final tasks (no successors) with a cumulative effort, highest first.
pub fn final_task_ranking(collection: &TaskCollection) -> Vec<RankedTask> {
    let entries = collection
        .iter()
        .filter(|t| t.is_final_node)
        .filter_map(|t| {
            t.cumulative_effort.map(|value| RankedTask {
                task_id: t.id.clone(),
                name: t.name.clone(),
                value,
            })
        })
        .collect();
    rank_descending(entries)
}

/// Every task by its own effort, highest first.
pub fn effort_ranking(collection: &TaskCollection) -> Vec<RankedTask> {
    let entries = collection
        .iter()
        .map(|t| RankedTask {
            task_id: t.id.clone(),
            name: t.name.clone(),
            value: t.effort,
        })
        .collect();
    rank_descending(entries)
}
