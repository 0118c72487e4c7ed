//! Longest-duration paths through a task subset.
//!
//! Every root-to-sink path is weighed by the sum of its tasks' durations and
//! all paths tied for the maximum are reported. Cycles end a branch instead
//! of looping.

mod calculation;

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use calculation::{critical_path, critical_path_for_subgraph};

/// Errors from the critical path analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriticalPathError {
    #[error("Critical path enumeration exceeded the budget of {limit} candidate paths")]
    PathBudgetExceeded { limit: usize },
}

/// All maximal-duration paths of a subset.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    /// Tied maximal paths, each a root-to-sink id sequence.
    #[pyo3(get)]
    pub paths: Vec<Vec<String>>,
    #[pyo3(get)]
    pub total_duration: f64,
    /// Union of the nodes of `paths`, in first-appearance order.
    #[pyo3(get)]
    pub all_path_node_ids: Vec<String>,
}

#[pymethods]
impl CriticalPathResult {
    /// Whether the task lies on any of the critical paths.
    fn contains(&self, task_id: &str) -> bool {
        self.all_path_node_ids.iter().any(|id| id == task_id)
    }

    fn __repr__(&self) -> String {
        format!(
            "CriticalPathResult(paths={}, total_duration={})",
            self.paths.len(),
            self.total_duration
        )
    }
}

impl CriticalPathResult {
    /// The first critical path, if any.
    pub fn primary(&self) -> Option<&[String]> {
        self.paths.first().map(Vec::as_slice)
    }
}
