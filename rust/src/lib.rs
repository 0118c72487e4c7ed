//! Rust implementation of the process-flow graph engine.
//!
//! Raw task records are turned into a validated two-level dependency graph,
//! from which cumulative effort, critical paths and headcount schedules are
//! computed. Graph defects are reported as values, never raised.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

mod config;
pub mod critical_path;
pub mod effort;
pub mod graph;
mod interner;
pub mod logging;
mod models;
pub mod pipeline;
pub mod query;
pub mod ranking;
pub mod scheduler;
mod subgraph;

pub use config::{EngineConfig, UNSPECIFIED_CATEGORY};
pub use critical_path::{
    critical_path, critical_path_for_subgraph, CriticalPathError, CriticalPathResult,
};
pub use effort::{aggregate_effort, apply_effort, EffortSummary};
pub use graph::{build_graph, validate, GraphBuilder, Resolution, TaskCollection, TaskGraph};
pub use models::{
    display_name, l6_key, strip_category_prefix, Level, ParseLevelError, Task, TaskRecord,
    ValidationError, ValidationErrorKind, L6_SEPARATOR,
};
pub use pipeline::{process, ProcessSummary, ProcessedGraph};
pub use query::{QueryError, UpstreamHeadcountStats, VisibilityFilter};
pub use ranking::RankedTask;
pub use scheduler::{headcount, HeadcountInterval, HeadcountResult};
pub use subgraph::{EvaluationOrder, Subgraph};

fn query_error(err: QueryError) -> PyErr {
    match err {
        QueryError::UnknownTask { .. } => PyKeyError::new_err(err.to_string()),
        QueryError::CriticalPath(_) => PyValueError::new_err(err.to_string()),
    }
}

/// A processed batch (Python wrapper around [`ProcessedGraph`]).
///
/// Holds the config it was built with so the per-group analyses use the same
/// settings.
#[pyclass(name = "ProcessedGraph")]
#[derive(Clone, Debug)]
pub struct PyProcessedGraph {
    inner: ProcessedGraph,
    config: EngineConfig,
}

#[pymethods]
impl PyProcessedGraph {
    #[getter]
    fn l5_tasks(&self) -> HashMap<String, Task> {
        self.inner.graph.l5.to_map()
    }

    #[getter]
    fn l6_tasks(&self) -> HashMap<String, Task> {
        self.inner.graph.l6.to_map()
    }

    #[getter]
    fn errors(&self) -> Vec<ValidationError> {
        self.inner.errors.clone()
    }

    #[getter]
    fn skipped_records(&self) -> usize {
        self.inner.skipped_records
    }

    #[getter]
    fn categories(&self) -> Vec<String> {
        self.inner.graph.categories()
    }

    #[getter]
    fn teams(&self) -> Vec<String> {
        self.inner.graph.teams()
    }

    /// The L6 children of an L5 task.
    ///
    /// # Raises
    /// * KeyError if the L5 task does not exist
    fn group_tasks(&self, l5_id: &str) -> PyResult<Vec<Task>> {
        query::group_tasks(&self.inner.graph, l5_id)
            .map(|tasks| tasks.into_iter().cloned().collect())
            .map_err(query_error)
    }

    /// Critical paths through an L5 task's children.
    ///
    /// # Raises
    /// * KeyError if the L5 task does not exist
    /// * ValueError if the configured path budget is exceeded
    fn group_critical_path(&self, l5_id: &str) -> PyResult<CriticalPathResult> {
        query::group_critical_path(&self.inner.graph, l5_id, &self.config).map_err(query_error)
    }

    /// Headcount schedule of an L5 task's children.
    fn group_headcount(&self, l5_id: &str) -> PyResult<HeadcountResult> {
        query::group_headcount(&self.inner.graph, l5_id, &self.config).map_err(query_error)
    }

    fn group_start_tasks(&self, l5_id: &str) -> Vec<Task> {
        query::group_start_tasks(&self.inner.graph, l5_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// A task and all its transitive predecessors on the same level.
    #[pyo3(signature = (task_id, level=Level::L5))]
    fn upstream_closure(&self, task_id: &str, level: Level) -> PyResult<Vec<Task>> {
        query::upstream_closure(&self.inner.graph, level, task_id)
            .map(|tasks| tasks.into_iter().cloned().collect())
            .map_err(query_error)
    }

    /// L5 tasks visible under `filter` whose links were not all cut by it.
    fn filter_visible(&self, filter: &VisibilityFilter) -> Vec<Task> {
        query::filter_visible(&self.inner.graph.l5, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// A filter showing every category and team in the graph.
    fn show_all_filter(&self) -> VisibilityFilter {
        VisibilityFilter::show_all(&self.inner.graph)
    }

    fn group_effort_totals(&self) -> Vec<RankedTask> {
        query::group_effort_totals(&self.inner.graph)
    }

    fn final_task_ranking(&self) -> Vec<RankedTask> {
        ranking::final_task_ranking(&self.inner.graph.l5)
    }

    fn effort_ranking(&self) -> Vec<RankedTask> {
        ranking::effort_ranking(&self.inner.graph.l5)
    }

    fn group_peak_headcounts(&self) -> HashMap<String, f64> {
        query::group_peak_headcounts(&self.inner.graph, &self.config)
            .into_iter()
            .collect()
    }

    fn upstream_headcount_stats(&self, l5_id: &str) -> PyResult<UpstreamHeadcountStats> {
        query::upstream_headcount_stats(&self.inner.graph, l5_id).map_err(query_error)
    }

    /// Headcount schedule of everything upstream of an L5 task, with group
    /// peaks standing in for L5 tasks that have children.
    fn upstream_headcount(&self, l5_id: &str) -> PyResult<HeadcountResult> {
        query::upstream_headcount(&self.inner.graph, l5_id, &self.config).map_err(query_error)
    }

    fn __repr__(&self) -> String {
        let summary = self.inner.summary();
        format!(
            "ProcessedGraph(l5={}, l6={}, errors={}, skipped={})",
            summary.l5_tasks, summary.l6_tasks, summary.errors, summary.skipped_records
        )
    }
}

/// Build, validate and aggregate a batch of task records.
///
/// # Arguments
/// * `records` - Task records in input order
/// * `config` - Engine configuration (defaults if omitted)
///
/// # Returns
/// * ProcessedGraph with both task collections and the error list
#[pyfunction]
#[pyo3(signature = (records, config=None))]
fn process_records(records: Vec<TaskRecord>, config: Option<EngineConfig>) -> PyProcessedGraph {
    let config = config.unwrap_or_default();
    PyProcessedGraph {
        inner: process(&records, &config),
        config,
    }
}

/// Critical paths of an arbitrary task subset.
///
/// # Raises
/// * ValueError if the configured path budget is exceeded
#[pyfunction]
#[pyo3(name = "critical_path", signature = (tasks, config=None))]
fn py_critical_path(
    tasks: Vec<Task>,
    config: Option<EngineConfig>,
) -> PyResult<CriticalPathResult> {
    let config = config.unwrap_or_default();
    critical_path(&tasks, &config).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Headcount schedule of an arbitrary task subset.
#[pyfunction]
#[pyo3(name = "headcount", signature = (tasks, config=None))]
fn py_headcount(tasks: Vec<Task>, config: Option<EngineConfig>) -> HeadcountResult {
    let config = config.unwrap_or_default();
    headcount(&tasks, &config)
}

/// Parse a level tag ("L5" or "L6").
///
/// # Raises
/// * ValueError for any other tag
#[pyfunction]
fn parse_level(tag: &str) -> PyResult<Level> {
    tag.parse::<Level>()
        .map_err(|e: ParseLevelError| PyValueError::new_err(e.to_string()))
}

/// The procflow.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Level>()?;
    m.add_class::<TaskRecord>()?;
    m.add_class::<Task>()?;
    m.add_class::<ValidationErrorKind>()?;
    m.add_class::<ValidationError>()?;

    // Results
    m.add_class::<PyProcessedGraph>()?;
    m.add_class::<CriticalPathResult>()?;
    m.add_class::<HeadcountInterval>()?;
    m.add_class::<HeadcountResult>()?;
    m.add_class::<RankedTask>()?;
    m.add_class::<UpstreamHeadcountStats>()?;

    // Config types
    m.add_class::<EngineConfig>()?;
    m.add_class::<VisibilityFilter>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(process_records, m)?)?;
    m.add_function(wrap_pyfunction!(py_critical_path, m)?)?;
    m.add_function(wrap_pyfunction!(py_headcount, m)?)?;
    m.add_function(wrap_pyfunction!(parse_level, m)?)?;

    Ok(())
}
