//! Interval partition of the earliest-start timeline.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::log_debug;
use crate::models::Task;
use crate::ranking::cmp_f64;
use crate::subgraph::Subgraph;

use super::timeline::{earliest_start_windows, TaskWindow};

/// One piece `[start_week, end_week)` of the timeline with its running tasks.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadcountInterval {
    #[pyo3(get)]
    pub start_week: f64,
    #[pyo3(get)]
    pub end_week: f64,
    /// Sum of P over `active_task_ids`.
    #[pyo3(get)]
    pub headcount: f64,
    #[pyo3(get)]
    pub active_task_ids: Vec<String>,
}

#[pymethods]
impl HeadcountInterval {
    fn __repr__(&self) -> String {
        format!(
            "HeadcountInterval([{}, {}), headcount={}, tasks={:?})",
            self.start_week, self.end_week, self.headcount, self.active_task_ids
        )
    }
}

impl HeadcountInterval {
    pub fn length(&self) -> f64 {
        self.end_week - self.start_week
    }
}

/// Peak headcount and the full interval breakdown of a subset.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadcountResult {
    #[pyo3(get)]
    pub max_headcount: f64,
    /// Intervals with at least one active task, in time order.
    #[pyo3(get)]
    pub intervals: Vec<HeadcountInterval>,
    /// Latest end week over all tasks.
    #[pyo3(get)]
    pub total_weeks: f64,
    /// Active tasks of the first interval reaching `max_headcount`.
    #[pyo3(get)]
    pub max_headcount_task_ids: Vec<String>,
}

#[pymethods]
impl HeadcountResult {
    fn __repr__(&self) -> String {
        format!(
            "HeadcountResult(max_headcount={}, intervals={}, total_weeks={})",
            self.max_headcount,
            self.intervals.len(),
            self.total_weeks
        )
    }
}

impl HeadcountResult {
    /// Headcount demanded at week `week`, 0 outside every interval.
    pub fn headcount_at(&self, week: f64) -> f64 {
        self.intervals
            .iter()
            .find(|iv| iv.start_week <= week && week < iv.end_week)
            .map_or(0.0, |iv| iv.headcount)
    }
}

fn time_points(windows: &[TaskWindow]) -> Vec<f64> {
    let mut points = Vec::with_capacity(windows.len() * 2 + 1);
    points.push(0.0);
    for window in windows {
        points.push(window.start_week);
        points.push(window.end_week);
    }
    points.sort_by(|a, b| cmp_f64(*a, *b));
    points.dedup();
    points
}

/// Headcount breakdown of an already indexed subset.
pub fn headcount_for_subgraph(sub: &Subgraph, config: &EngineConfig) -> HeadcountResult {
    if sub.is_empty() {
        return HeadcountResult::default();
    }

    let windows = earliest_start_windows(sub, config);
    let points = time_points(&windows);
    let total_weeks = points.last().copied().unwrap_or(0.0);

    let mut result = HeadcountResult {
        total_weeks,
        ..HeadcountResult::default()
    };
    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let active: Vec<&TaskWindow> = windows.iter().filter(|w| w.covers(from, to)).collect();
        if active.is_empty() {
            continue;
        }

        let interval = HeadcountInterval {
            start_week: from,
            end_week: to,
            headcount: active.iter().map(|w| w.headcount).sum(),
            active_task_ids: active.iter().map(|w| w.task_id.clone()).collect(),
        };
        if interval.headcount > result.max_headcount {
            result.max_headcount = interval.headcount;
            result.max_headcount_task_ids = interval.active_task_ids.clone();
        }
        result.intervals.push(interval);
    }

    log_debug!(
        config.verbosity,
        "[headcount] {} tasks, {} time points, {} intervals, peak {}",
        sub.len(),
        points.len(),
        result.intervals.len(),
        result.max_headcount
    );
    result
}

/// Headcount breakdown of a task subset. Links leaving the subset are ignored.
pub fn headcount<'a, I>(tasks: I, config: &EngineConfig) -> HeadcountResult
where
    I: IntoIterator<Item = &'a Task>,
{
    let sub = Subgraph::new(tasks);
    headcount_for_subgraph(&sub, config)
}
