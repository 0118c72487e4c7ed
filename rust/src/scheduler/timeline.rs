//! Earliest start week of every task in a subset.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::interner::NodeId;
use crate::log_debug;
use crate::subgraph::Subgraph;

/// When one task runs under the earliest-start schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskWindow {
    pub task_id: String,
    pub start_week: f64,
    pub end_week: f64,
    pub headcount: f64,
}

impl TaskWindow {
    /// Whether the task runs through the whole of `[from, to)`.
    #[inline]
    pub fn covers(&self, from: f64, to: f64) -> bool {
        self.start_week <= from && self.end_week >= to
    }
}

/// Windows for every task of the subset, in subset order.
///
/// A task starts when its latest predecessor ends. Cycles are cut the same
/// way as for cumulative effort, see [`Subgraph::evaluation_order`].
pub fn earliest_start_windows(sub: &Subgraph, config: &EngineConfig) -> Vec<TaskWindow> {
    let order = sub.evaluation_order();
    let mut starts = vec![0.0_f64; sub.len()];

    for &node in &order.order {
        let idx = node as usize;
        let mut start = 0.0_f64;
        for &pred in &sub.preds[idx] {
            if order.keeps(pred, node) {
                start = start.max(starts[pred as usize] + sub.durations[pred as usize]);
            } else {
                log_debug!(
                    config.verbosity,
                    "[timeline] {} -> {} cut by a cycle",
                    sub.id(pred),
                    sub.id(node)
                );
            }
        }
        starts[idx] = start;
    }

    (0..sub.len() as NodeId)
        .map(|node| {
            let idx = node as usize;
            TaskWindow {
                task_id: sub.id(node).to_string(),
                start_week: starts[idx],
                end_week: starts[idx] + sub.durations[idx],
                headcount: sub.headcounts[idx],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Level, Task};

    fn make_task(id: &str, t: f64, preds: &[&str]) -> Task {
        let mut task = Task::new(id, Level::L6, "cat");
        task.duration_weeks = t;
        task.predecessors = preds.iter().map(|s| s.to_string()).collect();
        task
    }

    fn window<'w>(windows: &'w [TaskWindow], id: &str) -> &'w TaskWindow {
        windows.iter().find(|w| w.task_id == id).unwrap()
    }

    #[test]
    fn test_start_after_latest_predecessor() {
        let tasks = vec![
            make_task("X", 2.0, &[]),
            make_task("Y", 3.0, &["X"]),
            make_task("W", 4.0, &["X"]),
            make_task("Z", 1.0, &["Y", "W"]),
        ];
        let sub = Subgraph::new(&tasks);
        let windows = earliest_start_windows(&sub, &EngineConfig::default());

        assert_eq!(window(&windows, "X").start_week, 0.0);
        assert_eq!(window(&windows, "Y").start_week, 2.0);
        assert_eq!(window(&windows, "Y").end_week, 5.0);
        assert_eq!(window(&windows, "Z").start_week, 6.0);
        assert_eq!(window(&windows, "Z").end_week, 7.0);
    }

    #[test]
    fn test_cycle_terminates() {
        let tasks = vec![make_task("a", 1.0, &["b"]), make_task("b", 2.0, &["a"])];
        let sub = Subgraph::new(&tasks);
        let windows = earliest_start_windows(&sub, &EngineConfig::default());

        // no way into the cycle, so it opens at the first task
        assert_eq!(window(&windows, "a").start_week, 0.0);
        assert_eq!(window(&windows, "b").start_week, 1.0);
    }

    #[test]
    fn test_truncated_start_not_reused() {
        // x(10) -> a(1) -> b(1) -> a ; c(1) after b
        let tasks = vec![
            make_task("x", 10.0, &[]),
            make_task("a", 1.0, &["x", "b"]),
            make_task("b", 1.0, &["a"]),
            make_task("c", 1.0, &["b"]),
        ];
        let sub = Subgraph::new(&tasks);
        let windows = earliest_start_windows(&sub, &EngineConfig::default());

        assert_eq!(window(&windows, "a").start_week, 10.0);
        assert_eq!(window(&windows, "b").start_week, 11.0);
        assert_eq!(window(&windows, "c").start_week, 12.0);
        assert_eq!(window(&windows, "c").end_week, 13.0);
    }

    #[test]
    fn test_predecessor_outside_subset_ignored() {
        let tasks = vec![make_task("a", 1.0, &["elsewhere"])];
        let sub = Subgraph::new(&tasks);
        let windows = earliest_start_windows(&sub, &EngineConfig::default());
        assert_eq!(windows[0].start_week, 0.0);
        assert!(windows[0].covers(0.0, 1.0));
        assert!(!windows[0].covers(0.5, 1.5));
    }
}
