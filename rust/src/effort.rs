//! Cumulative effort (MM) over predecessor chains.
//!
//! cumulative(t) = effort(t) + max(0, max over predecessors p of cumulative(p))
//!
//! The graph may contain cycles. Tasks are evaluated in
//! [`Subgraph::evaluation_order`], which cuts each cycle once at the back
//! edges of a search from the cycle's entry task; a cut predecessor
//! contributes nothing. Every task and link is visited once.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::graph::TaskCollection;
use crate::interner::NodeId;
use crate::log_debug;
use crate::subgraph::Subgraph;

/// Cumulative effort of every task in a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffortSummary {
    pub cumulative_effort: FxHashMap<String, f64>,
    /// Tasks without successors, in collection order.
    pub final_task_ids: Vec<String>,
}

impl EffortSummary {
    pub fn get(&self, id: &str) -> Option<f64> {
        self.cumulative_effort.get(id).copied()
    }
}

/// Compute cumulative effort for every task of `collection`.
pub fn aggregate_effort(collection: &TaskCollection, config: &EngineConfig) -> EffortSummary {
    let sub = Subgraph::new(collection.iter());
    let order = sub.evaluation_order();
    let mut values = vec![0.0_f64; sub.len()];

    for &node in &order.order {
        let idx = node as usize;
        let mut best_pred = 0.0_f64;
        for &pred in &sub.preds[idx] {
            if order.keeps(pred, node) {
                best_pred = best_pred.max(values[pred as usize]);
            } else {
                log_debug!(
                    config.verbosity,
                    "[effort] {} -> {} cut by a cycle",
                    sub.id(pred),
                    sub.id(node)
                );
            }
        }
        values[idx] = sub.efforts[idx] + best_pred;
    }
    log_debug!(
        config.verbosity,
        "[effort] {} tasks, {} links cut",
        sub.len(),
        order.cut_links
    );

    let cumulative_effort = (0..sub.len() as NodeId)
        .map(|node| (sub.id(node).to_string(), values[node as usize]))
        .collect();
    let final_task_ids = collection
        .iter()
        .filter(|t| t.successors.is_empty())
        .map(|t| t.id.clone())
        .collect();

    EffortSummary {
        cumulative_effort,
        final_task_ids,
    }
}

/// Write `cumulative_effort` and `is_final_node` into the tasks.
pub fn apply_effort(collection: &mut TaskCollection, summary: &EffortSummary) {
    let ids: Vec<String> = collection.ids().to_vec();
    for id in ids {
        if let Some(task) = collection.get_mut(&id) {
            task.cumulative_effort = summary.get(&id);
            task.is_final_node = task.successors.is_empty();
        }
    }
}
