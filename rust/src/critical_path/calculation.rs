//! Path enumeration with per-node tied suffixes.

use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::interner::NodeId;
use crate::models::Task;
use crate::subgraph::Subgraph;
use crate::{log_checks, log_debug};

use super::{CriticalPathError, CriticalPathResult};

/// Longest suffixes starting at one node.
#[derive(Clone, Debug)]
struct Suffixes {
    duration: f64,
    paths: Vec<Vec<NodeId>>,
}

struct PathWalk<'a> {
    sub: &'a Subgraph,
    config: &'a EngineConfig,
    memo: Vec<Option<Suffixes>>,
    visiting: Vec<bool>,
    /// Candidate paths materialized so far.
    enumerated: usize,
}

impl<'a> PathWalk<'a> {
    fn new(sub: &'a Subgraph, config: &'a EngineConfig) -> Self {
        Self {
            sub,
            config,
            memo: vec![None; sub.len()],
            visiting: vec![false; sub.len()],
            enumerated: 0,
        }
    }

    fn charge(&mut self, paths: usize) -> Result<(), CriticalPathError> {
        self.enumerated += paths;
        match self.config.max_critical_paths {
            Some(limit) if self.enumerated > limit => {
                Err(CriticalPathError::PathBudgetExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    /// Longest suffixes from `node`, and whether a cycle cut any of them short.
    fn longest_from(&mut self, node: NodeId) -> Result<(Suffixes, bool), CriticalPathError> {
        let idx = node as usize;
        if let Some(done) = &self.memo[idx] {
            return Ok((done.clone(), false));
        }

        self.visiting[idx] = true;
        let sub = self.sub;
        let mut truncated = false;
        let mut best: Option<Suffixes> = None;
        for &succ in &sub.succs[idx] {
            if self.visiting[succ as usize] {
                truncated = true;
                continue;
            }
            let (found, succ_truncated) = self.longest_from(succ)?;
            truncated |= succ_truncated;
            best = Some(match best {
                None => found,
                Some(mut current) => {
                    if self.config.durations_tie(found.duration, current.duration) {
                        current.duration = current.duration.max(found.duration);
                        current.paths.extend(found.paths);
                        current
                    } else if found.duration > current.duration {
                        found
                    } else {
                        current
                    }
                }
            });
        }
        self.visiting[idx] = false;

        let tail = best.unwrap_or(Suffixes {
            duration: 0.0,
            paths: vec![Vec::new()],
        });
        let paths: Vec<Vec<NodeId>> = tail
            .paths
            .into_iter()
            .map(|suffix| {
                let mut path = Vec::with_capacity(suffix.len() + 1);
                path.push(node);
                path.extend(suffix);
                path
            })
            .collect();
        self.charge(paths.len())?;

        let result = Suffixes {
            duration: sub.durations[idx] + tail.duration,
            paths,
        };
        if !truncated {
            self.memo[idx] = Some(result.clone());
        }
        Ok((result, truncated))
    }
}

/// Critical paths of an already indexed subset.
pub fn critical_path_for_subgraph(
    sub: &Subgraph,
    config: &EngineConfig,
) -> Result<CriticalPathResult, CriticalPathError> {
    if sub.is_empty() {
        return Ok(CriticalPathResult::default());
    }

    let mut starts = sub.roots();
    if starts.is_empty() {
        log_checks!(
            config.verbosity,
            "[critical_path] no root among {} tasks, starting from every task",
            sub.len()
        );
        starts = (0..sub.len() as NodeId).collect();
    }

    let mut walk = PathWalk::new(sub, config);
    let mut best: Option<Suffixes> = None;
    for start in starts {
        let (found, _) = walk.longest_from(start)?;
        best = Some(match best {
            None => found,
            Some(mut current) => {
                if config.durations_tie(found.duration, current.duration) {
                    current.duration = current.duration.max(found.duration);
                    current.paths.extend(found.paths);
                    current
                } else if found.duration > current.duration {
                    found
                } else {
                    current
                }
            }
        });
    }
    log_debug!(
        config.verbosity,
        "[critical_path] {} candidate paths materialized",
        walk.enumerated
    );

    let Some(best) = best else {
        return Ok(CriticalPathResult::default());
    };

    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut all_path_node_ids = Vec::new();
    for path in &best.paths {
        for &node in path {
            if seen.insert(node) {
                all_path_node_ids.push(sub.id(node).to_string());
            }
        }
    }

    Ok(CriticalPathResult {
        paths: best
            .paths
            .iter()
            .map(|path| sub.index.resolve_all(path))
            .collect(),
        total_duration: best.duration,
        all_path_node_ids,
    })
}

/// Critical paths of a task subset. Links leaving the subset are ignored.
pub fn critical_path<'a, I>(
    tasks: I,
    config: &EngineConfig,
) -> Result<CriticalPathResult, CriticalPathError>
where
    I: IntoIterator<Item = &'a Task>,
{
    let sub = Subgraph::new(tasks);
    critical_path_for_subgraph(&sub, config)
}
