//! Graph construction from raw task records.

use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::models::{
    l6_key, strip_category_prefix, DeclaredLinks, Level, Task, TaskRecord, ValidationError,
    ValidationErrorKind,
};
use crate::{log_changes, log_checks, log_debug};

use super::{Resolution, TaskCollection, TaskGraph};

/// Result of graph construction.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Graph with resolved ids and symmetric links between present tasks.
    pub graph: TaskGraph,
    /// `case_mismatch` errors found while resolving link tokens.
    pub errors: Vec<ValidationError>,
    /// Records dropped because they lacked the id their level requires.
    pub skipped_records: usize,
}

/// Incremental builder: feed records with [`GraphBuilder::add_record`], then
/// [`GraphBuilder::finish`].
pub struct GraphBuilder<'c> {
    config: &'c EngineConfig,
    graph: TaskGraph,
    skipped_records: usize,
}

impl<'c> GraphBuilder<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            graph: TaskGraph::default(),
            skipped_records: 0,
        }
    }

    /// Upsert the task a record describes.
    ///
    /// The first record for an id supplies every scalar field; link tokens of
    /// later duplicates are merged in.
    pub fn add_record(&mut self, record: &TaskRecord) {
        let verbosity = self.config.verbosity;
        let (id, parent) = match record.level {
            Level::L5 => match non_empty(record.l5.as_deref()) {
                Some(l5) => (l5.to_string(), None),
                None => {
                    log_checks!(verbosity, "[build] skipping L5 record without an L5 id");
                    self.skipped_records += 1;
                    return;
                }
            },
            Level::L6 => match (non_empty(record.l5.as_deref()), non_empty(record.l6.as_deref())) {
                (Some(l5), Some(l6)) => (l6_key(l5, l6), Some(l5)),
                _ => {
                    log_checks!(verbosity, "[build] skipping L6 record without L5/L6 ids");
                    self.skipped_records += 1;
                    return;
                }
            },
        };

        let predecessors = record
            .predecessors
            .as_ref()
            .map(|tokens| clean_tokens(tokens, parent));
        let successors = record
            .successors
            .as_ref()
            .map(|tokens| clean_tokens(tokens, parent));
        let preceding_parents = clean_tokens(&record.preceding_parents, None);
        let following_parents = clean_tokens(&record.following_parents, None);

        let collection = self.graph.collection_mut(record.level);
        if let Some(existing) = collection.get_mut(&id) {
            log_debug!(verbosity, "[build] merging duplicate record for {}", id);
            merge_declared(&mut existing.declared.predecessors, predecessors);
            merge_declared(&mut existing.declared.successors, successors);
            extend_unique(&mut existing.preceding_parents, preceding_parents);
            extend_unique(&mut existing.following_parents, following_parents);
            return;
        }

        let category = record
            .l4
            .as_deref()
            .map(strip_category_prefix)
            .unwrap_or_default();
        let mut task = Task::new(&id, record.level, category);
        task.team = record.team.clone();
        task.definition = record.definition.clone();
        task.headcount = sanitize(record.headcount, "P", &id, verbosity);
        task.duration_weeks = sanitize(record.duration_weeks, "T", &id, verbosity);
        task.effort = sanitize(record.effort, "MM", &id, verbosity);
        task.parent_id = parent.map(str::to_string);
        task.name = strip_category_prefix(task.local_id()).to_string();
        task.preceding_parents = preceding_parents;
        task.following_parents = following_parents;
        task.declared = DeclaredLinks {
            predecessors,
            successors,
        };
        collection.insert(task);
    }

    /// Resolve link tokens, roll child figures up into parents and make links symmetric.
    pub fn finish(mut self) -> BuildOutput {
        let verbosity = self.config.verbosity;
        self.attach_children();

        let mut errors = Vec::new();
        resolve_links(&mut self.graph.l5, &mut errors);
        resolve_links(&mut self.graph.l6, &mut errors);

        self.roll_up_children();
        synchronize_edges(&mut self.graph.l5, verbosity);
        synchronize_edges(&mut self.graph.l6, verbosity);

        BuildOutput {
            graph: self.graph,
            errors,
            skipped_records: self.skipped_records,
        }
    }

    fn attach_children(&mut self) {
        let TaskGraph { l5, l6 } = &mut self.graph;
        for child in l6.iter() {
            let Some(parent_id) = child.parent_id.as_deref() else {
                continue;
            };
            if let Some(parent) = l5.get_mut(parent_id) {
                parent.children.push(child.id.clone());
            }
        }
    }

    /// P, T and MM of an L5 task with children become the sums over its children.
    fn roll_up_children(&mut self) {
        let verbosity = self.config.verbosity;
        let TaskGraph { l5, l6 } = &mut self.graph;
        let totals: Vec<(String, f64, f64, f64)> = l5
            .iter()
            .filter(|parent| !parent.children.is_empty())
            .map(|parent| {
                let (mut p, mut t, mut mm) = (0.0, 0.0, 0.0);
                for child in parent.children.iter().filter_map(|id| l6.get(id)) {
                    p += child.headcount;
                    t += child.duration_weeks;
                    mm += child.effort;
                }
                (parent.id.clone(), p, t, mm)
            })
            .collect();

        for (id, p, t, mm) in totals {
            if let Some(parent) = l5.get_mut(&id) {
                log_changes!(
                    verbosity,
                    "[build] {} rolled up from children: P={} T={} MM={}",
                    id,
                    p,
                    t,
                    mm
                );
                parent.headcount = p;
                parent.duration_weeks = t;
                parent.effort = mm;
            }
        }
    }
}

/// Build a graph from records in one call.
pub fn build_graph(records: &[TaskRecord], config: &EngineConfig) -> BuildOutput {
    let mut builder = GraphBuilder::new(config);
    for record in records {
        builder.add_record(record);
    }
    builder.finish()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Trim, drop empty tokens, namespace under `parent` when given, deduplicate.
fn clean_tokens(tokens: &[String], parent: Option<&str>) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let cleaned = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| match parent {
            Some(p) => l6_key(p, t),
            None => t.to_string(),
        });
    extend_unique(&mut out, cleaned);
    out
}

fn extend_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

fn merge_declared(target: &mut Option<Vec<String>>, extra: Option<Vec<String>>) {
    let Some(extra) = extra else {
        return;
    };
    match target {
        Some(list) => extend_unique(list, extra),
        None => *target = Some(extra),
    }
}

fn sanitize(value: f64, field: &str, id: &str, verbosity: u8) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log_checks!(verbosity, "[build] {} has invalid {}={}, using 0", id, field, value);
        0.0
    }
}

/// Replace every declared token by the id it resolves to, recording
/// `case_mismatch` when only a case-insensitive match exists.
fn resolve_links(collection: &mut TaskCollection, errors: &mut Vec<ValidationError>) {
    let ids: Vec<String> = collection.ids().to_vec();
    for id in ids {
        let Some(task) = collection.get(&id) else {
            continue;
        };
        let predecessors = task
            .declared
            .predecessors
            .as_ref()
            .map(|tokens| resolve_tokens(collection, task, tokens, "predecessor", errors));
        let successors = task
            .declared
            .successors
            .as_ref()
            .map(|tokens| resolve_tokens(collection, task, tokens, "successor", errors));

        if let Some(task) = collection.get_mut(&id) {
            task.predecessors = predecessors.clone().unwrap_or_default();
            task.successors = successors.clone().unwrap_or_default();
            task.declared = DeclaredLinks {
                predecessors,
                successors,
            };
        }
    }
}

fn resolve_tokens(
    collection: &TaskCollection,
    task: &Task,
    tokens: &[String],
    role: &str,
    errors: &mut Vec<ValidationError>,
) -> Vec<String> {
    let mut resolved = Vec::with_capacity(tokens.len());
    for token in tokens {
        let id = match collection.resolve(token) {
            Resolution::Exact(id) => id,
            Resolution::CaseInsensitive(id) => {
                errors.push(
                    ValidationError::new(
                        ValidationErrorKind::CaseMismatch,
                        task,
                        format!(
                            "{} task \"{}\" lists {} \"{}\" whose case differs from existing id \"{}\"",
                            task.level, task.name, role, token, id
                        ),
                    )
                    .related(&id),
                );
                id
            }
            // Left dangling; the validator materializes a placeholder.
            Resolution::Missing => token.clone(),
        };
        if !resolved.contains(&id) {
            resolved.push(id);
        }
    }
    resolved
}

/// Mirror every link between two present tasks onto the other endpoint.
fn synchronize_edges(collection: &mut TaskCollection, verbosity: u8) {
    let mut edges: Vec<(String, String)> = Vec::new();
    for task in collection.iter() {
        for succ in &task.successors {
            edges.push((task.id.clone(), succ.clone()));
        }
        for pred in &task.predecessors {
            edges.push((pred.clone(), task.id.clone()));
        }
    }

    let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
    for (from, to) in edges {
        if !collection.contains(&from) || !collection.contains(&to) {
            continue;
        }
        if !seen.insert((from.clone(), to.clone())) {
            continue;
        }
        if let Some(source) = collection.get_mut(&from) {
            if !source.successors.contains(&to) {
                log_debug!(verbosity, "[build] mirrored {} -> {} into successors", from, to);
                source.successors.push(to.clone());
            }
        }
        if let Some(target) = collection.get_mut(&to) {
            if !target.predecessors.contains(&from) {
                log_debug!(verbosity, "[build] mirrored {} -> {} into predecessors", from, to);
                target.predecessors.push(from);
            }
        }
    }
}
