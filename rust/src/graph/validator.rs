//! Structural validation and repair of a built graph.
//!
//! Steps run in a fixed order per level, because later checks rely on
//! earlier repairs:
//! 1. strip self-loops
//! 2. flag bidirectional pairs (reported, not repaired)
//! 3. materialize placeholders for unresolved references
//! 4. report one-sided declarations against empty lists
//! 5. check L6 -> L5 cross-level references
//!
//! Validation never fails; every defect becomes a [`ValidationError`].

use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::models::{Level, Task, ValidationError, ValidationErrorKind};
use crate::{log_changes, log_checks};

use super::{TaskCollection, TaskGraph};

/// Repaired graph plus every defect found, in detection order.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutput {
    pub graph: TaskGraph,
    pub errors: Vec<ValidationError>,
}

/// Which side of the referencing task the missing id was declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingSide {
    Predecessor,
    Successor,
}

/// A reference to an id absent from its collection.
struct MissingRef {
    missing_id: String,
    referrer_id: String,
    referrer_parent: Option<String>,
    side: MissingSide,
}

/// Validate and repair `graph`.
pub fn validate(mut graph: TaskGraph, config: &EngineConfig) -> ValidationOutput {
    let mut errors = Vec::new();

    for level in [Level::L5, Level::L6] {
        strip_self_loops(graph.collection_mut(level), config, &mut errors);
    }
    for level in [Level::L5, Level::L6] {
        flag_bidirectional(graph.collection_mut(level), config, &mut errors);
    }
    for level in [Level::L5, Level::L6] {
        materialize_missing(&mut graph, level, config, &mut errors);
    }
    for level in [Level::L5, Level::L6] {
        check_empty_but_referenced(graph.collection(level), config, &mut errors);
    }
    check_cross_level(&graph, config, &mut errors);

    for level in [Level::L5, Level::L6] {
        let collection = graph.collection_mut(level);
        let ids: Vec<String> = collection.ids().to_vec();
        for id in ids {
            if let Some(task) = collection.get_mut(&id) {
                task.is_final_node = task.successors.is_empty();
            }
        }
    }

    ValidationOutput { graph, errors }
}

fn kind_label(level: Level) -> &'static str {
    match level {
        Level::L5 => "process",
        Level::L6 => "activity",
    }
}

fn strip_self_loops(
    collection: &mut TaskCollection,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let ids: Vec<String> = collection.ids().to_vec();
    for id in ids {
        let Some(task) = collection.get_mut(&id) else {
            continue;
        };
        if !task.predecessors.contains(&id) && !task.successors.contains(&id) {
            continue;
        }
        log_checks!(config.verbosity, "[validate] self-loop on {}", id);
        errors.push(ValidationError::new(
            ValidationErrorKind::SelfLoopError,
            task,
            format!(
                "{} {} \"{}\" references itself as a predecessor or successor",
                task.level,
                kind_label(task.level),
                task.name
            ),
        ));
        task.predecessors.retain(|p| p != &id);
        task.successors.retain(|s| s != &id);
        log_changes!(config.verbosity, "[validate] stripped self-loop from {}", id);
    }
}

/// Mark every task with a successor that lists it back as a successor.
/// One error per pair, reported from the lexicographically smaller id.
fn flag_bidirectional(
    collection: &mut TaskCollection,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let mut cyclic: FxHashSet<String> = FxHashSet::default();
    for task in collection.iter() {
        for succ_id in &task.successors {
            let Some(succ) = collection.get(succ_id) else {
                continue;
            };
            if !succ.successors.contains(&task.id) {
                continue;
            }
            cyclic.insert(task.id.clone());
            if task.id < *succ_id {
                log_checks!(
                    config.verbosity,
                    "[validate] bidirectional link {} <-> {}",
                    task.id,
                    succ_id
                );
                errors.push(
                    ValidationError::new(
                        ValidationErrorKind::BidirectionalError,
                        task,
                        format!(
                            "{} tasks \"{}\" and \"{}\" are each other's predecessor and successor",
                            task.level,
                            task.name,
                            succ.name
                        ),
                    )
                    .related(succ_id),
                );
            }
        }
    }

    let ids: Vec<String> = collection.ids().to_vec();
    for id in ids {
        if let Some(task) = collection.get_mut(&id) {
            task.has_cycle = cyclic.contains(&id);
        }
    }
}

/// Report each reference to an absent id and give it a placeholder task
/// carrying exactly the referencing edge.
fn materialize_missing(
    graph: &mut TaskGraph,
    level: Level,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let collection = graph.collection(level);
    let mut missing: Vec<MissingRef> = Vec::new();

    for task in collection.iter() {
        for (side, ids) in [
            (MissingSide::Predecessor, &task.predecessors),
            (MissingSide::Successor, &task.successors),
        ] {
            for id in ids.iter().filter(|id| !collection.contains(id)) {
                let (kind, role) = match side {
                    MissingSide::Predecessor => {
                        (ValidationErrorKind::MissingPredecessor, "predecessor")
                    }
                    MissingSide::Successor => (ValidationErrorKind::MissingSuccessor, "successor"),
                };
                log_checks!(
                    config.verbosity,
                    "[validate] {} {} of {} not found",
                    role,
                    id,
                    task.id
                );
                errors.push(
                    ValidationError::new(
                        kind,
                        task,
                        format!(
                            "{} {} \"{}\": {} \"{}\" not found",
                            task.level,
                            kind_label(task.level),
                            task.name,
                            role,
                            id
                        ),
                    )
                    .missing(id),
                );
                missing.push(MissingRef {
                    missing_id: id.clone(),
                    referrer_id: task.id.clone(),
                    referrer_parent: task.parent_id.clone(),
                    side,
                });
            }
        }
    }

    for reference in missing {
        if !graph.collection(level).contains(&reference.missing_id) {
            insert_placeholder(graph, level, &reference, config);
        }
        let Some(placeholder) = graph
            .collection_mut(level)
            .get_mut(&reference.missing_id)
        else {
            continue;
        };
        let edges = match reference.side {
            MissingSide::Predecessor => &mut placeholder.successors,
            MissingSide::Successor => &mut placeholder.predecessors,
        };
        if !edges.contains(&reference.referrer_id) {
            edges.push(reference.referrer_id);
        }
    }
}

fn insert_placeholder(
    graph: &mut TaskGraph,
    level: Level,
    reference: &MissingRef,
    config: &EngineConfig,
) {
    let mut placeholder = Task::new(&reference.missing_id, level, &config.unspecified_category);
    placeholder.is_placeholder = true;
    if level == Level::L6 {
        placeholder.parent_id = reference.referrer_parent.clone();
        if let Some(parent) = reference
            .referrer_parent
            .as_deref()
            .and_then(|p| graph.l5.get_mut(p))
        {
            parent.children.push(reference.missing_id.clone());
        }
    }
    log_changes!(
        config.verbosity,
        "[validate] inserted placeholder {} ({})",
        reference.missing_id,
        level
    );
    graph.collection_mut(level).insert(placeholder);
}

/// Report tasks whose declared list is empty while another task declares
/// the opposite link to them. Runs on the pre-synchronization declarations.
fn check_empty_but_referenced(
    collection: &TaskCollection,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let declared_empty = |list: &Option<Vec<String>>| list.as_ref().is_some_and(|l| l.is_empty());
    let declares = |list: &Option<Vec<String>>, id: &str| {
        list.as_ref().is_some_and(|l| l.iter().any(|x| x == id))
    };

    for task in collection.iter() {
        if declared_empty(&task.declared.predecessors) {
            for other in collection.iter() {
                if other.id != task.id && declares(&other.declared.successors, task.id.as_str()) {
                    log_checks!(
                        config.verbosity,
                        "[validate] {} has no predecessors but {} lists it as successor",
                        task.id,
                        other.id
                    );
                    errors.push(
                        ValidationError::new(
                            ValidationErrorKind::EmptyPredecessorButReferenced,
                            task,
                            format!(
                                "{} {} \"{}\" has no predecessors but \"{}\" lists it as a successor",
                                task.level,
                                kind_label(task.level),
                                task.name,
                                other.name
                            ),
                        )
                        .related(&other.id),
                    );
                }
            }
        }

        if declared_empty(&task.declared.successors) {
            for other in collection.iter() {
                if other.id != task.id && declares(&other.declared.predecessors, task.id.as_str()) {
                    log_checks!(
                        config.verbosity,
                        "[validate] {} has no successors but {} lists it as predecessor",
                        task.id,
                        other.id
                    );
                    errors.push(
                        ValidationError::new(
                            ValidationErrorKind::EmptySuccessorButReferenced,
                            task,
                            format!(
                                "{} {} \"{}\" has no successors but \"{}\" lists it as a predecessor",
                                task.level,
                                kind_label(task.level),
                                task.name,
                                other.name
                            ),
                        )
                        .related(&other.id),
                    );
                }
            }
        }
    }
}

/// Every L6 parent and preceding/following L5 reference must name an L5 task.
fn check_cross_level(graph: &TaskGraph, config: &EngineConfig, errors: &mut Vec<ValidationError>) {
    for task in graph.l6.iter() {
        let parent = task
            .parent_id
            .iter()
            .map(|id| ("parent", id))
            .filter(|_| !task.is_placeholder);
        let preceding = task.preceding_parents.iter().map(|id| ("preceding L5", id));
        let following = task.following_parents.iter().map(|id| ("following L5", id));

        for (role, l5_id) in parent.chain(preceding).chain(following) {
            if graph.l5.contains(l5_id) {
                continue;
            }
            log_checks!(
                config.verbosity,
                "[validate] {} of {} not found: {}",
                role,
                task.id,
                l5_id
            );
            errors.push(
                ValidationError::new(
                    ValidationErrorKind::MissingCrossLevelReference,
                    task,
                    format!(
                        "L6 activity \"{}\": {} \"{}\" not found",
                        task.name, role, l5_id
                    ),
                )
                .missing(l5_id),
            );
        }
    }
}
