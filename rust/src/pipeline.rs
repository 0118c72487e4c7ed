//! Build, validate and aggregate a batch of records in one call.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::effort::{aggregate_effort, apply_effort};
use crate::graph::{build_graph, validate, TaskGraph};
use crate::log_changes;
use crate::models::{TaskRecord, ValidationError, ValidationErrorKind};

/// A validated graph with effort figures filled in, plus every defect found on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedGraph {
    pub graph: TaskGraph,
    /// Builder errors first, then validator errors, each in detection order.
    pub errors: Vec<ValidationError>,
    /// Records dropped for lacking the id their level requires.
    pub skipped_records: usize,
}

/// Counts of a processed batch, for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub l5_tasks: usize,
    pub l6_tasks: usize,
    pub placeholders: usize,
    pub errors: usize,
    pub skipped_records: usize,
}

impl ProcessedGraph {
    pub fn errors_of_kind(
        &self,
        kind: ValidationErrorKind,
    ) -> impl Iterator<Item = &ValidationError> + '_ {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn summary(&self) -> ProcessSummary {
        let placeholders = self
            .graph
            .l5
            .iter()
            .chain(self.graph.l6.iter())
            .filter(|t| t.is_placeholder)
            .count();
        ProcessSummary {
            l5_tasks: self.graph.l5.len(),
            l6_tasks: self.graph.l6.len(),
            placeholders,
            errors: self.errors.len(),
            skipped_records: self.skipped_records,
        }
    }
}

/// Run the whole engine over `records`.
///
/// Cumulative effort is computed for L5 tasks only; L6 tasks keep `None`.
pub fn process(records: &[TaskRecord], config: &EngineConfig) -> ProcessedGraph {
    let built = build_graph(records, config);
    let validated = validate(built.graph, config);

    let mut graph = validated.graph;
    let effort = aggregate_effort(&graph.l5, config);
    apply_effort(&mut graph.l5, &effort);

    let mut errors = built.errors;
    errors.extend(validated.errors);

    let processed = ProcessedGraph {
        graph,
        errors,
        skipped_records: built.skipped_records,
    };
    let counts = processed.summary();
    log_changes!(
        config.verbosity,
        "Processed {} records: {} L5, {} L6 ({} placeholders), {} errors, {} skipped",
        records.len(),
        counts.l5_tasks,
        counts.l6_tasks,
        counts.placeholders,
        counts.errors,
        counts.skipped_records
    );
    processed
}
