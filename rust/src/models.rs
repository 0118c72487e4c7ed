//! Core data types for the process-graph engine.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hierarchy level of a task.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    L5,
    L6,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::L5 => "L5",
            Level::L6 => "L6",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A level tag that is neither "L5" nor "L6".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown hierarchy level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L5" | "l5" => Ok(Level::L5),
            "L6" | "l6" => Ok(Level::L6),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

/// One raw row handed over by the ingestion layer.
///
/// Link lists are already tokenized. `None` means the column is not supplied
/// for this row's level, `Some(vec![])` means it was supplied and left empty.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[pyo3(get, set)]
    pub level: Level,
    #[pyo3(get, set)]
    pub l4: Option<String>,
    #[pyo3(get, set)]
    pub l5: Option<String>,
    #[pyo3(get, set)]
    pub l6: Option<String>,
    #[pyo3(get, set)]
    pub team: Option<String>,
    /// P
    #[pyo3(get, set)]
    #[serde(default)]
    pub headcount: f64,
    /// T, in weeks
    #[pyo3(get, set)]
    #[serde(default)]
    pub duration_weeks: f64,
    /// MM
    #[pyo3(get, set)]
    #[serde(default)]
    pub effort: f64,
    #[pyo3(get, set)]
    pub definition: Option<String>,
    #[pyo3(get, set)]
    pub predecessors: Option<Vec<String>>,
    #[pyo3(get, set)]
    pub successors: Option<Vec<String>>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub preceding_parents: Vec<String>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub following_parents: Vec<String>,
}

#[pymethods]
impl TaskRecord {
    #[new]
    #[pyo3(signature = (
        level,
        l4=None,
        l5=None,
        l6=None,
        team=None,
        headcount=0.0,
        duration_weeks=0.0,
        effort=0.0,
        definition=None,
        predecessors=None,
        successors=None,
        preceding_parents=None,
        following_parents=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        level: Level,
        l4: Option<String>,
        l5: Option<String>,
        l6: Option<String>,
        team: Option<String>,
        headcount: f64,
        duration_weeks: f64,
        effort: f64,
        definition: Option<String>,
        predecessors: Option<Vec<String>>,
        successors: Option<Vec<String>>,
        preceding_parents: Option<Vec<String>>,
        following_parents: Option<Vec<String>>,
    ) -> Self {
        Self {
            level,
            l4,
            l5,
            l6,
            team,
            headcount,
            duration_weeks,
            effort,
            definition,
            predecessors,
            successors,
            preceding_parents: preceding_parents.unwrap_or_default(),
            following_parents: following_parents.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskRecord(level={}, l5={:?}, l6={:?}, P={}, T={}, MM={})",
            self.level, self.l5, self.l6, self.headcount, self.duration_weeks, self.effort
        )
    }
}

impl TaskRecord {
    fn empty(level: Level) -> Self {
        Self {
            level,
            l4: None,
            l5: None,
            l6: None,
            team: None,
            headcount: 0.0,
            duration_weeks: 0.0,
            effort: 0.0,
            definition: None,
            predecessors: None,
            successors: None,
            preceding_parents: Vec::new(),
            following_parents: Vec::new(),
        }
    }

    /// An L5 row. Both link columns are supplied (empty) at this level.
    pub fn l5(category: &str, id: &str) -> Self {
        Self {
            l4: Some(category.to_string()),
            l5: Some(id.to_string()),
            predecessors: Some(Vec::new()),
            successors: Some(Vec::new()),
            ..Self::empty(Level::L5)
        }
    }

    /// An L6 row under `parent`. Only the successor column is supplied at this level.
    pub fn l6(category: &str, parent: &str, id: &str) -> Self {
        Self {
            l4: Some(category.to_string()),
            l5: Some(parent.to_string()),
            l6: Some(id.to_string()),
            successors: Some(Vec::new()),
            ..Self::empty(Level::L6)
        }
    }

    /// Set P, T and MM.
    pub fn with_resources(mut self, headcount: f64, duration_weeks: f64, effort: f64) -> Self {
        self.headcount = headcount;
        self.duration_weeks = duration_weeks;
        self.effort = effort;
        self
    }

    pub fn with_predecessors<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_successors<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.successors = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    /// Set the cross-level L5 references of an L6 row.
    pub fn with_parent_links(mut self, preceding: &[&str], following: &[&str]) -> Self {
        self.preceding_parents = preceding.iter().map(|s| s.to_string()).collect();
        self.following_parents = following.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Link lists as the input declared them, after id resolution but before
/// edge synchronization.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DeclaredLinks {
    pub predecessors: Option<Vec<String>>,
    pub successors: Option<Vec<String>>,
}

/// A task in one of the two hierarchy collections.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub level: Level,
    #[pyo3(get)]
    pub category: String,
    #[pyo3(get)]
    pub team: Option<String>,
    #[pyo3(get)]
    pub definition: Option<String>,
    /// P
    #[pyo3(get)]
    pub headcount: f64,
    /// T, in weeks
    #[pyo3(get)]
    pub duration_weeks: f64,
    /// MM
    #[pyo3(get)]
    pub effort: f64,
    #[pyo3(get)]
    pub predecessors: Vec<String>,
    #[pyo3(get)]
    pub successors: Vec<String>,
    #[pyo3(get)]
    pub has_cycle: bool,
    #[pyo3(get)]
    pub is_final_node: bool,
    /// Set for L5 tasks once effort aggregation has run.
    #[pyo3(get)]
    pub cumulative_effort: Option<f64>,
    /// Owning L5 id (L6 only).
    #[pyo3(get)]
    pub parent_id: Option<String>,
    /// Ids of L6 children (L5 only).
    #[pyo3(get)]
    pub children: Vec<String>,
    #[pyo3(get)]
    pub preceding_parents: Vec<String>,
    #[pyo3(get)]
    pub following_parents: Vec<String>,
    #[pyo3(get)]
    pub is_placeholder: bool,
    #[serde(skip)]
    pub(crate) declared: DeclaredLinks,
}

#[pymethods]
impl Task {
    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, level={}, P={}, T={}, MM={}, preds={}, succs={})",
            self.id,
            self.level,
            self.headcount,
            self.duration_weeks,
            self.effort,
            self.predecessors.len(),
            self.successors.len()
        )
    }
}

impl Task {
    /// A task with no links and zero resources.
    pub fn new(id: &str, level: Level, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: display_name(id, level),
            level,
            category: category.to_string(),
            team: None,
            definition: None,
            headcount: 0.0,
            duration_weeks: 0.0,
            effort: 0.0,
            predecessors: Vec::new(),
            successors: Vec::new(),
            has_cycle: false,
            is_final_node: false,
            cumulative_effort: None,
            parent_id: None,
            children: Vec::new(),
            preceding_parents: Vec::new(),
            following_parents: Vec::new(),
            is_placeholder: false,
            declared: DeclaredLinks::default(),
        }
    }

    /// Id as written in the input, without the `parent::` namespace of L6 tasks.
    pub fn local_id(&self) -> &str {
        match &self.parent_id {
            Some(parent) => self
                .id
                .strip_prefix(parent.as_str())
                .and_then(|rest| rest.strip_prefix(L6_SEPARATOR))
                .unwrap_or(&self.id),
            None => &self.id,
        }
    }
}

/// Separator between parent id and local id in namespaced L6 ids.
pub const L6_SEPARATOR: &str = "::";

/// Namespace an L6 id under its L5 parent.
pub fn l6_key(parent: &str, local: &str) -> String {
    format!("{}{}{}", parent, L6_SEPARATOR, local)
}

/// Strip one leading `[Category]` tag (optionally followed by `_`) and trim.
pub fn strip_category_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            let after = &rest[close + 1..];
            return after.strip_prefix('_').unwrap_or(after).trim();
        }
    }
    text.trim()
}

/// Display name for a task id with its category prefix removed. L6 ids drop
/// their `parent::` namespace first; L5 ids are taken whole.
pub fn display_name(id: &str, level: Level) -> String {
    let local = match level {
        Level::L5 => id,
        Level::L6 => id.rsplit(L6_SEPARATOR).next().unwrap_or(id),
    };
    strip_category_prefix(local).to_string()
}

/// Categories of graph defects.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    MissingPredecessor,
    MissingSuccessor,
    BidirectionalError,
    SelfLoopError,
    CaseMismatch,
    EmptyPredecessorButReferenced,
    EmptySuccessorButReferenced,
    MissingCrossLevelReference,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingPredecessor => "missing_predecessor",
            Self::MissingSuccessor => "missing_successor",
            Self::BidirectionalError => "bidirectional_error",
            Self::SelfLoopError => "self_loop_error",
            Self::CaseMismatch => "case_mismatch",
            Self::EmptyPredecessorButReferenced => "empty_predecessor_but_referenced",
            Self::EmptySuccessorButReferenced => "empty_successor_but_referenced",
            Self::MissingCrossLevelReference => "missing_cross_level_reference",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reported (never thrown) graph defect.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[pyo3(get)]
    pub kind: ValidationErrorKind,
    #[pyo3(get)]
    pub source_task_id: String,
    #[pyo3(get)]
    pub source_level: Level,
    #[pyo3(get)]
    pub related_task_id: Option<String>,
    #[pyo3(get)]
    pub missing_task_id: Option<String>,
    #[pyo3(get)]
    pub description: String,
}

#[pymethods]
impl ValidationError {
    fn __repr__(&self) -> String {
        format!(
            "ValidationError(kind={}, source={:?}, level={})",
            self.kind, self.source_task_id, self.source_level
        )
    }
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        source: &Task,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source_task_id: source.id.clone(),
            source_level: source.level,
            related_task_id: None,
            missing_task_id: None,
            description: description.into(),
        }
    }

    pub fn related(mut self, id: &str) -> Self {
        self.related_task_id = Some(id.to_string());
        self
    }

    pub fn missing(mut self, id: &str) -> Self {
        self.missing_task_id = Some(id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("L5".parse::<Level>(), Ok(Level::L5));
        assert_eq!(" L6 ".parse::<Level>(), Ok(Level::L6));
        assert_eq!(
            "L4".parse::<Level>(),
            Err(ParseLevelError("L4".to_string()))
        );
    }

    #[test]
    fn test_strip_category_prefix() {
        assert_eq!(strip_category_prefix("[Sensor]_Calibrate"), "Calibrate");
        assert_eq!(strip_category_prefix("[Sensor] Calibrate "), "Calibrate");
        assert_eq!(strip_category_prefix("Calibrate"), "Calibrate");
        // Only the leading tag is stripped
        assert_eq!(strip_category_prefix("A [B]"), "A [B]");
        // Unclosed bracket is left alone
        assert_eq!(strip_category_prefix("[Open"), "[Open");
    }

    #[test]
    fn test_display_name_uses_local_part() {
        assert_eq!(display_name("P1::[QA]_Inspect", Level::L6), "Inspect");
        assert_eq!(display_name("[QA]_Plan", Level::L5), "Plan");
        // "::" inside an L5 id is part of the name
        assert_eq!(display_name("[QA]_Plan::v2", Level::L5), "Plan::v2");
    }

    #[test]
    fn test_local_id() {
        let mut task = Task::new(&l6_key("P1", "step"), Level::L6, "cat");
        task.parent_id = Some("P1".to_string());
        assert_eq!(task.local_id(), "step");

        let l5 = Task::new("P1", Level::L5, "cat");
        assert_eq!(l5.local_id(), "P1");
    }

    #[test]
    fn test_kind_names_match_serde() {
        let json = serde_json::to_string(&ValidationErrorKind::EmptySuccessorButReferenced)
            .unwrap();
        assert_eq!(json, "\"empty_successor_but_referenced\"");
        assert_eq!(
            ValidationErrorKind::MissingCrossLevelReference.to_string(),
            "missing_cross_level_reference"
        );
    }

    #[test]
    fn test_record_builders() {
        let rec = TaskRecord::l6("Build", "P1", "step")
            .with_resources(2.0, 3.0, 1.5)
            .with_successors(["next"])
            .with_parent_links(&["P0"], &[]);
        assert_eq!(rec.level, Level::L6);
        assert_eq!(rec.predecessors, None);
        assert_eq!(rec.successors, Some(vec!["next".to_string()]));
        assert_eq!(rec.preceding_parents, vec!["P0".to_string()]);
    }
}
