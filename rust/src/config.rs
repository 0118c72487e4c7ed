//! Configuration for the graph engine.

use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

/// Category label given to placeholder tasks created for unresolved references.
pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";

/// Settings shared by graph construction, validation and the analyses.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Two path durations closer than this are treated as tied.
    #[pyo3(get, set)]
    pub duration_epsilon: f64,
    /// Upper bound on enumerated critical-path candidates (None = unlimited).
    #[pyo3(get, set)]
    pub max_critical_paths: Option<usize>,
    /// Category assigned to placeholder tasks.
    #[pyo3(get, set)]
    pub unspecified_category: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            duration_epsilon: 1e-9,
            max_critical_paths: None,
            unspecified_category: UNSPECIFIED_CATEGORY.to_string(),
        }
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        duration_epsilon=None,
        max_critical_paths=None,
        unspecified_category=None
    ))]
    fn new(
        verbosity: Option<u8>,
        duration_epsilon: Option<f64>,
        max_critical_paths: Option<usize>,
        unspecified_category: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            duration_epsilon: duration_epsilon.unwrap_or(defaults.duration_epsilon),
            max_critical_paths,
            unspecified_category: unspecified_category.unwrap_or(defaults.unspecified_category),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(verbosity={}, duration_epsilon={}, max_critical_paths={:?})",
            self.verbosity, self.duration_epsilon, self.max_critical_paths
        )
    }
}

impl EngineConfig {
    /// Config with only the verbosity changed.
    pub fn with_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }

    /// Whether two durations count as equal under `duration_epsilon`.
    #[inline]
    pub fn durations_tie(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.duration_epsilon
    }
}
