use thiserror::Error;

use crate::core::types::LessonId;

#[derive(Error, Debug)]
pub enum PathError {
    /// The prerequisite relation is not a DAG. Carries the lessons that could
    /// not be assigned a level (every node on or downstream of a cycle).
    #[error("prerequisite graph contains a cycle involving: {remaining:?}")]
    Cycle { remaining: Vec<LessonId> },

    /// Malformed or cross-referencing-invalid input records, one message per
    /// offending record.
    #[error("data validation failed: {}", .0.join("; "))]
    DataValidation(Vec<String>),

    /// The solver proved the current planning instance infeasible. Carries the
    /// target lessons whose mastery threshold is still unmet.
    #[error("no feasible path: unmet targets {unmet_targets:?}")]
    NoFeasiblePath { unmet_targets: Vec<LessonId> },

    /// The solver exhausted its wall-clock budget without a verdict.
    #[error("solver exceeded time budget of {budget:?}")]
    SolverTimeout { budget: std::time::Duration },

    /// Internal solver fault. Always fatal, never retried.
    #[error("solver failure: {0}")]
    SolverFailure(String),

    /// Invalid clustering request (bad k, degenerate input).
    #[error("clustering error: {0}")]
    Clustering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PathError>;
