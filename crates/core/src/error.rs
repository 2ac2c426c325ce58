use thiserror::Error;

use crate::model::{PathId, StepId};

/// Problems found while loading or validating catalog configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("phase title cannot be empty")]
    EmptyPhaseTitle,

    #[error("duplicate phase: {0}")]
    DuplicatePhase(String),

    #[error("task name cannot be empty in phase {phase}")]
    EmptyTaskName { phase: String },

    #[error("duplicate task {task} in phase {phase}")]
    DuplicateTask { phase: String, task: String },

    #[error("duplicate knowledge path: {0}")]
    DuplicatePath(PathId),

    #[error("duplicate step {step} in path {path}")]
    DuplicateStep { path: PathId, step: StepId },

    #[error("invalid url for resource {name}: {reason}")]
    InvalidResourceUrl { name: String, reason: String },
}

/// Errors from the resource registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("unknown resource: {0}")]
    Unknown(String),
}
