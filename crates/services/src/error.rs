//! Shared error types for the services crate.

use thiserror::Error;

use onboard_core::error::ResourceError;
use onboard_core::model::{PathId, StepActionError, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Coarse classification for outer transports (status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    Conflict,
    Internal,
}

impl From<&StorageError> for ErrorKind {
    fn from(err: &StorageError) -> Self {
        match err {
            StorageError::NotFound => ErrorKind::NotFound,
            StorageError::Conflict => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }
}

impl From<&ResourceError> for ErrorKind {
    fn from(_: &ResourceError) -> Self {
        ErrorKind::NotFound
    }
}

/// Errors emitted by `AchievementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AchievementError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AchievementError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AchievementError::Storage(e) => e.into(),
        }
    }
}

/// Errors emitted by `OnboardingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OnboardingError {
    #[error("user {0} has no onboarding record")]
    NoRecord(UserId),
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
    #[error("unknown task {task} in phase {phase}")]
    UnknownTask { phase: String, task: String },
    #[error(transparent)]
    Achievement(#[from] AchievementError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OnboardingError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OnboardingError::NoRecord(_)
            | OnboardingError::UnknownPhase(_)
            | OnboardingError::UnknownTask { .. } => ErrorKind::NotFound,
            OnboardingError::Achievement(e) => e.kind(),
            OnboardingError::Storage(e) => e.into(),
        }
    }
}

/// Errors emitted by `KnowledgePathService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KnowledgePathError {
    #[error("unknown knowledge path: {0}")]
    UnknownPath(PathId),
    #[error(transparent)]
    Step(#[from] StepActionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl KnowledgePathError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            KnowledgePathError::UnknownPath(_) => ErrorKind::NotFound,
            KnowledgePathError::Step(StepActionError::UnknownStep { .. }) => ErrorKind::NotFound,
            KnowledgePathError::Step(StepActionError::RequiredStep { .. }) => {
                ErrorKind::InvalidOperation
            }
            KnowledgePathError::Step(_) => ErrorKind::Internal,
            KnowledgePathError::Storage(e) => e.into(),
        }
    }
}

/// Errors emitted while bootstrapping the service set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_core::model::StepId;

    #[test]
    fn step_errors_classify_by_cause() {
        let required = KnowledgePathError::from(StepActionError::RequiredStep {
            step: StepId::new("step-1").unwrap(),
        });
        assert_eq!(required.kind(), ErrorKind::InvalidOperation);

        let unknown = KnowledgePathError::from(StepActionError::UnknownStep {
            path: PathId::new("api-developer").unwrap(),
            step: StepId::new("step-9").unwrap(),
        });
        assert_eq!(unknown.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn storage_errors_classify_through_wrappers() {
        let conflict = KnowledgePathError::from(StorageError::Conflict);
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let broken = OnboardingError::from(AchievementError::from(StorageError::Connection(
            "closed".into(),
        )));
        assert_eq!(broken.kind(), ErrorKind::Internal);
    }
}
