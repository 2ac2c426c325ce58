use std::collections::HashMap;
use std::sync::Arc;

use onboard_core::catalog::Catalog;
use onboard_core::model::{
    Difficulty, KnowledgePath, PathId, PathProgress, PathSummary, StepAction, StepActionError,
    StepId, UserId,
};
use serde::Serialize;
use storage::repository::{PathProgressRepository, StorageError};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::KnowledgePathError;
use crate::locks::KeyedLocks;

/// A catalog path together with one user's progress through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathView {
    pub path: KnowledgePath,
    pub progress: PathProgress,
}

/// Tracks per-user progress through knowledge paths.
pub struct KnowledgePathService {
    clock: Clock,
    catalog: Arc<Catalog>,
    progress: Arc<dyn PathProgressRepository>,
    locks: KeyedLocks<(UserId, PathId)>,
}

impl KnowledgePathService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        progress: Arc<dyn PathProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            locks: KeyedLocks::new(),
        }
    }

    /// Catalog summaries, optionally filtered by category and difficulty.
    #[must_use]
    pub fn list_paths(
        &self,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Vec<PathSummary> {
        self.catalog.path_summaries(category, difficulty)
    }

    /// # Errors
    ///
    /// Returns `KnowledgePathError::UnknownPath` for ids not in the catalog.
    pub fn get_path(&self, path_id: &PathId) -> Result<&KnowledgePath, KnowledgePathError> {
        self.catalog
            .path(path_id)
            .ok_or_else(|| KnowledgePathError::UnknownPath(path_id.clone()))
    }

    /// Stored progress, or the zero-value record when the user has not touched
    /// the path.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgePathError::UnknownPath` for ids not in the catalog and
    /// `KnowledgePathError::Storage` for backend failures.
    pub async fn get_progress(
        &self,
        user: &UserId,
        path_id: &PathId,
    ) -> Result<PathProgress, KnowledgePathError> {
        let path = self.get_path(path_id)?;
        let stored = self.progress.get_path_progress(user, &path.id).await?;
        Ok(stored.unwrap_or_else(|| PathProgress::empty(path.id.clone())))
    }

    /// # Errors
    ///
    /// Same as [`KnowledgePathService::get_progress`].
    pub async fn path_with_progress(
        &self,
        user: &UserId,
        path_id: &PathId,
    ) -> Result<PathView, KnowledgePathError> {
        let progress = self.get_progress(user, path_id).await?;
        let path = self.get_path(path_id)?.clone();
        Ok(PathView { path, progress })
    }

    /// Apply `action` to `step_id` and persist the recomputed record.
    ///
    /// Repeating an action that changes nothing does not write.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgePathError::UnknownPath` or a `StepActionError` for
    /// unknown steps and skips of required steps (the record is left as it
    /// was), and `StorageError::Conflict` when another writer saved first.
    pub async fn apply_step_action(
        &self,
        user: &UserId,
        path_id: &PathId,
        step_id: &StepId,
        action: StepAction,
    ) -> Result<PathProgress, KnowledgePathError> {
        let path = self.get_path(path_id)?;
        let _guard = self.locks.acquire((user.clone(), path.id.clone())).await;

        let stored = self.progress.get_path_progress(user, &path.id).await?;
        let mut progress = match stored {
            Some(p) => p,
            None => {
                debug!(user = %user, path_id = %path.id, "starting path progress record");
                PathProgress::empty(path.id.clone())
            }
        };
        let before = progress.clone();

        if let Err(e) = progress.apply(path, step_id, action, self.clock.now()) {
            if let StepActionError::RequiredStep { .. } = e {
                warn!(user = %user, path_id = %path.id, step_id = %step_id, "rejected skip of required step");
            }
            return Err(e.into());
        }
        if progress == before && before.version > 0 {
            return Ok(progress);
        }

        progress.version = match self.progress.save_path_progress(user, &progress).await {
            Ok(version) => version,
            Err(StorageError::Conflict) => {
                warn!(user = %user, path_id = %path.id, "path progress changed concurrently");
                return Err(StorageError::Conflict.into());
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            user = %user,
            path_id = %path.id,
            step_id = %step_id,
            action = %action,
            percentage = progress.progress_percentage,
            "step action applied"
        );
        Ok(progress)
    }

    /// Paths the user has started, with progress, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgePathError::Storage` if repository access fails.
    pub async fn user_paths(&self, user: &UserId) -> Result<Vec<PathView>, KnowledgePathError> {
        let mut by_path: HashMap<PathId, PathProgress> = self
            .progress
            .list_path_progress(user)
            .await?
            .into_iter()
            .filter(PathProgress::is_started)
            .map(|p| (p.path_id.clone(), p))
            .collect();

        Ok(self
            .catalog
            .paths()
            .iter()
            .filter_map(|path| {
                by_path.remove(&path.id).map(|progress| PathView {
                    path: path.clone(),
                    progress,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service() -> KnowledgePathService {
        KnowledgePathService::new(
            fixed_clock(),
            Arc::new(Catalog::builtin()),
            Arc::new(InMemoryRepository::new()),
        )
    }

    fn user() -> UserId {
        UserId::new("rakshitha").unwrap()
    }

    fn id(raw: &str) -> PathId {
        PathId::new(raw).unwrap()
    }

    fn step(raw: &str) -> StepId {
        StepId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn untouched_paths_read_as_zero_progress() {
        let svc = service();
        let progress = svc.get_progress(&user(), &id("api-developer")).await.unwrap();
        assert_eq!(progress, PathProgress::empty(id("api-developer")));
        assert!(svc.user_paths(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let svc = service();
        let err = svc.get_progress(&user(), &id("nonexistent")).await.unwrap_err();
        assert!(matches!(err, KnowledgePathError::UnknownPath(_)));
        let err = svc
            .apply_step_action(&user(), &id("nonexistent"), &step("step-1"), StepAction::Complete)
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgePathError::UnknownPath(_)));
    }

    #[tokio::test]
    async fn required_skip_is_rejected_and_leaves_progress() {
        let svc = service();
        let path = id("api-developer");
        svc.apply_step_action(&user(), &path, &step("step-1"), StepAction::Complete)
            .await
            .unwrap();
        let before = svc.get_progress(&user(), &path).await.unwrap();

        let err = svc
            .apply_step_action(&user(), &path, &step("step-2"), StepAction::Skip)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgePathError::Step(StepActionError::RequiredStep { .. })
        ));
        assert_eq!(svc.get_progress(&user(), &path).await.unwrap(), before);
    }

    #[tokio::test]
    async fn repeated_complete_does_not_bump_version() {
        let svc = service();
        let path = id("security-engineer");
        let first = svc
            .apply_step_action(&user(), &path, &step("step-1"), StepAction::Complete)
            .await
            .unwrap();
        let again = svc
            .apply_step_action(&user(), &path, &step("step-1"), StepAction::Complete)
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(again.version, 1);
        assert_eq!(again.started_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn user_paths_follow_catalog_order() {
        let svc = service();
        svc.apply_step_action(&user(), &id("security-engineer"), &step("step-1"), StepAction::Start)
            .await
            .unwrap();
        svc.apply_step_action(&user(), &id("new-developer"), &step("step-1"), StepAction::Complete)
            .await
            .unwrap();

        let ids: Vec<String> = svc
            .user_paths(&user())
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.path.id.to_string())
            .collect();
        assert_eq!(ids, vec!["new-developer", "security-engineer"]);
    }

    #[test]
    fn list_paths_filters_by_difficulty() {
        let svc = service();
        let all = svc.list_paths(None, None);
        assert_eq!(all.len(), 3);
        let filtered = svc.list_paths(None, Some(all[0].difficulty));
        assert!(filtered.iter().all(|s| s.difficulty == all[0].difficulty));
        assert!(!filtered.is_empty());
    }
}
