use std::sync::Arc;

use onboard_core::catalog::Catalog;
use onboard_core::error::ResourceError;
use onboard_core::model::{
    Difficulty, PathId, PathProgress, PathSummary, Phase, StepAction, StepId, UserId,
};
use storage::repository::Storage;
use url::Url;

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::error::{
    AchievementError, KnowledgePathError, OnboardingError, ServicesInitError,
};
use crate::knowledge_path_service::{KnowledgePathService, PathView};
use crate::onboarding_service::{OnboardingService, TaskUpdate};

/// Assembles the progress services over one storage backend and exposes the
/// query/mutation surface used by front ends.
#[derive(Clone)]
pub struct ProgressServices {
    catalog: Arc<Catalog>,
    onboarding: Arc<OnboardingService>,
    paths: Arc<KnowledgePathService>,
    achievements: Arc<AchievementService>,
}

impl ProgressServices {
    #[must_use]
    pub fn new(clock: Clock, catalog: Catalog, storage: &Storage) -> Self {
        let catalog = Arc::new(catalog);
        let achievements = Arc::new(AchievementService::new(
            clock,
            catalog.achievements().clone(),
            Arc::clone(&storage.achievements),
        ));
        let onboarding = Arc::new(OnboardingService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.onboarding),
            Arc::clone(&achievements),
        ));
        let paths = Arc::new(KnowledgePathService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.path_progress),
        ));
        Self {
            catalog,
            onboarding,
            paths,
            achievements,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock, catalog: Catalog) -> Self {
        Self::new(clock, catalog, &Storage::in_memory())
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ServicesInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Catalog,
    ) -> Result<Self, ServicesInitError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(clock, catalog, &storage))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn onboarding(&self) -> Arc<OnboardingService> {
        Arc::clone(&self.onboarding)
    }

    #[must_use]
    pub fn paths(&self) -> Arc<KnowledgePathService> {
        Arc::clone(&self.paths)
    }

    #[must_use]
    pub fn achievements(&self) -> Arc<AchievementService> {
        Arc::clone(&self.achievements)
    }

    /// Phases with task state. A user without a record has zero phases.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Storage` for backend failures.
    pub async fn onboarding_phases(&self, user: &UserId) -> Result<Vec<Phase>, OnboardingError> {
        match self.onboarding.get_user_phases(user).await {
            Ok(phases) => Ok(phases),
            Err(OnboardingError::NoRecord(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    ///
    /// See [`OnboardingService::toggle_task`].
    pub async fn toggle_task(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
    ) -> Result<TaskUpdate, OnboardingError> {
        self.onboarding.toggle_task(user, phase, task).await
    }

    /// # Errors
    ///
    /// Returns `AchievementError::Storage` for backend failures.
    pub async fn onboarding_achievements(
        &self,
        user: &UserId,
    ) -> Result<Vec<String>, AchievementError> {
        self.achievements.labels(user).await
    }

    #[must_use]
    pub fn knowledge_paths(
        &self,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Vec<PathSummary> {
        self.paths.list_paths(category, difficulty)
    }

    /// # Errors
    ///
    /// See [`KnowledgePathService::path_with_progress`].
    pub async fn knowledge_path(
        &self,
        path_id: &PathId,
        user: &UserId,
    ) -> Result<PathView, KnowledgePathError> {
        self.paths.path_with_progress(user, path_id).await
    }

    /// # Errors
    ///
    /// See [`KnowledgePathService::apply_step_action`].
    pub async fn knowledge_path_progress(
        &self,
        path_id: &PathId,
        user: &UserId,
        step_id: &StepId,
        action: StepAction,
    ) -> Result<PathProgress, KnowledgePathError> {
        self.paths
            .apply_step_action(user, path_id, step_id, action)
            .await
    }

    /// # Errors
    ///
    /// Returns `ResourceError::Unknown` for names without a registered URL.
    pub fn resource_url(&self, name: &str) -> Result<Url, ResourceError> {
        self.catalog.resources().resolve(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use onboard_core::time::fixed_clock;

    #[tokio::test]
    async fn missing_onboarding_record_is_an_empty_state() {
        let services = ProgressServices::in_memory(fixed_clock(), Catalog::builtin());
        let user = UserId::new("newcomer").unwrap();
        assert!(services.onboarding_phases(&user).await.unwrap().is_empty());
        assert!(services.onboarding_achievements(&user).await.unwrap().is_empty());
    }

    #[test]
    fn resource_lookup_classifies_unknown_names_as_not_found() {
        let services = ProgressServices::in_memory(fixed_clock(), Catalog::builtin());
        let url = services.resource_url("Git Guide").unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/git-guide");

        let err = services.resource_url("Secret Wiki").unwrap_err();
        assert_eq!(ErrorKind::from(&err), ErrorKind::NotFound);
    }
}
