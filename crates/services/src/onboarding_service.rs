use std::collections::HashMap;
use std::sync::Arc;

use onboard_core::aggregate;
use onboard_core::catalog::Catalog;
use onboard_core::model::{OnboardingProgress, Phase, PhaseTemplate, Task, TaskTemplate, UserId};
use serde::Serialize;
use storage::repository::{OnboardingRepository, StorageError, TaskFlagRecord};
use tracing::{debug, info};

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::error::OnboardingError;
use crate::locks::KeyedLocks;

/// Result of a task write: the task's new flag plus everything it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    pub task_completed: bool,
    pub phase_completed: bool,
    pub progress: OnboardingProgress,
    pub newly_unlocked: Vec<String>,
}

/// Aggregated progress of one user, as listed by the all-users overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProgressSummary {
    pub username: UserId,
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
}

/// Task completion flags per user, joined with the phase catalog.
pub struct OnboardingService {
    clock: Clock,
    catalog: Arc<Catalog>,
    onboarding: Arc<dyn OnboardingRepository>,
    achievements: Arc<AchievementService>,
    locks: KeyedLocks<(UserId, String)>,
}

type FlagMap = HashMap<(String, String), bool>;

#[derive(Debug, Clone, Copy)]
enum FlagWrite {
    Set(bool),
    Toggle,
}

fn flag_map(records: Vec<TaskFlagRecord>) -> FlagMap {
    records
        .into_iter()
        .map(|r| ((r.phase, r.task), r.completed))
        .collect()
}

fn build_phases(catalog: &Catalog, flags: &FlagMap) -> Vec<Phase> {
    catalog
        .phases()
        .iter()
        .map(|template| instantiate(template, flags))
        .collect()
}

fn instantiate(template: &PhaseTemplate, flags: &FlagMap) -> Phase {
    template.instantiate(|task| {
        flags
            .get(&(template.title.clone(), task.to_owned()))
            .copied()
            .unwrap_or(false)
    })
}

impl OnboardingService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        onboarding: Arc<dyn OnboardingRepository>,
        achievements: Arc<AchievementService>,
    ) -> Self {
        Self {
            clock,
            catalog,
            onboarding,
            achievements,
            locks: KeyedLocks::new(),
        }
    }

    /// Every catalog phase with this user's task flags applied.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::NoRecord` when the user has never written a
    /// task flag, and `OnboardingError::Storage` for backend failures.
    pub async fn get_user_phases(&self, user: &UserId) -> Result<Vec<Phase>, OnboardingError> {
        let flags = self.load_flags(user).await?;
        Ok(build_phases(&self.catalog, &flags))
    }

    /// Completion percentage and phase partition.
    ///
    /// A user without a record has zero phases: 0%, nothing completed, nothing
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Storage` for backend failures.
    pub async fn onboarding_progress(
        &self,
        user: &UserId,
    ) -> Result<OnboardingProgress, OnboardingError> {
        match self.get_user_phases(user).await {
            Ok(phases) => Ok(OnboardingProgress::from_phases(&phases)),
            Err(OnboardingError::NoRecord(_)) => Ok(OnboardingProgress::default()),
            Err(e) => Err(e),
        }
    }

    /// Tasks of one phase for this user. Users without a record see every
    /// task as incomplete.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::UnknownPhase` for titles not in the catalog.
    pub async fn phase_tasks(
        &self,
        user: &UserId,
        phase: &str,
    ) -> Result<Vec<Task>, OnboardingError> {
        let template = self.phase_template(phase)?;
        let flags = match self.load_flags(user).await {
            Ok(flags) => flags,
            Err(OnboardingError::NoRecord(_)) => FlagMap::new(),
            Err(e) => return Err(e),
        };
        Ok(instantiate(template, &flags).tasks().to_vec())
    }

    /// Set a task's flag explicitly. Setting the current value again is a no-op
    /// apart from the returned snapshot.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::UnknownPhase` or `OnboardingError::UnknownTask`
    /// for names missing from the catalog, and storage or achievement errors
    /// from persistence.
    pub async fn set_task_completion(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        completed: bool,
    ) -> Result<TaskUpdate, OnboardingError> {
        self.write_task(user, phase, task, FlagWrite::Set(completed))
            .await
    }

    /// Flip a task's flag.
    ///
    /// # Errors
    ///
    /// Same as [`OnboardingService::set_task_completion`].
    pub async fn toggle_task(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
    ) -> Result<TaskUpdate, OnboardingError> {
        self.write_task(user, phase, task, FlagWrite::Toggle).await
    }

    /// Phase-level progress for every user with an onboarding record.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Storage` if repository access fails.
    pub async fn progress_overview(&self) -> Result<Vec<UserProgressSummary>, OnboardingError> {
        let users = self.onboarding.list_users().await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let phases = self.get_user_phases(&user).await?;
            let completed = aggregate::completed_count(&phases);
            out.push(UserProgressSummary {
                username: user,
                total: phases.len(),
                completed,
                percentage: aggregate::percentage(completed, phases.len()),
            });
        }
        Ok(out)
    }

    async fn write_task(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        write: FlagWrite,
    ) -> Result<TaskUpdate, OnboardingError> {
        let template = self.phase_template(phase)?;
        let task_template = Self::task_template(template, task)?;

        let guard = self
            .locks
            .acquire((user.clone(), template.title.clone()))
            .await;

        let now = self.clock.now();
        if self.onboarding.ensure_user(user, now).await? {
            debug!(user = %user, "created onboarding record");
        }

        let completed = match write {
            FlagWrite::Set(completed) => {
                self.onboarding
                    .set_task_flag(user, &template.title, &task_template.name, completed, now)
                    .await?;
                completed
            }
            FlagWrite::Toggle => {
                self.onboarding
                    .toggle_task_flag(user, &template.title, &task_template.name, now)
                    .await?
            }
        };

        let flags = self.load_flags(user).await?;
        drop(guard);

        let phases = build_phases(&self.catalog, &flags);
        let phase_completed = phases
            .iter()
            .find(|p| p.title() == template.title)
            .is_some_and(Phase::is_completed);
        let progress = OnboardingProgress::from_phases(&phases);
        info!(
            user = %user,
            phase = %template.title,
            task = %task_template.name,
            completed,
            phase_completed,
            percentage = progress.percentage,
            "task updated"
        );

        let newly_unlocked = self.achievements.evaluate(user, &progress).await?;
        Ok(TaskUpdate {
            task_completed: completed,
            phase_completed,
            progress,
            newly_unlocked,
        })
    }

    async fn load_flags(&self, user: &UserId) -> Result<FlagMap, OnboardingError> {
        match self.onboarding.task_flags(user).await {
            Ok(records) => Ok(flag_map(records)),
            Err(StorageError::NotFound) => Err(OnboardingError::NoRecord(user.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn phase_template(&self, phase: &str) -> Result<&PhaseTemplate, OnboardingError> {
        self.catalog
            .phase(phase)
            .ok_or_else(|| OnboardingError::UnknownPhase(phase.to_owned()))
    }

    fn task_template<'a>(
        template: &'a PhaseTemplate,
        task: &str,
    ) -> Result<&'a TaskTemplate, OnboardingError> {
        template.task(task).ok_or_else(|| OnboardingError::UnknownTask {
            phase: template.title.clone(),
            task: task.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_core::achievement::{AchievementRules, ONBOARDING_COMPLETE};
    use onboard_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    const FOUNDATION: &str = "Foundation Setup";

    fn service_with(catalog: Catalog) -> OnboardingService {
        let repo = InMemoryRepository::new();
        let achievements = Arc::new(AchievementService::new(
            fixed_clock(),
            catalog.achievements().clone(),
            Arc::new(repo.clone()),
        ));
        OnboardingService::new(fixed_clock(), Arc::new(catalog), Arc::new(repo), achievements)
    }

    fn service() -> OnboardingService {
        service_with(Catalog::builtin())
    }

    fn user() -> UserId {
        UserId::new("rakshitha").unwrap()
    }

    #[tokio::test]
    async fn users_without_a_record_read_as_empty() {
        let svc = service();
        let err = svc.get_user_phases(&user()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::NoRecord(_)));

        let progress = svc.onboarding_progress(&user()).await.unwrap();
        assert_eq!(progress, OnboardingProgress::default());

        let tasks = svc.phase_tasks(&user(), FOUNDATION).await.unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| !t.is_completed()));
    }

    #[tokio::test]
    async fn toggle_flips_and_reports_phase_state() {
        let svc = service();
        let template = Catalog::builtin().phase(FOUNDATION).unwrap().clone();
        let names: Vec<&str> = template.tasks.iter().map(|t| t.name.as_str()).collect();

        let first = svc.toggle_task(&user(), FOUNDATION, names[0]).await.unwrap();
        assert!(first.task_completed);
        assert!(!first.phase_completed);
        assert_eq!(first.progress.percentage, 0);

        svc.toggle_task(&user(), FOUNDATION, names[1]).await.unwrap();
        let last = svc.toggle_task(&user(), FOUNDATION, names[2]).await.unwrap();
        assert!(last.phase_completed);
        assert_eq!(last.progress.percentage, 20);
        assert_eq!(last.progress.completed_phases, vec![FOUNDATION]);
        assert_eq!(last.newly_unlocked, vec!["First Steps"]);

        let undone = svc.toggle_task(&user(), FOUNDATION, names[2]).await.unwrap();
        assert!(!undone.task_completed);
        assert!(!undone.phase_completed);
        assert!(undone.newly_unlocked.is_empty());
    }

    #[tokio::test]
    async fn set_task_completion_is_idempotent() {
        let svc = service();
        let task = "Install Development Tools";
        let once = svc
            .set_task_completion(&user(), FOUNDATION, task, true)
            .await
            .unwrap();
        let twice = svc
            .set_task_completion(&user(), FOUNDATION, task, true)
            .await
            .unwrap();
        assert_eq!(once.task_completed, twice.task_completed);
        assert_eq!(once.phase_completed, twice.phase_completed);
        assert_eq!(once.progress, twice.progress);

        let phases = svc.get_user_phases(&user()).await.unwrap();
        let foundation = phases.iter().find(|p| p.title() == FOUNDATION).unwrap();
        assert_eq!(
            foundation.tasks().iter().filter(|t| t.is_completed()).count(),
            1
        );
    }

    #[tokio::test]
    async fn unknown_names_are_rejected_without_creating_a_record() {
        let svc = service();
        let err = svc
            .toggle_task(&user(), "Nonexistent Phase", "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::UnknownPhase(_)));

        let err = svc
            .toggle_task(&user(), FOUNDATION, "Nonexistent Task")
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::UnknownTask { .. }));

        assert!(svc.progress_overview().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completing_everything_unlocks_onboarding_complete() {
        let catalog = Catalog::builtin().with_achievements(AchievementRules::minimal());
        let phases = catalog.phases().to_vec();
        let svc = service_with(catalog);

        let mut unlocked = Vec::new();
        for phase in &phases {
            for task in &phase.tasks {
                let update = svc
                    .set_task_completion(&user(), &phase.title, &task.name, true)
                    .await
                    .unwrap();
                unlocked.extend(update.newly_unlocked);
            }
        }
        assert_eq!(unlocked, vec![ONBOARDING_COMPLETE]);

        let overview = svc.progress_overview().await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].completed, phases.len());
        assert_eq!(overview[0].percentage, 100);
    }
}
