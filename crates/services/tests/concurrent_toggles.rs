use std::sync::Arc;

use async_trait::async_trait;
use onboard_core::catalog::Catalog;
use onboard_core::model::{PathId, PathProgress, StepAction, StepId, UserId};
use onboard_core::time::fixed_clock;
use services::{ErrorKind, KnowledgePathService, ProgressServices};
use storage::repository::{PathProgressRepository, StorageError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_in_one_phase_lose_no_update() {
    let services = ProgressServices::in_memory(fixed_clock(), Catalog::builtin());
    let user = UserId::new("rakshitha").unwrap();
    let phases = services.catalog().phases().to_vec();

    let mut handles = Vec::new();
    for phase in &phases {
        for task in &phase.tasks {
            let services = services.clone();
            let user = user.clone();
            let phase = phase.title.clone();
            let task = task.name.clone();
            handles.push(tokio::spawn(async move {
                services.toggle_task(&user, &phase, &task).await
            }));
        }
    }

    let mut unlocked = Vec::new();
    for handle in handles {
        let update = handle.await.unwrap().unwrap();
        assert!(update.task_completed);
        unlocked.extend(update.newly_unlocked);
    }

    let stored = services.onboarding_phases(&user).await.unwrap();
    assert!(stored.iter().all(|p| p.is_completed()));

    let labels = services.onboarding_achievements(&user).await.unwrap();
    assert_eq!(labels.len(), 5);
    unlocked.sort();
    let mut expected = labels.clone();
    expected.sort();
    assert_eq!(unlocked, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn toggles_through_separate_sqlite_handles_lose_no_flip() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("onboard.sqlite3").display());
    let first = ProgressServices::sqlite(&url, fixed_clock(), Catalog::builtin())
        .await
        .expect("first handle");
    let second = ProgressServices::sqlite(&url, fixed_clock(), Catalog::builtin())
        .await
        .expect("second handle");
    let user = UserId::new("rakshitha").unwrap();

    let mut handles = Vec::new();
    for i in 0..200 {
        let services = if i % 2 == 0 { first.clone() } else { second.clone() };
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            services
                .toggle_task(&user, "Foundation Setup", "Join Team Channels")
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let phases = first.onboarding_phases(&user).await.unwrap();
    let foundation = phases.iter().find(|p| p.title() == "Foundation Setup").unwrap();
    let task = foundation
        .tasks()
        .iter()
        .find(|t| t.name() == "Join Team Channels")
        .unwrap();
    assert!(!task.is_completed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_step_actions_on_one_path_serialize() {
    let services = ProgressServices::in_memory(fixed_clock(), Catalog::builtin());
    let user = UserId::new("roopika").unwrap();
    let path = PathId::new("new-developer").unwrap();
    let steps: Vec<StepId> = services
        .catalog()
        .path(&path)
        .unwrap()
        .steps
        .iter()
        .map(|s| s.id.clone())
        .collect();

    let mut handles = Vec::new();
    for step in steps.clone() {
        let services = services.clone();
        let user = user.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            services
                .knowledge_path_progress(&path, &user, &step, StepAction::Complete)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let view = services.knowledge_path(&path, &user).await.unwrap();
    assert_eq!(view.progress.completed_steps.len(), steps.len());
    assert_eq!(view.progress.progress_percentage, 100);
    assert_eq!(view.progress.version, steps.len() as u64);
}

/// Simulates another process that always saves first.
struct AlwaysStale;

#[async_trait]
impl PathProgressRepository for AlwaysStale {
    async fn get_path_progress(
        &self,
        _user: &UserId,
        _path_id: &PathId,
    ) -> Result<Option<PathProgress>, StorageError> {
        Ok(None)
    }

    async fn list_path_progress(&self, _user: &UserId) -> Result<Vec<PathProgress>, StorageError> {
        Ok(Vec::new())
    }

    async fn save_path_progress(
        &self,
        _user: &UserId,
        _progress: &PathProgress,
    ) -> Result<u64, StorageError> {
        Err(StorageError::Conflict)
    }
}

#[tokio::test]
async fn lost_compare_and_swap_surfaces_conflict() {
    let svc = KnowledgePathService::new(
        fixed_clock(),
        Arc::new(Catalog::builtin()),
        Arc::new(AlwaysStale),
    );
    let err = svc
        .apply_step_action(
            &UserId::new("rakshitha").unwrap(),
            &PathId::new("api-developer").unwrap(),
            &StepId::new("step-1").unwrap(),
            StepAction::Complete,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
