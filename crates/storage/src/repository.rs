use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onboard_core::achievement::Achievement;
use onboard_core::model::{PathId, PathProgress, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A compare-and-swap save lost against a concurrent writer.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted completion flag for one (user, phase, task) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFlagRecord {
    pub phase: String,
    pub task: String,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Persists onboarding task completion per user.
///
/// A user "has an onboarding record" once `ensure_user` has run for them.
/// Only explicitly written flags are stored; an absent flag means incomplete.
#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    /// Create the user's onboarding record if it does not exist yet.
    ///
    /// Returns `true` when a new record was created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn ensure_user(&self, user: &UserId, now: DateTime<Utc>) -> Result<bool, StorageError>;

    /// All stored flags for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the user has no onboarding record.
    async fn task_flags(&self, user: &UserId) -> Result<Vec<TaskFlagRecord>, StorageError>;

    /// Write a single flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the user has no onboarding record.
    async fn set_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Flip a single flag in one atomic step and return its new value.
    ///
    /// A flag that was never written counts as incomplete, so the first flip
    /// stores `true`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the user has no onboarding record.
    async fn toggle_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Users with an onboarding record, ordered by username.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_users(&self) -> Result<Vec<UserId>, StorageError>;
}

/// Persists per-user knowledge-path progress.
#[async_trait]
pub trait PathProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_path_progress(
        &self,
        user: &UserId,
        path_id: &PathId,
    ) -> Result<Option<PathProgress>, StorageError>;

    /// Every stored progress record for a user, ordered by path id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_path_progress(&self, user: &UserId) -> Result<Vec<PathProgress>, StorageError>;

    /// Compare-and-swap save.
    ///
    /// `progress.version` must match the stored version (`0` for a record that
    /// does not exist yet). Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the stored version moved on.
    async fn save_path_progress(
        &self,
        user: &UserId,
        progress: &PathProgress,
    ) -> Result<u64, StorageError>;
}

/// Append-only achievement log per user.
#[async_trait]
pub trait AchievementRepository: Send + Sync {
    /// Achievements in unlock order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_achievements(&self, user: &UserId) -> Result<Vec<Achievement>, StorageError>;

    /// Insert unless the label is already unlocked. Returns `true` if added.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn append_achievement(
        &self,
        user: &UserId,
        achievement: &Achievement,
    ) -> Result<bool, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct OnboardingEntry {
    flags: BTreeMap<(String, String), TaskFlagRecord>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    onboarding: Arc<Mutex<BTreeMap<UserId, OnboardingEntry>>>,
    progress: Arc<Mutex<HashMap<(UserId, PathId), PathProgress>>>,
    achievements: Arc<Mutex<HashMap<UserId, Vec<Achievement>>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OnboardingRepository for InMemoryRepository {
    async fn ensure_user(&self, user: &UserId, _now: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut guard = self.onboarding.lock().map_err(poisoned)?;
        if guard.contains_key(user) {
            return Ok(false);
        }
        guard.insert(
            user.clone(),
            OnboardingEntry {
                flags: BTreeMap::new(),
            },
        );
        Ok(true)
    }

    async fn task_flags(&self, user: &UserId) -> Result<Vec<TaskFlagRecord>, StorageError> {
        let guard = self.onboarding.lock().map_err(poisoned)?;
        let entry = guard.get(user).ok_or(StorageError::NotFound)?;
        Ok(entry.flags.values().cloned().collect())
    }

    async fn set_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.onboarding.lock().map_err(poisoned)?;
        let entry = guard.get_mut(user).ok_or(StorageError::NotFound)?;
        entry.flags.insert(
            (phase.to_owned(), task.to_owned()),
            TaskFlagRecord {
                phase: phase.to_owned(),
                task: task.to_owned(),
                completed,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn toggle_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.onboarding.lock().map_err(poisoned)?;
        let entry = guard.get_mut(user).ok_or(StorageError::NotFound)?;
        let record = entry
            .flags
            .entry((phase.to_owned(), task.to_owned()))
            .or_insert_with(|| TaskFlagRecord {
                phase: phase.to_owned(),
                task: task.to_owned(),
                completed: false,
                updated_at: now,
            });
        record.completed = !record.completed;
        record.updated_at = now;
        Ok(record.completed)
    }

    async fn list_users(&self) -> Result<Vec<UserId>, StorageError> {
        let guard = self.onboarding.lock().map_err(poisoned)?;
        Ok(guard.keys().cloned().collect())
    }
}

#[async_trait]
impl PathProgressRepository for InMemoryRepository {
    async fn get_path_progress(
        &self,
        user: &UserId,
        path_id: &PathId,
    ) -> Result<Option<PathProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user.clone(), path_id.clone())).cloned())
    }

    async fn list_path_progress(&self, user: &UserId) -> Result<Vec<PathProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut out: Vec<PathProgress> = guard
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, progress)| progress.clone())
            .collect();
        out.sort_by(|a, b| a.path_id.cmp(&b.path_id));
        Ok(out)
    }

    async fn save_path_progress(
        &self,
        user: &UserId,
        progress: &PathProgress,
    ) -> Result<u64, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let key = (user.clone(), progress.path_id.clone());
        let stored_version = guard.get(&key).map_or(0, |p| p.version);
        if stored_version != progress.version {
            return Err(StorageError::Conflict);
        }
        let mut next = progress.clone();
        next.version = stored_version + 1;
        let version = next.version;
        guard.insert(key, next);
        Ok(version)
    }
}

#[async_trait]
impl AchievementRepository for InMemoryRepository {
    async fn list_achievements(&self, user: &UserId) -> Result<Vec<Achievement>, StorageError> {
        let guard = self.achievements.lock().map_err(poisoned)?;
        Ok(guard.get(user).cloned().unwrap_or_default())
    }

    async fn append_achievement(
        &self,
        user: &UserId,
        achievement: &Achievement,
    ) -> Result<bool, StorageError> {
        let mut guard = self.achievements.lock().map_err(poisoned)?;
        let list = guard.entry(user.clone()).or_default();
        if list.iter().any(|a| a.label == achievement.label) {
            return Ok(false);
        }
        list.push(achievement.clone());
        Ok(true)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub onboarding: Arc<dyn OnboardingRepository>,
    pub path_progress: Arc<dyn PathProgressRepository>,
    pub achievements: Arc<dyn AchievementRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_repository(repo)
    }

    /// Wire every repository to one backend value.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: OnboardingRepository + PathProgressRepository + AchievementRepository + Clone + 'static,
    {
        let onboarding: Arc<dyn OnboardingRepository> = Arc::new(repo.clone());
        let path_progress: Arc<dyn PathProgressRepository> = Arc::new(repo.clone());
        let achievements: Arc<dyn AchievementRepository> = Arc::new(repo);
        Self {
            onboarding,
            path_progress,
            achievements,
        }
    }
}
