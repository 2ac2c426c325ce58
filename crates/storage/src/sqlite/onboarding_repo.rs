use chrono::{DateTime, Utc};
use onboard_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_task_flag_row, ser, user_from_row};
use crate::repository::{OnboardingRepository, StorageError, TaskFlagRecord};

impl SqliteRepository {
    async fn user_exists(&self, user: &UserId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM onboarding_users WHERE username = ?1")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl OnboardingRepository for SqliteRepository {
    async fn ensure_user(&self, user: &UserId, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO onboarding_users (username, created_at)
            VALUES (?1, ?2)
            ON CONFLICT(username) DO NOTHING
            ",
        )
        .bind(user.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn task_flags(&self, user: &UserId) -> Result<Vec<TaskFlagRecord>, StorageError> {
        if !self.user_exists(user).await? {
            return Err(StorageError::NotFound);
        }

        let rows = sqlx::query(
            r"
            SELECT phase, task, completed, updated_at
            FROM task_completions
            WHERE username = ?1
            ORDER BY phase ASC, task ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_task_flag_row).collect()
    }

    async fn set_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if !self.user_exists(user).await? {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO task_completions (username, phase, task, completed, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(username, phase, task) DO UPDATE SET
                completed = excluded.completed,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(phase)
        .bind(task)
        .bind(i64::from(completed))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn toggle_task_flag(
        &self,
        user: &UserId,
        phase: &str,
        task: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        if !self.user_exists(user).await? {
            return Err(StorageError::NotFound);
        }

        // Read and flip happen inside one statement so separate pools and
        // processes cannot interleave between them.
        let row = sqlx::query(
            r"
            INSERT INTO task_completions (username, phase, task, completed, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT(username, phase, task) DO UPDATE SET
                completed = 1 - task_completions.completed,
                updated_at = excluded.updated_at
            RETURNING completed
            ",
        )
        .bind(user.as_str())
        .bind(phase)
        .bind(task)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let completed: i64 = row.try_get("completed").map_err(ser)?;
        Ok(completed != 0)
    }

    async fn list_users(&self) -> Result<Vec<UserId>, StorageError> {
        let rows = sqlx::query("SELECT username FROM onboarding_users ORDER BY username ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(user_from_row).collect()
    }
}
