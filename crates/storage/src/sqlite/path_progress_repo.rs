use onboard_core::model::{PathId, PathProgress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, encode_steps, map_path_progress_row, version_to_i64};
use crate::repository::{PathProgressRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT path_id, completed_steps, current_step, progress_percentage,
           started_at, completed_at, version
    FROM path_progress
";

#[async_trait::async_trait]
impl PathProgressRepository for SqliteRepository {
    async fn get_path_progress(
        &self,
        user: &UserId,
        path_id: &PathId,
    ) -> Result<Option<PathProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE username = ?1 AND path_id = ?2");
        let row = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(path_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_path_progress_row).transpose()
    }

    async fn list_path_progress(&self, user: &UserId) -> Result<Vec<PathProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE username = ?1 ORDER BY path_id ASC");
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_path_progress_row).collect()
    }

    async fn save_path_progress(
        &self,
        user: &UserId,
        progress: &PathProgress,
    ) -> Result<u64, StorageError> {
        let steps = encode_steps(&progress.completed_steps)?;
        let expected = version_to_i64(progress.version)?;
        let next = expected + 1;

        // Version 0 means the caller saw no row; the insert must not clobber one.
        let res = if progress.version == 0 {
            sqlx::query(
                r"
                INSERT INTO path_progress (
                    username, path_id, completed_steps, current_step,
                    progress_percentage, started_at, completed_at, version
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(username, path_id) DO NOTHING
                ",
            )
            .bind(user.as_str())
            .bind(progress.path_id.as_str())
            .bind(steps)
            .bind(i64::from(progress.current_step))
            .bind(i64::from(progress.progress_percentage))
            .bind(progress.started_at)
            .bind(progress.completed_at)
            .bind(next)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r"
                UPDATE path_progress SET
                    completed_steps = ?3,
                    current_step = ?4,
                    progress_percentage = ?5,
                    started_at = ?6,
                    completed_at = ?7,
                    version = ?8
                WHERE username = ?1 AND path_id = ?2 AND version = ?9
                ",
            )
            .bind(user.as_str())
            .bind(progress.path_id.as_str())
            .bind(steps)
            .bind(i64::from(progress.current_step))
            .bind(i64::from(progress.progress_percentage))
            .bind(progress.started_at)
            .bind(progress.completed_at)
            .bind(next)
            .bind(expected)
            .execute(&self.pool)
            .await
        }
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(progress.version + 1)
    }
}
