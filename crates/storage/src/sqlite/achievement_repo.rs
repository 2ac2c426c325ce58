use onboard_core::achievement::Achievement;
use onboard_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{conn, map_achievement_row};
use crate::repository::{AchievementRepository, StorageError};

#[async_trait::async_trait]
impl AchievementRepository for SqliteRepository {
    async fn list_achievements(&self, user: &UserId) -> Result<Vec<Achievement>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT label, unlocked_at
            FROM achievements
            WHERE username = ?1
            ORDER BY seq ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_achievement_row).collect()
    }

    async fn append_achievement(
        &self,
        user: &UserId,
        achievement: &Achievement,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO achievements (username, label, unlocked_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(username, label) DO NOTHING
            ",
        )
        .bind(user.as_str())
        .bind(&achievement.label)
        .bind(achievement.unlocked_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }
}
