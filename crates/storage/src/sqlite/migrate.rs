use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies pending schema versions in order.
///
/// Version 1 holds onboarding users with their task flags, knowledge-path
/// progress, and the achievement log.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        let statements = [
            r"
                CREATE TABLE IF NOT EXISTS onboarding_users (
                    username TEXT PRIMARY KEY,
                    created_at TEXT NOT NULL
                );
            ",
            r"
                CREATE TABLE IF NOT EXISTS task_completions (
                    username TEXT NOT NULL,
                    phase TEXT NOT NULL,
                    task TEXT NOT NULL,
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (username, phase, task),
                    FOREIGN KEY (username) REFERENCES onboarding_users(username) ON DELETE CASCADE
                );
            ",
            r"
                CREATE TABLE IF NOT EXISTS path_progress (
                    username TEXT NOT NULL,
                    path_id TEXT NOT NULL,
                    completed_steps TEXT NOT NULL,
                    current_step INTEGER NOT NULL CHECK (current_step >= 0),
                    progress_percentage INTEGER NOT NULL CHECK (progress_percentage BETWEEN 0 AND 100),
                    started_at TEXT,
                    completed_at TEXT,
                    version INTEGER NOT NULL CHECK (version >= 1),
                    PRIMARY KEY (username, path_id)
                );
            ",
            r"
                CREATE TABLE IF NOT EXISTS achievements (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL,
                    label TEXT NOT NULL,
                    unlocked_at TEXT NOT NULL,
                    UNIQUE (username, label)
                );
            ",
            r"
                CREATE INDEX IF NOT EXISTS idx_achievements_user_seq
                    ON achievements (username, seq);
            ",
        ];
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
