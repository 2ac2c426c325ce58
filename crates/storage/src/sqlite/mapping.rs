use chrono::{DateTime, Utc};
use onboard_core::achievement::Achievement;
use onboard_core::model::{PathId, PathProgress, StepId, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, TaskFlagRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn version_to_i64(version: u64) -> Result<i64, StorageError> {
    i64::try_from(version).map_err(|_| StorageError::Serialization("version overflow".into()))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<UserId, StorageError> {
    let raw: String = row.try_get("username").map_err(ser)?;
    UserId::new(raw).map_err(ser)
}

pub(crate) fn map_task_flag_row(row: &SqliteRow) -> Result<TaskFlagRecord, StorageError> {
    let completed: i64 = row.try_get("completed").map_err(ser)?;
    Ok(TaskFlagRecord {
        phase: row.try_get("phase").map_err(ser)?,
        task: row.try_get("task").map_err(ser)?,
        completed: completed != 0,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

/// `completed_steps` is stored as a JSON array of step ids.
pub(crate) fn encode_steps(steps: &[StepId]) -> Result<String, StorageError> {
    serde_json::to_string(steps).map_err(ser)
}

pub(crate) fn map_path_progress_row(row: &SqliteRow) -> Result<PathProgress, StorageError> {
    let path_id: String = row.try_get("path_id").map_err(ser)?;
    let steps_json: String = row.try_get("completed_steps").map_err(ser)?;
    let completed_steps: Vec<StepId> = serde_json::from_str(&steps_json).map_err(ser)?;

    let current_step: i64 = row.try_get("current_step").map_err(ser)?;
    let current_step = u32::try_from(current_step)
        .map_err(|_| StorageError::Serialization(format!("invalid current_step: {current_step}")))?;

    let percentage: i64 = row.try_get("progress_percentage").map_err(ser)?;
    let progress_percentage = u8::try_from(percentage)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid percentage: {percentage}")))?;

    let started_at: Option<DateTime<Utc>> = row.try_get("started_at").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    let version = i64_to_u64("version", row.try_get("version").map_err(ser)?)?;

    Ok(PathProgress {
        path_id: PathId::new(path_id).map_err(ser)?,
        completed_steps,
        current_step,
        started_at,
        completed_at,
        progress_percentage,
        version,
    })
}

pub(crate) fn map_achievement_row(row: &SqliteRow) -> Result<Achievement, StorageError> {
    Ok(Achievement {
        label: row.try_get("label").map_err(ser)?,
        unlocked_at: row.try_get("unlocked_at").map_err(ser)?,
    })
}
