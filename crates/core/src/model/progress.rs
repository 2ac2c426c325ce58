use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate;
use crate::model::ids::{PathId, StepId};
use crate::model::path::{KnowledgePath, StepAction};
use crate::model::phase::Phase;

//
// ─── ONBOARDING ────────────────────────────────────────────────────────────────
//

/// Derived onboarding progress for one user. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OnboardingProgress {
    pub percentage: u8,
    pub completed_phases: Vec<String>,
    pub pending_phases: Vec<String>,
}

impl OnboardingProgress {
    #[must_use]
    pub fn from_phases(phases: &[Phase]) -> Self {
        let (completed_phases, pending_phases) = aggregate::partition(phases);
        Self {
            percentage: aggregate::user_percentage(phases),
            completed_phases,
            pending_phases,
        }
    }

    #[must_use]
    pub fn total_phases(&self) -> usize {
        self.completed_phases.len() + self.pending_phases.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percentage == 100
    }
}

//
// ─── KNOWLEDGE PATH ────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepActionError {
    #[error("step {step} does not belong to path {path}")]
    UnknownStep { path: PathId, step: StepId },

    #[error("step {step} is required and cannot be skipped")]
    RequiredStep { step: StepId },
}

/// Per-user progress through one knowledge path.
///
/// `completed_steps` has set semantics and keeps completion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathProgress {
    pub path_id: PathId,
    pub completed_steps: Vec<StepId>,
    /// 1-based order of the first step not yet completed.
    pub current_step: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_percentage: u8,
    /// Optimistic-concurrency token; bumped on every save.
    #[serde(skip)]
    pub version: u64,
}

impl PathProgress {
    /// Zero-value progress for a user that has not touched the path yet.
    #[must_use]
    pub fn empty(path_id: PathId) -> Self {
        Self {
            path_id,
            completed_steps: Vec::new(),
            current_step: 1,
            started_at: None,
            completed_at: None,
            progress_percentage: 0,
            version: 0,
        }
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn has_completed(&self, step: &StepId) -> bool {
        self.completed_steps.contains(step)
    }

    /// Apply a step action and recompute the derived fields.
    ///
    /// Validation happens before any field is touched, so a rejected action
    /// leaves the record exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `StepActionError::UnknownStep` if `step` is not part of `path`.
    /// Returns `StepActionError::RequiredStep` when skipping a required step.
    pub fn apply(
        &mut self,
        path: &KnowledgePath,
        step: &StepId,
        action: StepAction,
        now: DateTime<Utc>,
    ) -> Result<(), StepActionError> {
        let target = path.step(step).ok_or_else(|| StepActionError::UnknownStep {
            path: path.id.clone(),
            step: step.clone(),
        })?;
        if action == StepAction::Skip && target.required {
            return Err(StepActionError::RequiredStep { step: step.clone() });
        }

        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        match action {
            StepAction::Start => {}
            StepAction::Complete | StepAction::Skip => {
                if !self.has_completed(step) {
                    self.completed_steps.push(step.clone());
                }
            }
        }
        self.recompute(path, now);
        Ok(())
    }

    fn recompute(&mut self, path: &KnowledgePath, now: DateTime<Utc>) {
        let done = self
            .completed_steps
            .iter()
            .filter(|id| path.step(id).is_some())
            .count();
        self.progress_percentage = aggregate::percentage(done, path.steps.len());

        let next_open = path
            .ordered_steps()
            .position(|s| !self.has_completed(&s.id))
            .unwrap_or(path.steps.len());
        self.current_step = u32::try_from(next_open + 1).unwrap_or(u32::MAX);

        if self.progress_percentage == 100 && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::time::fixed_now;

    fn api_path() -> KnowledgePath {
        let catalog = Catalog::builtin();
        catalog
            .path(&PathId::new("api-developer").unwrap())
            .cloned()
            .unwrap()
    }

    fn step(id: &str) -> StepId {
        StepId::new(id).unwrap()
    }

    #[test]
    fn completing_three_of_four_steps_is_seventy_five_percent() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        let now = fixed_now();

        progress.apply(&path, &step("step-1"), StepAction::Complete, now).unwrap();
        progress.apply(&path, &step("step-2"), StepAction::Complete, now).unwrap();
        progress.apply(&path, &step("step-3"), StepAction::Complete, now).unwrap();

        assert_eq!(progress.progress_percentage, 75);
        assert_eq!(progress.current_step, 4);
        assert_eq!(progress.started_at, Some(now));
        assert!(progress.completed_at.is_none());
    }

    #[test]
    fn completing_twice_is_a_no_op() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        progress.apply(&path, &step("step-1"), StepAction::Complete, fixed_now()).unwrap();
        let before = progress.clone();
        progress.apply(&path, &step("step-1"), StepAction::Complete, fixed_now()).unwrap();
        assert_eq!(progress, before);
    }

    #[test]
    fn skipping_required_step_leaves_record_untouched() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        let err = progress
            .apply(&path, &step("step-1"), StepAction::Skip, fixed_now())
            .unwrap_err();
        assert!(matches!(err, StepActionError::RequiredStep { .. }));
        assert_eq!(progress, PathProgress::empty(path.id.clone()));
    }

    #[test]
    fn skipping_optional_step_counts_toward_progress() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        progress.apply(&path, &step("step-4"), StepAction::Skip, fixed_now()).unwrap();
        assert_eq!(progress.completed_steps, vec![step("step-4")]);
        assert_eq!(progress.progress_percentage, 25);
        assert_eq!(progress.current_step, 1);
    }

    #[test]
    fn unknown_step_is_rejected() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        let err = progress
            .apply(&path, &step("step-99"), StepAction::Complete, fixed_now())
            .unwrap_err();
        assert!(matches!(err, StepActionError::UnknownStep { .. }));
    }

    #[test]
    fn start_opens_the_record_without_progress() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        progress.apply(&path, &step("step-2"), StepAction::Start, fixed_now()).unwrap();
        assert!(progress.is_started());
        assert!(progress.completed_steps.is_empty());
        assert_eq!(progress.progress_percentage, 0);
    }

    #[test]
    fn completion_time_is_recorded_once() {
        let path = api_path();
        let mut progress = PathProgress::empty(path.id.clone());
        let first = fixed_now();
        for id in ["step-1", "step-2", "step-3", "step-4"] {
            progress.apply(&path, &step(id), StepAction::Complete, first).unwrap();
        }
        assert_eq!(progress.progress_percentage, 100);
        assert_eq!(progress.current_step, 5);
        assert_eq!(progress.completed_at, Some(first));

        let later = first + chrono::Duration::hours(1);
        progress.apply(&path, &step("step-1"), StepAction::Complete, later).unwrap();
        assert_eq!(progress.completed_at, Some(first));
    }
}
