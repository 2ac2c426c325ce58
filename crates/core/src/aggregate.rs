//! Pure derivations over onboarding phases and path steps.
//!
//! Every percentage and partition shown to a caller is computed here; the
//! storage and service layers never derive these values on their own.

use crate::model::{Phase, Task};

/// `round(100 * done / total)` with halves rounded up; `0` when `total == 0`.
#[must_use]
pub fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total);
    let rounded = (done * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

/// A phase is complete when it has at least one task and every task is done.
#[must_use]
pub fn phase_completed(tasks: &[Task]) -> bool {
    !tasks.is_empty() && tasks.iter().all(Task::is_completed)
}

#[must_use]
pub fn completed_count(phases: &[Phase]) -> usize {
    phases.iter().filter(|p| p.is_completed()).count()
}

#[must_use]
pub fn user_percentage(phases: &[Phase]) -> u8 {
    percentage(completed_count(phases), phases.len())
}

/// Split phase titles into `(completed, pending)`, keeping catalog order.
#[must_use]
pub fn partition(phases: &[Phase]) -> (Vec<String>, Vec<String>) {
    let mut completed = Vec::new();
    let mut pending = Vec::new();
    for phase in phases {
        let title = phase.title().to_owned();
        if phase.is_completed() {
            completed.push(title);
        } else {
            pending.push(title);
        }
    }
    (completed, pending)
}
