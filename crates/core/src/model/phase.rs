use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::model::task::{Task, TaskTemplate};

/// Catalog definition of an onboarding phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseTemplate {
    pub title: String,
    /// Display-only estimate such as "1-2 days".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskTemplate>,
}

impl PhaseTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            duration: Some(duration.into()),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_task(mut self, task: TaskTemplate) -> Self {
        self.tasks.push(task);
        self
    }

    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskTemplate> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Build the per-user view of this phase.
    ///
    /// `is_completed` is asked for each task name; the phase's own
    /// completion flag is derived from the resulting task set.
    #[must_use]
    pub fn instantiate(&self, is_completed: impl Fn(&str) -> bool) -> Phase {
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .map(|t| Task::from_template(t, is_completed(&t.name)))
            .collect();
        Phase::new(self.title.clone(), self.duration.clone(), tasks)
    }
}

/// An onboarding phase as seen by one user.
///
/// `completed` is derived at construction and the value is immutable, so it
/// can never drift from its task set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    completed: bool,
    tasks: Vec<Task>,
}

impl Phase {
    #[must_use]
    pub fn new(title: String, duration: Option<String>, tasks: Vec<Task>) -> Self {
        let completed = aggregate::phase_completed(&tasks);
        Self {
            title,
            duration,
            completed,
            tasks,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name() == name)
    }
}
