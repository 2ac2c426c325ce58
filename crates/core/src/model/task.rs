use serde::{Deserialize, Serialize};

//
// ─── TASK METADATA ─────────────────────────────────────────────────────────────
//

/// How urgently a task should be picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// Display category of an onboarding task. Carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Setup,
    Access,
    Social,
    Documentation,
    Database,
    Standards,
    Code,
    Testing,
    Workflow,
    Devops,
    Process,
    #[default]
    Task,
    Development,
    Collaboration,
}

//
// ─── TEMPLATE (catalog) ────────────────────────────────────────────────────────
//

/// Catalog definition of a task; immutable at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskTemplate {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl TaskTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TaskKind, priority: TaskPriority) -> Self {
        Self {
            name: name.into(),
            kind,
            priority,
            description: None,
            resources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| (*r).to_owned()).collect();
        self
    }
}

//
// ─── TASK (per-user state) ─────────────────────────────────────────────────────
//

/// A task as seen by one user: the catalog definition plus its completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    name: String,
    #[serde(rename = "type")]
    kind: TaskKind,
    priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    resources: Vec<String>,
    completed: bool,
}

impl Task {
    #[must_use]
    pub fn from_template(template: &TaskTemplate, completed: bool) -> Self {
        Self {
            name: template.name.clone(),
            kind: template.kind,
            priority: template.priority,
            description: template.description.clone(),
            resources: template.resources.clone(),
            completed,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resource names, in display order. Resolve them through a `ResourceRegistry`.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_defaults_priority_and_kind() {
        let template: TaskTemplate =
            serde_json::from_str(r#"{ "name": "Install Development Tools" }"#).unwrap();
        assert_eq!(template.priority, TaskPriority::Medium);
        assert_eq!(template.kind, TaskKind::Task);
        assert!(template.resources.is_empty());
    }

    #[test]
    fn template_rejects_unknown_fields() {
        let result = serde_json::from_str::<TaskTemplate>(
            r#"{ "name": "Join Team Channels", "owner": "someone" }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn kind_uses_snake_case_tags() {
        let template: TaskTemplate =
            serde_json::from_str(r#"{ "name": "Ship it", "type": "devops", "priority": "high" }"#)
                .unwrap();
        assert_eq!(template.kind, TaskKind::Devops);
        assert_eq!(template.priority, TaskPriority::High);
    }

    #[test]
    fn task_copies_template_fields() {
        let template = TaskTemplate::new("Run Test Suite", TaskKind::Testing, TaskPriority::Low)
            .with_resources(&["Test Guide", "Coverage Reports"]);
        let task = Task::from_template(&template, true);
        assert_eq!(task.name(), "Run Test Suite");
        assert_eq!(task.resources(), ["Test Guide", "Coverage Reports"]);
        assert!(task.is_completed());
    }
}
